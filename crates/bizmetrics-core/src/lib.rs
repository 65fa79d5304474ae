pub mod aggregation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod org_match;
pub mod records;
pub mod types;

#[cfg(feature = "o2c")]
pub mod o2c;

#[cfg(feature = "receivables")]
pub mod receivables;

#[cfg(feature = "fpa")]
pub mod fpa;

#[cfg(feature = "customer")]
pub mod customer;

#[cfg(feature = "profitability")]
pub mod profitability;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "time_series")]
pub mod time_series;

pub use config::AnalyticsConfig;
pub use dataset::Dataset;
pub use error::BizMetricsError;
pub use types::*;

/// Standard result type for all analytics operations
pub type BizMetricsResult<T> = Result<T, BizMetricsError>;
