use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values in the base currency (or the row currency for aging).
pub type Money = Decimal;

/// Ratios expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Percentages on a 0–100 scale (5 = 5%). Used wherever a metric is
/// reported to the presentation layer as a percentage.
pub type Pct = Decimal;

/// Day counts (weighted aging ages).
pub type Days = Decimal;

/// Year fractions
pub type Years = Decimal;

/// A paired plan/actual value from the profitability datasets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanActual {
    #[serde(default)]
    pub plan: Decimal,
    #[serde(default)]
    pub actual: Decimal,
}

impl PlanActual {
    pub fn new(plan: Decimal, actual: Decimal) -> Self {
        Self { plan, actual }
    }

    /// actual - plan
    pub fn delta(&self) -> Decimal {
        self.actual - self.plan
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
    /// Number of input rows the computation read, across all collections.
    pub input_rows: usize,
}

/// Helper to wrap analytics results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    input_rows: usize,
    result: T,
) -> ComputationOutput<T> {
    for w in &warnings {
        log::warn!("{methodology}: {w}");
    }
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
            input_rows,
        },
    }
}
