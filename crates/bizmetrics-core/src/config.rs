//! Tunable business assumptions.
//!
//! Defaults reproduce the published house constants. Every struct is
//! `#[serde(default)]` so a config file only needs the fields it overrides.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BizMetricsError;
use crate::types::{Days, Pct, Rate, Years};
use crate::BizMetricsResult;

/// Customer lifetime value assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClvConfig {
    /// Retention horizon for a customer at or above average frequency
    pub base_lifespan_years: Years,
    /// Margin used when no profit records (or no revenue) are available
    pub default_margin: Rate,
    pub margin_floor: Rate,
    pub margin_cap: Rate,
    /// Retention factor for a customer with zero purchase frequency
    pub retention_floor: Rate,
    /// Flat retention factor when the portfolio average frequency is zero
    pub degenerate_retention: Rate,
}

impl Default for ClvConfig {
    fn default() -> Self {
        Self {
            base_lifespan_years: dec!(3.0),
            default_margin: dec!(0.10),
            margin_floor: dec!(-0.5),
            margin_cap: dec!(1.0),
            retention_floor: dec!(0.2),
            degenerate_retention: dec!(0.5),
        }
    }
}

impl ClvConfig {
    pub fn validate(&self) -> BizMetricsResult<()> {
        if self.base_lifespan_years < Decimal::ZERO {
            return Err(BizMetricsError::invalid(
                "clv.base_lifespan_years",
                "Lifespan cannot be negative",
            ));
        }
        if self.margin_floor > self.margin_cap {
            return Err(BizMetricsError::invalid(
                "clv.margin_floor",
                "Margin floor must be <= margin cap",
            ));
        }
        for (field, v) in [
            ("clv.retention_floor", self.retention_floor),
            ("clv.degenerate_retention", self.degenerate_retention),
        ] {
            if v < Decimal::ZERO || v > Decimal::ONE {
                return Err(BizMetricsError::invalid(field, "Must be between 0 and 1"));
            }
        }
        Ok(())
    }
}

/// Profitability x risk benchmarks. All values on a 0–100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitRiskConfig {
    /// Operating margin at or above this is "high profit"
    pub margin_benchmark: Pct,
    /// Risk score above this is "high risk"
    pub risk_benchmark: Pct,
    pub high_grade_cut: Pct,
    pub medium_grade_cut: Pct,
}

impl Default for ProfitRiskConfig {
    fn default() -> Self {
        Self {
            margin_benchmark: dec!(5),
            risk_benchmark: dec!(40),
            high_grade_cut: dec!(60),
            medium_grade_cut: dec!(30),
        }
    }
}

impl ProfitRiskConfig {
    pub fn validate(&self) -> BizMetricsResult<()> {
        if self.medium_grade_cut > self.high_grade_cut {
            return Err(BizMetricsError::invalid(
                "profit_risk.medium_grade_cut",
                "Medium grade cut point must be <= high grade cut point",
            ));
        }
        if self.risk_benchmark < Decimal::ZERO || self.risk_benchmark > dec!(100) {
            return Err(BizMetricsError::invalid(
                "profit_risk.risk_benchmark",
                "Risk benchmark must be between 0 and 100",
            ));
        }
        Ok(())
    }
}

/// Receivable aging conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingConfig {
    /// Day midpoints for month1..month6 and overdue
    pub midpoints: [Days; 7],
    /// Currency assumed for rows with a blank currency code
    pub default_currency: String,
    /// Label for rows with a blank organization
    pub unassigned_org: String,
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            midpoints: [
                dec!(15),
                dec!(45),
                dec!(75),
                dec!(105),
                dec!(135),
                dec!(165),
                dec!(270),
            ],
            default_currency: "KRW".to_string(),
            unassigned_org: "unassigned".to_string(),
        }
    }
}

impl AgingConfig {
    pub fn validate(&self) -> BizMetricsResult<()> {
        if self.midpoints.iter().any(|m| *m < Decimal::ZERO) {
            return Err(BizMetricsError::invalid(
                "aging.midpoints",
                "Bucket midpoints cannot be negative",
            ));
        }
        if self.midpoints.windows(2).any(|w| w[0] > w[1]) {
            return Err(BizMetricsError::invalid(
                "aging.midpoints",
                "Bucket midpoints must be ascending",
            ));
        }
        Ok(())
    }
}

/// Sensitivity grid and what-if bounds. Steps are percentages (5 = +5%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    pub price_steps: Vec<Pct>,
    pub volume_steps: Vec<Pct>,
    pub cost_rate_floor: Pct,
    pub cost_rate_cap: Pct,
}

/// -20, -15, ..., +20
pub fn default_steps() -> Vec<Pct> {
    (-4..=4).map(|i| Decimal::from(i * 5)).collect()
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            price_steps: default_steps(),
            volume_steps: default_steps(),
            cost_rate_floor: dec!(0),
            cost_rate_cap: dec!(200),
        }
    }
}

impl SensitivityConfig {
    pub fn validate(&self) -> BizMetricsResult<()> {
        if self.cost_rate_floor > self.cost_rate_cap {
            return Err(BizMetricsError::invalid(
                "sensitivity.cost_rate_floor",
                "Cost rate floor must be <= cap",
            ));
        }
        if self.price_steps.is_empty() || self.volume_steps.is_empty() {
            return Err(BizMetricsError::invalid(
                "sensitivity.steps",
                "Price and volume step lists must not be empty",
            ));
        }
        Ok(())
    }
}

/// Time-series decomposition parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// Seasonal period in months
    pub period: usize,
    /// Relative change (%) between half-series trend means that counts as up/down
    pub direction_threshold: Pct,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            period: 12,
            direction_threshold: dec!(5),
        }
    }
}

impl DecompositionConfig {
    pub fn validate(&self) -> BizMetricsResult<()> {
        if self.period < 2 {
            return Err(BizMetricsError::invalid(
                "decomposition.period",
                "Seasonal period must be at least 2",
            ));
        }
        if self.direction_threshold < Decimal::ZERO {
            return Err(BizMetricsError::invalid(
                "decomposition.direction_threshold",
                "Threshold cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Variance classification threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceConfig {
    /// Quantities with |q| <= this are "zero"; q above it is "positive"
    pub zero_quantity: Decimal,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            zero_quantity: Decimal::ZERO,
        }
    }
}

impl VarianceConfig {
    pub fn validate(&self) -> BizMetricsResult<()> {
        if self.zero_quantity < Decimal::ZERO {
            return Err(BizMetricsError::invalid(
                "variance.zero_quantity",
                "Zero-quantity threshold cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Every tunable in one place, as loaded by the CLI and bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub clv: ClvConfig,
    pub profit_risk: ProfitRiskConfig,
    pub aging: AgingConfig,
    pub sensitivity: SensitivityConfig,
    pub decomposition: DecompositionConfig,
    pub variance: VarianceConfig,
}

impl AnalyticsConfig {
    pub fn validate(&self) -> BizMetricsResult<()> {
        self.clv.validate()?;
        self.profit_risk.validate()?;
        self.aging.validate()?;
        self.sensitivity.validate()?;
        self.decomposition.validate()?;
        self.variance.validate()
    }
}
