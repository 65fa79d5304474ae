use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::aggregation::safe_pct;
use crate::config::SensitivityConfig;
use crate::error::BizMetricsError;
use crate::records::OrgProfitRecord;
use crate::types::*;
use crate::BizMetricsResult;

/// Scenario levers applied uniformly to every organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatIfParams {
    /// Sales change in percent (10 = +10%)
    pub sales_change_percent: Pct,
    /// Cost-rate change in percentage points (2 = 60% -> 62%)
    pub cost_rate_change_points: Pct,
    /// SG&A change in percent
    pub sga_change_percent: Pct,
}

/// Base and scenario P&L for one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WhatIfOrgResult {
    pub org: String,
    pub base_sales: Money,
    pub scenario_sales: Money,
    pub base_cost_rate: Pct,
    pub scenario_cost_rate: Pct,
    pub base_gross_profit: Money,
    pub scenario_gross_profit: Money,
    pub base_sga: Money,
    pub scenario_sga: Money,
    pub base_operating_profit: Money,
    /// Operating profit as carried on the input row
    pub reported_operating_profit: Money,
    pub scenario_operating_profit: Money,
    /// scenario - base operating profit
    pub operating_profit_change: Money,
    pub base_operating_margin: Pct,
    pub scenario_operating_margin: Pct,
    pub scenario_gross_margin: Pct,
}

/// Portfolio totals with blended margins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PortfolioScenario {
    pub base_sales: Money,
    pub scenario_sales: Money,
    pub base_gross_profit: Money,
    pub scenario_gross_profit: Money,
    pub base_operating_profit: Money,
    pub scenario_operating_profit: Money,
    pub operating_profit_change: Money,
    pub operating_profit_change_pct: Pct,
    pub base_gross_margin: Pct,
    pub scenario_gross_margin: Pct,
    pub base_operating_margin: Pct,
    pub scenario_operating_margin: Pct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub params: WhatIfParams,
    /// Largest absolute operating-profit change first
    pub orgs: Vec<WhatIfOrgResult>,
    pub portfolio: PortfolioScenario,
}

/// The single lever a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParameter {
    Sales,
    Cost,
    Sga,
}

impl SweepParameter {
    /// Scenario levers with only this parameter set to `value`.
    pub fn params(&self, value: Decimal) -> WhatIfParams {
        match self {
            SweepParameter::Sales => WhatIfParams {
                sales_change_percent: value,
                ..Default::default()
            },
            SweepParameter::Cost => WhatIfParams {
                cost_rate_change_points: value,
                ..Default::default()
            },
            SweepParameter::Sga => WhatIfParams {
                sga_change_percent: value,
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SweepParameter::Sales => "sales",
            SweepParameter::Cost => "cost",
            SweepParameter::Sga => "sga",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SweepParameter {
    type Err = BizMetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sales" => Ok(SweepParameter::Sales),
            "cost" | "cost_rate" => Ok(SweepParameter::Cost),
            "sga" => Ok(SweepParameter::Sga),
            other => Err(BizMetricsError::invalid(
                "parameter",
                format!("Unknown sweep parameter '{other}' (expected sales, cost or sga)"),
            )),
        }
    }
}

/// One sweep value and the resulting portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepPoint {
    pub value: Decimal,
    pub scenario_sales: Money,
    pub operating_profit: Money,
    pub operating_margin: Pct,
    pub operating_profit_change: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub parameter: SweepParameter,
    pub base_operating_profit: Money,
    pub base_operating_margin: Pct,
    /// Ascending by value
    pub points: Vec<SweepPoint>,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

fn check_bounds(config: &SensitivityConfig) -> BizMetricsResult<()> {
    if config.cost_rate_floor > config.cost_rate_cap {
        return Err(BizMetricsError::invalid(
            "sensitivity.cost_rate_floor",
            "Cost rate floor must be <= cap",
        ));
    }
    Ok(())
}

/// Project one organization. The base is recomputed from revenue, cost rate
/// and SG&A so that neutral levers give a zero change.
fn project_org(
    p: &OrgProfitRecord,
    params: &WhatIfParams,
    config: &SensitivityConfig,
) -> WhatIfOrgResult {
    let base_sales = p.revenue.actual;
    let base_cost_rate = p.cost_rate.actual;
    let base_gross_profit = base_sales - base_sales * base_cost_rate / dec!(100);
    let base_sga = p.sga.actual;
    let base_operating_profit = base_gross_profit - base_sga;

    let scenario_sales = base_sales * (Decimal::ONE + params.sales_change_percent / dec!(100));
    let scenario_cost_rate = (base_cost_rate + params.cost_rate_change_points)
        .clamp(config.cost_rate_floor, config.cost_rate_cap);
    let scenario_gross_profit = scenario_sales - scenario_sales * scenario_cost_rate / dec!(100);
    let scenario_sga = base_sga * (Decimal::ONE + params.sga_change_percent / dec!(100));
    let scenario_operating_profit = scenario_gross_profit - scenario_sga;

    WhatIfOrgResult {
        org: p.org.trim().to_string(),
        base_sales,
        scenario_sales,
        base_cost_rate,
        scenario_cost_rate,
        base_gross_profit,
        scenario_gross_profit,
        base_sga,
        scenario_sga,
        base_operating_profit,
        reported_operating_profit: p.operating_profit.actual,
        scenario_operating_profit,
        operating_profit_change: scenario_operating_profit - base_operating_profit,
        base_operating_margin: safe_pct(base_operating_profit, base_sales),
        scenario_operating_margin: safe_pct(scenario_operating_profit, scenario_sales),
        scenario_gross_margin: safe_pct(scenario_gross_profit, scenario_sales),
    }
}

fn project(
    org_profits: &[OrgProfitRecord],
    params: &WhatIfParams,
    config: &SensitivityConfig,
) -> (Vec<WhatIfOrgResult>, PortfolioScenario) {
    let orgs: Vec<WhatIfOrgResult> = org_profits
        .iter()
        .filter(|p| !p.org.trim().is_empty())
        .map(|p| project_org(p, params, config))
        .collect();

    let mut portfolio = PortfolioScenario::default();
    for o in &orgs {
        portfolio.base_sales += o.base_sales;
        portfolio.scenario_sales += o.scenario_sales;
        portfolio.base_gross_profit += o.base_gross_profit;
        portfolio.scenario_gross_profit += o.scenario_gross_profit;
        portfolio.base_operating_profit += o.base_operating_profit;
        portfolio.scenario_operating_profit += o.scenario_operating_profit;
    }
    portfolio.operating_profit_change =
        portfolio.scenario_operating_profit - portfolio.base_operating_profit;
    portfolio.operating_profit_change_pct = if portfolio.base_operating_profit.is_zero() {
        Decimal::ZERO
    } else {
        portfolio.operating_profit_change / portfolio.base_operating_profit.abs() * dec!(100)
    };
    portfolio.base_gross_margin = safe_pct(portfolio.base_gross_profit, portfolio.base_sales);
    portfolio.scenario_gross_margin =
        safe_pct(portfolio.scenario_gross_profit, portfolio.scenario_sales);
    portfolio.base_operating_margin =
        safe_pct(portfolio.base_operating_profit, portfolio.base_sales);
    portfolio.scenario_operating_margin =
        safe_pct(portfolio.scenario_operating_profit, portfolio.scenario_sales);

    (orgs, portfolio)
}

// ---------------------------------------------------------------------------
// Function: compute_what_if_scenario
// ---------------------------------------------------------------------------

/// Apply sales, cost-rate and SG&A levers to every organization's actuals.
pub fn compute_what_if_scenario(
    org_profits: &[OrgProfitRecord],
    params: &WhatIfParams,
    config: &SensitivityConfig,
) -> BizMetricsResult<ComputationOutput<ScenarioResult>> {
    let start = Instant::now();
    check_bounds(config)?;
    let mut warnings: Vec<String> = Vec::new();

    let (mut orgs, portfolio) = project(org_profits, params, config);
    orgs.sort_by(|a, b| {
        b.operating_profit_change
            .abs()
            .cmp(&a.operating_profit_change.abs())
    });

    let clamped = orgs
        .iter()
        .filter(|o| o.scenario_cost_rate != o.base_cost_rate + params.cost_rate_change_points)
        .count();
    if clamped > 0 {
        warnings.push(format!(
            "Cost rate clamped to [{}, {}] for {clamped} organizations",
            config.cost_rate_floor, config.cost_rate_cap
        ));
    }
    // A reported figure of zero is treated as absent
    let restated = orgs
        .iter()
        .filter(|o| {
            !o.reported_operating_profit.is_zero()
                && o.reported_operating_profit != o.base_operating_profit
        })
        .count();
    if restated > 0 {
        warnings.push(format!(
            "{restated} organizations report an operating profit that differs from \
             revenue x (1 - cost rate) - SG&A; the recomputed base is used"
        ));
    }
    let blank = org_profits.len() - orgs.len();
    if blank > 0 {
        warnings.push(format!("{blank} org profit rows have a blank org and were skipped"));
    }

    log::debug!(
        "what-if: {} orgs, OP change {}",
        orgs.len(),
        portfolio.operating_profit_change
    );

    let output = ScenarioResult {
        params: params.clone(),
        orgs,
        portfolio,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "What-If Scenario Projection",
        &serde_json::json!({
            "sales_change_percent": params.sales_change_percent.to_string(),
            "cost_rate_change_points": params.cost_rate_change_points.to_string(),
            "sga_change_percent": params.sga_change_percent.to_string(),
            "cost_rate_bounds": [
                config.cost_rate_floor.to_string(),
                config.cost_rate_cap.to_string(),
            ],
        }),
        warnings,
        elapsed,
        org_profits.len(),
        output,
    ))
}

// ---------------------------------------------------------------------------
// Function: compute_sensitivity_sweep
// ---------------------------------------------------------------------------

/// Vary a single lever across `values` and report portfolio OP per value.
pub fn compute_sensitivity_sweep(
    org_profits: &[OrgProfitRecord],
    parameter: SweepParameter,
    values: &[Decimal],
    config: &SensitivityConfig,
) -> BizMetricsResult<ComputationOutput<SweepResult>> {
    let start = Instant::now();
    check_bounds(config)?;
    let mut warnings: Vec<String> = Vec::new();

    if values.is_empty() {
        return Err(BizMetricsError::invalid(
            "values",
            "At least one sweep value is required",
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort();
    let before = sorted.len();
    sorted.dedup();
    if sorted.len() < before {
        warnings.push(format!("{} duplicate sweep values removed", before - sorted.len()));
    }

    let (_, base) = project(org_profits, &WhatIfParams::default(), config);

    let points: Vec<SweepPoint> = sorted
        .iter()
        .map(|v| {
            let (_, portfolio) = project(org_profits, &parameter.params(*v), config);
            SweepPoint {
                value: *v,
                scenario_sales: portfolio.scenario_sales,
                operating_profit: portfolio.scenario_operating_profit,
                operating_margin: portfolio.scenario_operating_margin,
                operating_profit_change: portfolio.operating_profit_change,
            }
        })
        .collect();

    let output = SweepResult {
        parameter,
        base_operating_profit: base.base_operating_profit,
        base_operating_margin: base.base_operating_margin,
        points,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Single-Parameter Sensitivity Sweep",
        &serde_json::json!({
            "parameter": parameter.to_string(),
            "values": sorted.len(),
        }),
        warnings,
        elapsed,
        org_profits.len(),
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(name: &str, sales: Decimal, cost_rate: Decimal, sga: Decimal) -> OrgProfitRecord {
        OrgProfitRecord {
            org: name.to_string(),
            revenue: PlanActual::new(sales, sales),
            cost_rate: PlanActual::new(cost_rate, cost_rate),
            sga: PlanActual::new(sga, sga),
            ..Default::default()
        }
    }

    fn portfolio() -> Vec<OrgProfitRecord> {
        vec![
            // GP 400, OP 200
            org("A", dec!(1000), dec!(60), dec!(200)),
            // GP 1000, OP 500
            org("B", dec!(5000), dec!(80), dec!(500)),
        ]
    }

    #[test]
    fn test_neutral_params_change_nothing() {
        let out = compute_what_if_scenario(
            &portfolio(),
            &WhatIfParams::default(),
            &SensitivityConfig::default(),
        )
        .unwrap();
        let p = &out.result.portfolio;
        assert_eq!(p.operating_profit_change, dec!(0));
        assert_eq!(p.base_operating_profit, dec!(700));
        assert_eq!(p.scenario_operating_profit, dec!(700));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_sales_lever_and_sorting() {
        let params = WhatIfParams {
            sales_change_percent: dec!(10),
            ..Default::default()
        };
        let out =
            compute_what_if_scenario(&portfolio(), &params, &SensitivityConfig::default()).unwrap();
        // A: +40 GP, B: +100 GP
        assert_eq!(out.result.orgs[0].org, "B");
        assert_eq!(out.result.orgs[0].operating_profit_change, dec!(100));
        assert_eq!(out.result.orgs[1].operating_profit_change, dec!(40));
        assert_eq!(out.result.portfolio.scenario_sales, dec!(6600));
    }

    #[test]
    fn test_cost_rate_points_clamped() {
        let params = WhatIfParams {
            cost_rate_change_points: dec!(-70),
            ..Default::default()
        };
        let out =
            compute_what_if_scenario(&portfolio(), &params, &SensitivityConfig::default()).unwrap();
        let a = out.result.orgs.iter().find(|o| o.org == "A").unwrap();
        assert_eq!(a.scenario_cost_rate, dec!(0));
        let b = out.result.orgs.iter().find(|o| o.org == "B").unwrap();
        assert_eq!(b.scenario_cost_rate, dec!(10));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_sga_lever() {
        let params = WhatIfParams {
            sga_change_percent: dec!(-50),
            ..Default::default()
        };
        let out =
            compute_what_if_scenario(&portfolio(), &params, &SensitivityConfig::default()).unwrap();
        assert_eq!(out.result.portfolio.operating_profit_change, dec!(350));
    }

    #[test]
    fn test_zero_revenue_org_has_zero_margins() {
        let profits = vec![org("idle", dec!(0), dec!(70), dec!(50))];
        let params = WhatIfParams {
            sales_change_percent: dec!(20),
            ..Default::default()
        };
        let out =
            compute_what_if_scenario(&profits, &params, &SensitivityConfig::default()).unwrap();
        let o = &out.result.orgs[0];
        assert_eq!(o.base_operating_profit, dec!(-50));
        assert_eq!(o.scenario_sales, dec!(0));
        assert_eq!(o.base_operating_margin, dec!(0));
        assert_eq!(o.scenario_operating_margin, dec!(0));
        assert_eq!(o.scenario_gross_margin, dec!(0));
        assert_eq!(out.result.portfolio.base_operating_margin, dec!(0));
    }

    #[test]
    fn test_reported_operating_profit_mismatch_warns() {
        let mut a = org("A", dec!(1000), dec!(60), dec!(200));
        a.operating_profit = PlanActual::new(dec!(250), dec!(250));
        let mut b = org("B", dec!(5000), dec!(80), dec!(500));
        b.operating_profit = PlanActual::new(dec!(500), dec!(500));
        let out = compute_what_if_scenario(
            &[a, b],
            &WhatIfParams::default(),
            &SensitivityConfig::default(),
        )
        .unwrap();
        let a = out.result.orgs.iter().find(|o| o.org == "A").unwrap();
        assert_eq!(a.reported_operating_profit, dec!(250));
        assert_eq!(a.base_operating_profit, dec!(200));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].starts_with("1 organizations"));
    }

    #[test]
    fn test_sweep_sorted_and_base_point() {
        let out = compute_sensitivity_sweep(
            &portfolio(),
            SweepParameter::Sales,
            &[dec!(10), dec!(-10), dec!(0)],
            &SensitivityConfig::default(),
        )
        .unwrap();
        let values: Vec<Decimal> = out.result.points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![dec!(-10), dec!(0), dec!(10)]);
        assert_eq!(out.result.points[1].operating_profit, dec!(700));
        assert_eq!(out.result.points[1].operating_profit_change, dec!(0));
        assert_eq!(out.result.points[2].operating_profit, dec!(840));
        assert_eq!(out.result.base_operating_profit, dec!(700));
    }

    #[test]
    fn test_sweep_parameter_parse() {
        assert_eq!("SGA".parse::<SweepParameter>().unwrap(), SweepParameter::Sga);
        assert_eq!("cost".parse::<SweepParameter>().unwrap(), SweepParameter::Cost);
        assert!("price".parse::<SweepParameter>().is_err());
    }

    #[test]
    fn test_sweep_requires_values() {
        assert!(compute_sensitivity_sweep(
            &portfolio(),
            SweepParameter::Cost,
            &[],
            &SensitivityConfig::default()
        )
        .is_err());
    }
}
