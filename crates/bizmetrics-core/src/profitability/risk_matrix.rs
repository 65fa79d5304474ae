use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::aggregation::{safe_pct, sum_by_key};
use crate::config::ProfitRiskConfig;
use crate::org_match::fuzzy_match;
use crate::receivables::aging::org_risk_table;
use crate::records::{OrgProfitRecord, ReceivableAgingRecord, SalesRecord};
use crate::types::{with_metadata, ComputationOutput, Money, Pct};
use crate::BizMetricsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskGrade {
    High,
    Medium,
    Low,
}

/// Profitability x collection-risk quadrant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// High profit, low risk
    Star,
    /// Low profit, low risk
    CashCow,
    /// High profit, high risk
    ProblemChild,
    /// Low profit, high risk
    Dog,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Star,
        Quadrant::CashCow,
        Quadrant::ProblemChild,
        Quadrant::Dog,
    ];

    pub fn classify(high_profit: bool, high_risk: bool) -> Self {
        match (high_profit, high_risk) {
            (true, false) => Quadrant::Star,
            (false, false) => Quadrant::CashCow,
            (true, true) => Quadrant::ProblemChild,
            (false, true) => Quadrant::Dog,
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Quadrant::Star => "Maintain and expand: profitable with healthy collections",
            Quadrant::CashCow => "Improve margins: collections are healthy but profitability lags",
            Quadrant::ProblemChild => "Tighten credit: profitable but receivables are aging",
            Quadrant::Dog => "Restructure or exit: low profitability and high collection risk",
        }
    }
}

/// One organization placed on the matrix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfitRiskData {
    pub org: String,
    /// Summed sales records for the org, or the P&L actual revenue when none match
    pub sales: Money,
    /// Operating profit / revenue * 100 (actuals)
    pub profit_margin: Pct,
    pub operating_profit: Money,
    pub risk_score: Pct,
    pub risk_grade: RiskGrade,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuadrantSummary {
    pub quadrant: Quadrant,
    pub count: usize,
    pub total_sales: Money,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitRiskMatrix {
    pub orgs: Vec<ProfitRiskData>,
    /// Always all four quadrants, in star, cash_cow, problem_child, dog order
    pub quadrants: Vec<QuadrantSummary>,
    pub margin_benchmark: Pct,
    pub risk_benchmark: Pct,
}

pub fn risk_grade(score: Pct, config: &ProfitRiskConfig) -> RiskGrade {
    if score >= config.high_grade_cut {
        RiskGrade::High
    } else if score >= config.medium_grade_cut {
        RiskGrade::Medium
    } else {
        RiskGrade::Low
    }
}

/// Quadrant for a margin/risk pair. The margin benchmark is inclusive on the
/// high-profit side; a risk score equal to the benchmark is still low risk.
pub fn classify_quadrant(margin: Pct, risk: Pct, config: &ProfitRiskConfig) -> Quadrant {
    Quadrant::classify(margin >= config.margin_benchmark, risk > config.risk_benchmark)
}

// ---------------------------------------------------------------------------
// Function: compute_profit_risk_matrix
// ---------------------------------------------------------------------------

/// Cross organizational profitability with aging-derived collection risk.
///
/// Org profit rows are joined to aging risk and to sales totals by fuzzy
/// name matching. Rows with a blank org or zero actual revenue are left out.
pub fn compute_profit_risk_matrix(
    org_profits: &[OrgProfitRecord],
    aging: &[ReceivableAgingRecord],
    sales: &[SalesRecord],
    config: &ProfitRiskConfig,
) -> BizMetricsResult<ComputationOutput<ProfitRiskMatrix>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let risk_table = org_risk_table(aging);
    let sales_by_org = sum_by_key(
        sales,
        |s| {
            let org = s.org.trim();
            (!org.is_empty()).then(|| org.to_string())
        },
        |s| s.amount,
    );

    let mut orgs: Vec<ProfitRiskData> = Vec::new();
    let mut unmatched_risk: Vec<&str> = Vec::new();
    let mut excluded = 0usize;

    for p in org_profits {
        let org = p.org.trim();
        if org.is_empty() || p.revenue.actual.is_zero() {
            excluded += 1;
            continue;
        }

        let risk_score = match fuzzy_match(&risk_table, org) {
            Some(r) => r.risk_score,
            None => {
                unmatched_risk.push(org);
                Decimal::ZERO
            }
        };
        let org_sales = fuzzy_match(sales_by_org.as_slice(), org)
            .copied()
            .unwrap_or(p.revenue.actual);
        let profit_margin = safe_pct(p.operating_profit.actual, p.revenue.actual);

        orgs.push(ProfitRiskData {
            org: org.to_string(),
            sales: org_sales,
            profit_margin,
            operating_profit: p.operating_profit.actual,
            risk_score,
            risk_grade: risk_grade(risk_score, config),
            quadrant: classify_quadrant(profit_margin, risk_score, config),
        });
    }

    if !unmatched_risk.is_empty() {
        warnings.push(format!(
            "No aging match for {}; risk score set to 0",
            unmatched_risk.join(", ")
        ));
    }
    if excluded > 0 {
        warnings.push(format!(
            "{excluded} org profit rows have a blank org or zero actual revenue and were not classified"
        ));
    }

    let quadrants: Vec<QuadrantSummary> = Quadrant::ALL
        .iter()
        .map(|q| {
            let members: Vec<&ProfitRiskData> = orgs.iter().filter(|o| o.quadrant == *q).collect();
            QuadrantSummary {
                quadrant: *q,
                count: members.len(),
                total_sales: members.iter().map(|o| o.sales).sum(),
                recommendation: q.recommendation().to_string(),
            }
        })
        .collect();

    log::debug!(
        "profit-risk: {} orgs classified, {} aging orgs",
        orgs.len(),
        risk_table.len()
    );

    let output = ProfitRiskMatrix {
        orgs,
        quadrants,
        margin_benchmark: config.margin_benchmark,
        risk_benchmark: config.risk_benchmark,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Profitability x Collection Risk Quadrant Matrix",
        &serde_json::json!({
            "margin_benchmark": config.margin_benchmark.to_string(),
            "risk_benchmark": config.risk_benchmark.to_string(),
            "grade_cuts": {
                "high": config.high_grade_cut.to_string(),
                "medium": config.medium_grade_cut.to_string(),
            },
        }),
        warnings,
        elapsed,
        org_profits.len() + aging.len() + sales.len(),
        output,
    ))
}
