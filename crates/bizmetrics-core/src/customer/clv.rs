//! Customer lifetime value from transaction frequency and portfolio margin.
//!
//! Each customer's purchase frequency is scaled against the portfolio mean
//! to get a retention factor; the factor stretches or shrinks the base
//! lifespan. Margin is one portfolio-wide figure from the org P&L.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::aggregation::{extract_month, mean, month_index, KeyedAccumulator};
use crate::config::ClvConfig;
use crate::error::BizMetricsError;
use crate::records::{OrgProfitRecord, SalesRecord};
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Years};
use crate::BizMetricsResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Lifetime value estimate for one customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClvResult {
    pub customer_code: String,
    /// Last non-blank name seen for the customer
    pub customer_name: String,
    pub total_sales: Money,
    pub transaction_count: usize,
    pub avg_transaction_value: Money,
    /// Transactions per year
    pub purchase_frequency: Decimal,
    /// Annual value: avg transaction value * purchase frequency
    pub customer_value: Money,
    pub retention_factor: Rate,
    pub estimated_lifespan: Years,
    pub margin: Rate,
    pub clv: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClvSummary {
    pub total_clv: Money,
    pub average_clv: Money,
    pub top_clv: Money,
    pub customer_count: usize,
    pub years_in_data: Years,
    pub average_margin: Rate,
    pub average_frequency: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClvAnalysis {
    /// Highest CLV first
    pub customers: Vec<ClvResult>,
    pub summary: ClvSummary,
}

#[derive(Debug, Default)]
struct CustomerAcc {
    code: String,
    name: String,
    total: Money,
    count: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Inclusive month span of the valid sale dates, in years.
///
/// One year when no sale carries a valid date; never less than one month.
pub fn years_in_data(sales: &[SalesRecord]) -> Years {
    let indices: Vec<i64> = sales
        .iter()
        .filter_map(|s| extract_month(&s.sale_date))
        .filter_map(|m| month_index(&m))
        .collect();

    match (indices.iter().min(), indices.iter().max()) {
        (Some(lo), Some(hi)) => Decimal::from(hi - lo + 1) / Decimal::from(12),
        _ => Decimal::ONE,
    }
}

/// Portfolio gross margin from org P&L actuals, clamped to the configured
/// band. Falls back to the default margin when there is nothing to divide.
pub fn average_margin(org_profits: &[OrgProfitRecord], config: &ClvConfig) -> Rate {
    let revenue: Money = org_profits.iter().map(|p| p.revenue.actual).sum();
    if org_profits.is_empty() || revenue.is_zero() {
        return config.default_margin;
    }
    let gross_profit: Money = org_profits.iter().map(|p| p.gross_profit.actual).sum();
    (gross_profit / revenue).clamp(config.margin_floor, config.margin_cap)
}

fn retention_factor(frequency: Decimal, avg_frequency: Decimal, config: &ClvConfig) -> Rate {
    if avg_frequency.is_zero() {
        return config.degenerate_retention;
    }
    let relative = (frequency / avg_frequency).min(Decimal::ONE);
    relative * (Decimal::ONE - config.retention_floor) + config.retention_floor
}

// ---------------------------------------------------------------------------
// Function: compute_clv
// ---------------------------------------------------------------------------

/// Estimate lifetime value for every customer in the sales records.
///
/// `years_override` replaces the span derived from sale dates.
pub fn compute_clv(
    sales: &[SalesRecord],
    org_profits: &[OrgProfitRecord],
    years_override: Option<Years>,
    config: &ClvConfig,
) -> BizMetricsResult<ComputationOutput<ClvAnalysis>> {
    let start = Instant::now();
    config.validate()?;

    if let Some(y) = years_override {
        if y <= Decimal::ZERO {
            return Err(BizMetricsError::invalid(
                "years_override",
                "Years in data must be positive",
            ));
        }
    }

    let mut warnings: Vec<String> = Vec::new();
    let years = years_override.unwrap_or_else(|| years_in_data(sales));
    let margin = average_margin(org_profits, config);

    if org_profits.is_empty() {
        warnings.push(format!(
            "No org profit records; using default margin {}",
            config.default_margin
        ));
    }

    // --- Group by customer ---
    let mut acc: KeyedAccumulator<CustomerAcc> = KeyedAccumulator::new();
    let mut unidentified = 0usize;
    for s in sales {
        let code = s.customer_code.trim();
        let name = s.customer_name.trim();
        let key = if !code.is_empty() { code } else { name };
        if key.is_empty() {
            unidentified += 1;
            continue;
        }
        let entry = acc.entry(key);
        if entry.count == 0 {
            entry.code = key.to_string();
        }
        if !name.is_empty() {
            entry.name = name.to_string();
        }
        entry.total += s.amount;
        entry.count += 1;
    }
    if unidentified > 0 {
        warnings.push(format!(
            "{unidentified} sales rows have neither customer code nor name and were skipped"
        ));
    }

    let frequencies: Vec<Decimal> = acc
        .iter()
        .map(|(_, c)| Decimal::from(c.count as u64) / years)
        .collect();
    let avg_frequency = mean(&frequencies);

    let mut customers: Vec<ClvResult> = acc
        .into_entries()
        .into_iter()
        .zip(frequencies)
        .map(|((_, c), frequency)| {
            let avg_transaction_value = c.total / Decimal::from(c.count as u64);
            let customer_value = c.total / years;
            let retention = retention_factor(frequency, avg_frequency, config);
            let lifespan = config.base_lifespan_years * retention;
            ClvResult {
                customer_code: c.code,
                customer_name: c.name,
                total_sales: c.total,
                transaction_count: c.count,
                avg_transaction_value,
                purchase_frequency: frequency,
                customer_value,
                retention_factor: retention,
                estimated_lifespan: lifespan,
                margin,
                clv: customer_value * margin * lifespan,
            }
        })
        .collect();

    customers.sort_by(|a, b| b.clv.cmp(&a.clv));

    let total_clv: Money = customers.iter().map(|c| c.clv).sum();
    let clvs: Vec<Money> = customers.iter().map(|c| c.clv).collect();
    let summary = ClvSummary {
        total_clv,
        average_clv: mean(&clvs),
        top_clv: customers.first().map(|c| c.clv).unwrap_or(Decimal::ZERO),
        customer_count: customers.len(),
        years_in_data: years,
        average_margin: margin,
        average_frequency: avg_frequency,
    };

    log::debug!(
        "clv: {} customers over {} years, margin {}",
        summary.customer_count,
        years,
        margin
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Frequency-Scaled Customer Lifetime Value",
        &serde_json::json!({
            "years_in_data": years.to_string(),
            "years_overridden": years_override.is_some(),
            "margin": margin.to_string(),
            "base_lifespan_years": config.base_lifespan_years.to_string(),
            "retention_floor": config.retention_floor.to_string(),
        }),
        warnings,
        elapsed,
        sales.len() + org_profits.len(),
        ClvAnalysis { customers, summary },
    ))
}
