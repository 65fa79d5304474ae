use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::aggregation::{safe_div, safe_pct, KeyedAccumulator};
use crate::config::VarianceConfig;
use crate::records::ProfitabilityAnalysisRecord;
use crate::types::{with_metadata, ComputationOutput, Money, Pct};
use crate::BizMetricsResult;

// ---------------------------------------------------------------------------
// Output types: 3-way variance
// ---------------------------------------------------------------------------

/// Price/volume/mix decomposition of one (org, customer, product) line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VarianceItem {
    pub org: String,
    pub customer: String,
    pub product: String,
    pub plan_qty: Decimal,
    pub actual_qty: Decimal,
    pub plan_amount: Money,
    pub actual_amount: Money,
    /// plan amount / plan quantity (0 when the quantity is 0)
    pub plan_price: Money,
    /// actual amount / actual quantity (0 when the quantity is 0)
    pub actual_price: Money,
    /// (actual price - plan price) * actual quantity
    pub price_variance: Money,
    /// (actual quantity - plan quantity) * plan price
    pub volume_variance: Money,
    /// Residual: total - price - volume
    pub mix_variance: Money,
    /// actual amount - plan amount
    pub total_variance: Money,
    /// Planned but not traded this period
    pub is_lost_trade: bool,
}

/// Decomposition rolled up to one organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrgVarianceSummary {
    pub org: String,
    pub price_variance: Money,
    pub volume_variance: Money,
    pub mix_variance: Money,
    pub total_variance: Money,
    pub item_count: usize,
}

/// Full variance analysis output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceAnalysisResult {
    pub items: Vec<VarianceItem>,
    pub price_variance: Money,
    pub volume_variance: Money,
    pub mix_variance: Money,
    pub total_variance: Money,
    /// Actual amount of unplanned trades, kept out of the decomposition
    pub new_trade_amount: Money,
    pub new_trade_count: usize,
    /// Plan amount of planned trades with no actual quantity
    pub lost_trade_amount: Money,
    pub lost_trade_count: usize,
    /// Rows with neither plan nor actual quantity
    pub skipped_rows: usize,
    pub total_rows: usize,
    /// (decomposed + new) / total rows * 100
    pub analysis_rate: Pct,
    /// Largest absolute total variance first
    pub org_summaries: Vec<OrgVarianceSummary>,
}

/// How a single row participates in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowClass {
    Skipped,
    NewTrade,
    LostTrade,
    Decomposed,
}

/// A quantity whose magnitude is within `zero` counts as zero.
fn classify(row: &ProfitabilityAnalysisRecord, zero: Decimal) -> RowClass {
    let plan_zero = row.quantity.plan.abs() <= zero;
    let actual_zero = row.quantity.actual.abs() <= zero;
    if plan_zero && actual_zero {
        RowClass::Skipped
    } else if plan_zero && row.quantity.actual > zero {
        RowClass::NewTrade
    } else if row.quantity.plan > zero && actual_zero {
        RowClass::LostTrade
    } else {
        RowClass::Decomposed
    }
}

fn decompose(row: &ProfitabilityAnalysisRecord, is_lost_trade: bool) -> VarianceItem {
    let plan_qty = row.quantity.plan;
    let actual_qty = row.quantity.actual;
    let plan_amount = row.amount.plan;
    let actual_amount = row.amount.actual;

    let plan_price = safe_div(plan_amount, plan_qty);
    let actual_price = safe_div(actual_amount, actual_qty);

    let total_variance = row.amount.delta();
    let price_variance = (actual_price - plan_price) * actual_qty;
    let volume_variance = (actual_qty - plan_qty) * plan_price;
    let mix_variance = total_variance - price_variance - volume_variance;

    VarianceItem {
        org: row.org.clone(),
        customer: row.customer.clone(),
        product: row.product.clone(),
        plan_qty,
        actual_qty,
        plan_amount,
        actual_amount,
        plan_price,
        actual_price,
        price_variance,
        volume_variance,
        mix_variance,
        total_variance,
        is_lost_trade,
    }
}

// ---------------------------------------------------------------------------
// Function: compute_variance_analysis
// ---------------------------------------------------------------------------

/// Three-way price/volume/mix decomposition of plan-vs-actual revenue.
///
/// New trades (no plan quantity) are isolated and reported separately; lost
/// trades (no actual quantity) are still decomposed and flagged. Rows with
/// neither quantity are skipped.
pub fn compute_variance_analysis(
    records: &[ProfitabilityAnalysisRecord],
    config: &VarianceConfig,
) -> BizMetricsResult<ComputationOutput<VarianceAnalysisResult>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let mut items: Vec<VarianceItem> = Vec::new();
    let mut new_trade_amount = Decimal::ZERO;
    let mut new_trade_count = 0usize;
    let mut lost_trade_amount = Decimal::ZERO;
    let mut lost_trade_count = 0usize;
    let mut skipped_rows = 0usize;
    let mut negative_qty_rows = 0usize;

    for row in records {
        if row.quantity.plan < Decimal::ZERO || row.quantity.actual < Decimal::ZERO {
            negative_qty_rows += 1;
        }
        match classify(row, config.zero_quantity) {
            RowClass::Skipped => skipped_rows += 1,
            RowClass::NewTrade => {
                new_trade_amount += row.amount.actual;
                new_trade_count += 1;
            }
            RowClass::LostTrade => {
                lost_trade_amount += row.amount.plan;
                lost_trade_count += 1;
                items.push(decompose(row, true));
            }
            RowClass::Decomposed => items.push(decompose(row, false)),
        }
    }

    if negative_qty_rows > 0 {
        warnings.push(format!(
            "{negative_qty_rows} rows carry a negative quantity (returns); they are decomposed as regular rows"
        ));
    }

    // --- Org rollups ---
    let mut by_org: KeyedAccumulator<OrgVarianceSummary> = KeyedAccumulator::new();
    for item in &items {
        let entry = by_org.entry(item.org.trim());
        entry.price_variance += item.price_variance;
        entry.volume_variance += item.volume_variance;
        entry.mix_variance += item.mix_variance;
        entry.total_variance += item.total_variance;
        entry.item_count += 1;
    }
    let mut org_summaries: Vec<OrgVarianceSummary> = by_org
        .into_entries()
        .into_iter()
        .map(|(org, summary)| OrgVarianceSummary { org, ..summary })
        .collect();
    org_summaries.sort_by(|a, b| b.total_variance.abs().cmp(&a.total_variance.abs()));

    // --- Portfolio totals ---
    let price_variance: Money = items.iter().map(|i| i.price_variance).sum();
    let volume_variance: Money = items.iter().map(|i| i.volume_variance).sum();
    let mix_variance: Money = items.iter().map(|i| i.mix_variance).sum();
    let total_variance: Money = items.iter().map(|i| i.total_variance).sum();

    let total_rows = records.len();
    let analysis_rate = safe_pct(
        Decimal::from((items.len() + new_trade_count) as u64),
        Decimal::from(total_rows as u64),
    );

    log::debug!(
        "variance: {} rows, {} decomposed, {} new, {} lost, {} skipped",
        total_rows,
        items.len(),
        new_trade_count,
        lost_trade_count,
        skipped_rows
    );

    let output = VarianceAnalysisResult {
        items,
        price_variance,
        volume_variance,
        mix_variance,
        total_variance,
        new_trade_amount,
        new_trade_count,
        lost_trade_amount,
        lost_trade_count,
        skipped_rows,
        total_rows,
        analysis_rate,
        org_summaries,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Three-Way Price/Volume/Mix Variance Decomposition",
        &serde_json::json!({
            "price_variance": "(actual_price - plan_price) * actual_qty",
            "volume_variance": "(actual_qty - plan_qty) * plan_price",
            "mix_variance": "total - price - volume",
            "zero_quantity": config.zero_quantity.to_string(),
        }),
        warnings,
        elapsed,
        total_rows,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
