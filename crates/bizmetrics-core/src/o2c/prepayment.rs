use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::aggregation::{extract_month, safe_pct, KeyedAccumulator};
use crate::org_match::fuzzy_match_entry;
use crate::records::{CollectionRecord, SalesRecord};
use crate::types::{with_metadata, ComputationOutput, Money, Pct};
use crate::BizMetricsResult;

/// Bucket for collections whose organization is blank or not reconcilable.
pub const UNCLASSIFIED_ORG: &str = "unclassified";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Portfolio-wide prepayment totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrepaymentSummary {
    /// Prepayment in original transaction currency, summed as-is
    pub total_prepayment: Money,
    /// Prepayment in the base currency
    pub total_booked_prepayment: Money,
    pub gross_collections: Money,
    pub total_sales: Money,
    /// booked prepayment / sales * 100
    pub prepayment_to_sales_ratio: Pct,
    /// Distinct non-blank organizations with at least one prepayment
    pub org_count: usize,
}

/// Prepayment for one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrgPrepayment {
    pub org: String,
    pub prepayment_amount: Money,
    pub booked_prepayment: Money,
    /// Collection rows carrying a prepayment
    pub count: usize,
    /// Share of total booked prepayment (%)
    pub share: Pct,
}

/// Prepayment for one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyPrepayment {
    pub month: String,
    pub prepayment_amount: Money,
    pub booked_prepayment: Money,
    pub gross_collections: Money,
    /// booked prepayment / gross collections * 100
    pub prepayment_share: Pct,
}

/// The three prepayment views together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepaymentAnalysis {
    pub summary: PrepaymentSummary,
    pub by_org: Vec<OrgPrepayment>,
    pub by_month: Vec<MonthlyPrepayment>,
}

fn has_prepayment(c: &CollectionRecord) -> bool {
    !c.booked_prepayment.is_zero() || !c.prepayment_amount.is_zero()
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

/// Global prepayment summary.
pub fn prepayment_summary(
    collections: &[CollectionRecord],
    sales: &[SalesRecord],
) -> PrepaymentSummary {
    let total_prepayment: Money = collections.iter().map(|c| c.prepayment_amount).sum();
    let total_booked_prepayment: Money = collections.iter().map(|c| c.booked_prepayment).sum();
    let gross_collections: Money = collections.iter().map(|c| c.booked_amount).sum();
    let total_sales: Money = sales.iter().map(|s| s.amount).sum();

    let orgs: HashSet<&str> = collections
        .iter()
        .filter(|c| has_prepayment(c))
        .map(|c| c.org.trim())
        .filter(|o| !o.is_empty())
        .collect();

    PrepaymentSummary {
        total_prepayment,
        total_booked_prepayment,
        gross_collections,
        total_sales,
        prepayment_to_sales_ratio: safe_pct(total_booked_prepayment, total_sales),
        org_count: orgs.len(),
    }
}

/// Prepayment per organization, largest first.
///
/// With a non-empty `canonical_orgs` list each collection's organization is
/// reconciled to a canonical name; unmatched names fall into
/// [`UNCLASSIFIED_ORG`]. Blank names always do.
pub fn prepayment_by_org<S: AsRef<str>>(
    collections: &[CollectionRecord],
    canonical_orgs: &[S],
) -> Vec<OrgPrepayment> {
    let canonical: Vec<(&str, ())> = canonical_orgs.iter().map(|s| (s.as_ref(), ())).collect();
    let mut acc: KeyedAccumulator<(Money, Money, usize)> = KeyedAccumulator::new();

    for c in collections.iter().filter(|c| has_prepayment(c)) {
        let raw = c.org.trim();
        let org = if raw.is_empty() {
            UNCLASSIFIED_ORG
        } else if canonical.is_empty() {
            raw
        } else {
            fuzzy_match_entry(&canonical, raw)
                .map(|(k, _)| k.trim())
                .unwrap_or(UNCLASSIFIED_ORG)
        };
        let entry = acc.entry(org);
        entry.0 += c.prepayment_amount;
        entry.1 += c.booked_prepayment;
        entry.2 += 1;
    }

    let total_booked: Money = acc.iter().map(|(_, a)| a.1).sum();

    let mut rows: Vec<OrgPrepayment> = acc
        .into_entries()
        .into_iter()
        .map(|(org, (raw, booked, count))| OrgPrepayment {
            org,
            prepayment_amount: raw,
            booked_prepayment: booked,
            count,
            share: safe_pct(booked, total_booked),
        })
        .collect();

    rows.sort_by(|a, b| b.booked_prepayment.cmp(&a.booked_prepayment));
    rows
}

/// Prepayment per month, oldest first. Undated rows are left out.
pub fn prepayment_trend(collections: &[CollectionRecord]) -> Vec<MonthlyPrepayment> {
    let mut acc: KeyedAccumulator<(Money, Money, Money)> = KeyedAccumulator::new();
    for c in collections {
        if let Some(month) = extract_month(&c.collection_date) {
            let entry = acc.entry(&month);
            entry.0 += c.prepayment_amount;
            entry.1 += c.booked_prepayment;
            entry.2 += c.booked_amount;
        }
    }

    let mut rows: Vec<MonthlyPrepayment> = acc
        .into_entries()
        .into_iter()
        .map(|(month, (raw, booked, gross))| MonthlyPrepayment {
            month,
            prepayment_amount: raw,
            booked_prepayment: booked,
            gross_collections: gross,
            prepayment_share: safe_pct(booked, gross),
        })
        .collect();
    rows.sort_by(|a, b| a.month.cmp(&b.month));
    rows
}

/// Summary, organizational and monthly prepayment breakdowns.
pub fn analyze_prepayments<S: AsRef<str>>(
    collections: &[CollectionRecord],
    sales: &[SalesRecord],
    canonical_orgs: &[S],
) -> BizMetricsResult<ComputationOutput<PrepaymentAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let summary = prepayment_summary(collections, sales);
    let by_org = prepayment_by_org(collections, canonical_orgs);
    let by_month = prepayment_trend(collections);

    if let Some(unclassified) = by_org.iter().find(|o| o.org == UNCLASSIFIED_ORG) {
        warnings.push(format!(
            "{} prepayment rows ({}) could not be attributed to an organization",
            unclassified.count, unclassified.booked_prepayment
        ));
    }
    let undated = collections
        .iter()
        .filter(|c| extract_month(&c.collection_date).is_none())
        .count();
    if undated > 0 {
        warnings.push(format!(
            "{undated} collection rows have no valid date and were left out of the monthly trend"
        ));
    }
    if summary.total_booked_prepayment < Decimal::ZERO {
        warnings.push("Total booked prepayment is negative".to_string());
    }

    log::debug!(
        "prepayment: {} collections, {} orgs, {} months",
        collections.len(),
        by_org.len(),
        by_month.len()
    );

    let output = PrepaymentAnalysis {
        summary,
        by_org,
        by_month,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Prepayment Isolation from Gross Collections",
        &serde_json::json!({
            "ratio_base": "total sales",
            "canonical_orgs": canonical_orgs.len(),
            "unclassified_label": UNCLASSIFIED_ORG,
        }),
        warnings,
        elapsed,
        collections.len() + sales.len(),
        output,
    ))
}
