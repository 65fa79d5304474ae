//! Receivable aging detail.
//!
//! Aging rows are grouped by customer, currency or organization. Ages are
//! summarized as a weighted average of fixed bucket midpoints, weighted by
//! the absolute booked balance in each bucket so credit memos cannot cancel
//! out the weighting (they still net into the totals).
//!
//! All arithmetic uses `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::aggregation::{safe_div, safe_pct, KeyedAccumulator};
use crate::config::AgingConfig;
use crate::records::{AgingAmount, AgingBuckets, ReceivableAgingRecord};
use crate::types::{with_metadata, ComputationOutput, Days, Money, Pct};
use crate::BizMetricsResult;

const UNKNOWN_CUSTOMER: &str = "unknown";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Aging profile for one customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerAgingProfile {
    pub customer_code: String,
    /// Last non-blank name seen for the customer
    pub customer_name: String,
    pub rep: String,
    pub org: String,
    pub currency: String,
    pub row_count: usize,
    pub buckets: AgingBuckets,
    pub total: AgingAmount,
    /// Balance-weighted average age in days
    pub weighted_days: Days,
    /// invoiced total - booked total
    pub invoice_book_gap: Money,
    /// gap / booked total * 100
    pub gap_ratio: Pct,
}

/// Exposure in one currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrencyExposure {
    pub currency: String,
    pub booked_amount: Money,
    pub invoiced_amount: Money,
    pub customer_count: usize,
    /// Share of total booked balance (%)
    pub share: Pct,
}

/// Invoice-vs-book gap for one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrgInvoiceBookGap {
    pub org: String,
    pub booked_amount: Money,
    pub invoiced_amount: Money,
    pub gap: Money,
    pub gap_ratio: Pct,
    pub customer_count: usize,
}

/// Portfolio-wide weighted aging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedAgingSummary {
    pub weighted_days: Days,
    pub total_booked: Money,
    pub total_invoiced: Money,
    pub row_count: usize,
}

/// Portfolio balance in one bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketShare {
    pub bucket: String,
    pub midpoint_days: Days,
    pub booked_amount: Money,
    pub invoiced_amount: Money,
    /// Share of total bucket booked balance (%)
    pub share: Pct,
}

/// Collection risk for one organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrgRiskScore {
    pub org: String,
    pub total_booked: Money,
    /// month3 through overdue
    pub at_risk_booked: Money,
    /// at_risk / total * 100, clamped to [0, 100]
    pub risk_score: Pct,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Weighted-average age of a set of buckets:
/// Σ(|booked_i| × midpoint_i) / Σ|booked_i|, zero when every bucket is empty.
pub fn weighted_days(buckets: &AgingBuckets, midpoints: &[Days; 7]) -> Days {
    let mut weighted = Decimal::ZERO;
    let mut weight = Decimal::ZERO;
    for (amount, mid) in buckets.as_array().iter().zip(midpoints.iter()) {
        let w = amount.booked.abs();
        weighted += w * *mid;
        weight += w;
    }
    safe_div(weighted, weight)
}

fn customer_key(r: &ReceivableAgingRecord) -> &str {
    let code = r.customer_code.trim();
    if !code.is_empty() {
        return code;
    }
    let name = r.customer_name.trim();
    if !name.is_empty() {
        name
    } else {
        UNKNOWN_CUSTOMER
    }
}

fn label_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let v = value.trim();
    if v.is_empty() {
        fallback
    } else {
        v
    }
}

/// Count rows whose stated total disagrees with the bucket sum.
fn total_mismatch_warning(records: &[ReceivableAgingRecord]) -> Option<String> {
    let mismatched = records
        .iter()
        .filter(|r| r.buckets.sum() != r.total)
        .count();
    (mismatched > 0).then(|| {
        format!("{mismatched} aging rows have totals that differ from the sum of their buckets")
    })
}

// ---------------------------------------------------------------------------
// Function 1: compute_customer_aging_profile
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CustomerAcc {
    name: String,
    rep: String,
    org: String,
    currency: String,
    rows: usize,
    buckets: AgingBuckets,
    total: AgingAmount,
}

/// Per-customer bucket totals, weighted age and invoice-vs-book gap,
/// largest booked balance first.
pub fn compute_customer_aging_profile(
    records: &[ReceivableAgingRecord],
    config: &AgingConfig,
) -> BizMetricsResult<ComputationOutput<Vec<CustomerAgingProfile>>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let mut acc: KeyedAccumulator<CustomerAcc> = KeyedAccumulator::new();
    for r in records {
        let c = acc.entry(customer_key(r));
        for (slot, value) in [
            (&mut c.name, &r.customer_name),
            (&mut c.rep, &r.rep),
            (&mut c.org, &r.org),
            (&mut c.currency, &r.currency),
        ] {
            if !value.trim().is_empty() {
                *slot = value.trim().to_string();
            }
        }
        c.rows += 1;
        c.buckets += r.buckets;
        c.total += r.total;
    }

    let blank_codes = records
        .iter()
        .filter(|r| r.customer_code.trim().is_empty())
        .count();
    if blank_codes > 0 {
        warnings.push(format!(
            "{blank_codes} aging rows have no customer code and were grouped by name"
        ));
    }
    if let Some(w) = total_mismatch_warning(records) {
        warnings.push(w);
    }

    let mut profiles: Vec<CustomerAgingProfile> = acc
        .into_entries()
        .into_iter()
        .map(|(code, c)| {
            let gap = c.total.invoiced - c.total.booked;
            CustomerAgingProfile {
                customer_code: code,
                customer_name: c.name,
                rep: c.rep,
                org: c.org,
                currency: if c.currency.is_empty() {
                    config.default_currency.clone()
                } else {
                    c.currency
                },
                row_count: c.rows,
                weighted_days: weighted_days(&c.buckets, &config.midpoints),
                buckets: c.buckets,
                total: c.total,
                invoice_book_gap: gap,
                gap_ratio: safe_pct(gap, c.total.booked),
            }
        })
        .collect();

    profiles.sort_by(|a, b| b.total.booked.cmp(&a.total.booked));

    log::debug!(
        "aging profile: {} rows -> {} customers",
        records.len(),
        profiles.len()
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Customer Receivable Aging Profile (balance-weighted bucket midpoints)",
        &serde_json::json!({
            "midpoints": config.midpoints.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
            "weighting": "absolute booked balance per bucket",
            "gap": "invoiced total - booked total",
        }),
        warnings,
        elapsed,
        records.len(),
        profiles,
    ))
}

// ---------------------------------------------------------------------------
// Function 2: compute_currency_exposure
// ---------------------------------------------------------------------------

/// Booked and invoiced balances per currency with share of total booked.
pub fn compute_currency_exposure(
    records: &[ReceivableAgingRecord],
    config: &AgingConfig,
) -> BizMetricsResult<ComputationOutput<Vec<CurrencyExposure>>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let mut acc: KeyedAccumulator<(AgingAmount, HashSet<String>)> = KeyedAccumulator::new();
    for r in records {
        let ccy = label_or(&r.currency, &config.default_currency);
        let entry = acc.entry(ccy);
        entry.0 += r.total;
        entry.1.insert(customer_key(r).to_string());
    }

    let defaulted = records
        .iter()
        .filter(|r| r.currency.trim().is_empty())
        .count();
    if defaulted > 0 {
        warnings.push(format!(
            "{defaulted} aging rows have no currency and were treated as {}",
            config.default_currency
        ));
    }

    let total_booked: Money = acc.iter().map(|(_, (amt, _))| amt.booked).sum();

    let mut rows: Vec<CurrencyExposure> = acc
        .into_entries()
        .into_iter()
        .map(|(currency, (amt, customers))| CurrencyExposure {
            currency,
            booked_amount: amt.booked,
            invoiced_amount: amt.invoiced,
            customer_count: customers.len(),
            share: safe_pct(amt.booked, total_booked),
        })
        .collect();
    rows.sort_by(|a, b| b.booked_amount.cmp(&a.booked_amount));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Receivable Currency Exposure",
        &serde_json::json!({
            "default_currency": config.default_currency,
            "amount_source": "row total pair",
        }),
        warnings,
        elapsed,
        records.len(),
        rows,
    ))
}

// ---------------------------------------------------------------------------
// Function 3: compute_org_invoice_book_gap
// ---------------------------------------------------------------------------

/// Invoice-vs-book gap per organization, ranked by absolute gap.
pub fn compute_org_invoice_book_gap(
    records: &[ReceivableAgingRecord],
    config: &AgingConfig,
) -> BizMetricsResult<ComputationOutput<Vec<OrgInvoiceBookGap>>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let mut acc: KeyedAccumulator<(AgingAmount, HashSet<String>)> = KeyedAccumulator::new();
    for r in records {
        let org = label_or(&r.org, &config.unassigned_org);
        let entry = acc.entry(org);
        entry.0 += r.total;
        entry.1.insert(customer_key(r).to_string());
    }
    if let Some(w) = total_mismatch_warning(records) {
        warnings.push(w);
    }

    let mut rows: Vec<OrgInvoiceBookGap> = acc
        .into_entries()
        .into_iter()
        .map(|(org, (amt, customers))| {
            let gap = amt.invoiced - amt.booked;
            OrgInvoiceBookGap {
                org,
                booked_amount: amt.booked,
                invoiced_amount: amt.invoiced,
                gap,
                gap_ratio: safe_pct(gap, amt.booked),
                customer_count: customers.len(),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.gap.abs().cmp(&a.gap.abs()));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Organizational Invoice-vs-Book Value Gap",
        &serde_json::json!({
            "gap": "invoiced total - booked total",
            "ranking": "absolute gap, descending",
            "unassigned_label": config.unassigned_org,
        }),
        warnings,
        elapsed,
        records.len(),
        rows,
    ))
}

// ---------------------------------------------------------------------------
// Function 4: compute_weighted_aging_days
// ---------------------------------------------------------------------------

/// Portfolio-wide balance-weighted aging across all rows.
pub fn compute_weighted_aging_days(
    records: &[ReceivableAgingRecord],
    config: &AgingConfig,
) -> BizMetricsResult<ComputationOutput<WeightedAgingSummary>> {
    let start = Instant::now();
    config.validate()?;

    let mut buckets = AgingBuckets::default();
    let mut total = AgingAmount::default();
    for r in records {
        buckets += r.buckets;
        total += r.total;
    }

    let output = WeightedAgingSummary {
        weighted_days: weighted_days(&buckets, &config.midpoints),
        total_booked: total.booked,
        total_invoiced: total.invoiced,
        row_count: records.len(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio Weighted Aging Days",
        &serde_json::json!({
            "midpoints": config.midpoints.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        }),
        Vec::new(),
        elapsed,
        records.len(),
        output,
    ))
}

// ---------------------------------------------------------------------------
// Function 5: compute_aging_distribution
// ---------------------------------------------------------------------------

/// Portfolio balance per bucket in ascending age order.
pub fn compute_aging_distribution(
    records: &[ReceivableAgingRecord],
    config: &AgingConfig,
) -> BizMetricsResult<ComputationOutput<Vec<BucketShare>>> {
    let start = Instant::now();
    config.validate()?;

    let mut buckets = AgingBuckets::default();
    for r in records {
        buckets += r.buckets;
    }
    let amounts = buckets.as_array();
    let total_booked: Money = amounts.iter().map(|a| a.booked).sum();

    let rows: Vec<BucketShare> = AgingBuckets::LABELS
        .iter()
        .zip(amounts.iter())
        .zip(config.midpoints.iter())
        .map(|((label, amt), mid)| BucketShare {
            bucket: label.to_string(),
            midpoint_days: *mid,
            booked_amount: amt.booked,
            invoiced_amount: amt.invoiced,
            share: safe_pct(amt.booked, total_booked),
        })
        .collect();

    let mut warnings = Vec::new();
    if let Some(w) = total_mismatch_warning(records) {
        warnings.push(w);
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Receivable Aging Bucket Distribution",
        &serde_json::json!({ "buckets": AgingBuckets::LABELS }),
        warnings,
        elapsed,
        records.len(),
        rows,
    ))
}

// ---------------------------------------------------------------------------
// Function 6: org risk scores
// ---------------------------------------------------------------------------

/// Risk score per organization in first-seen order, for fuzzy joining.
///
/// Rows with a blank organization are left out. The denominator is the
/// stated row total, not the bucket sum.
pub fn org_risk_table(records: &[ReceivableAgingRecord]) -> Vec<(String, OrgRiskScore)> {
    let mut acc: KeyedAccumulator<(Money, Money)> = KeyedAccumulator::new();
    for r in records {
        let org = r.org.trim();
        if org.is_empty() {
            continue;
        }
        let entry = acc.entry(org);
        entry.0 += r.total.booked;
        entry.1 += r.buckets.at_risk_booked();
    }

    acc.into_entries()
        .into_iter()
        .map(|(org, (total, at_risk))| {
            let score = safe_pct(at_risk, total).clamp(Decimal::ZERO, dec!(100));
            let row = OrgRiskScore {
                org: org.clone(),
                total_booked: total,
                at_risk_booked: at_risk,
                risk_score: score,
            };
            (org, row)
        })
        .collect()
}

/// Aging-derived collection risk per organization, riskiest first.
pub fn compute_org_risk_scores(
    records: &[ReceivableAgingRecord],
) -> BizMetricsResult<ComputationOutput<Vec<OrgRiskScore>>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let blank = records.iter().filter(|r| r.org.trim().is_empty()).count();
    if blank > 0 {
        warnings.push(format!(
            "{blank} aging rows have no organization and are excluded from risk scoring"
        ));
    }

    let mut rows: Vec<OrgRiskScore> = org_risk_table(records)
        .into_iter()
        .map(|(_, score)| score)
        .collect();
    rows.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Aging-Derived Collection Risk Score",
        &serde_json::json!({
            "risk_score": "100 * (month3..month6 + overdue) / total, clamped to [0, 100]",
        }),
        warnings,
        elapsed,
        records.len(),
        rows,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(booked: Decimal, invoiced: Decimal) -> AgingAmount {
        AgingAmount { booked, invoiced }
    }

    fn row(code: &str, org: &str, ccy: &str, buckets: AgingBuckets) -> ReceivableAgingRecord {
        ReceivableAgingRecord {
            customer_code: code.into(),
            customer_name: format!("Customer {code}"),
            rep: "Kim".into(),
            org: org.into(),
            currency: ccy.into(),
            total: buckets.sum(),
            buckets,
        }
    }

    fn month1_only(booked: Decimal) -> AgingBuckets {
        AgingBuckets {
            month1: amt(booked, booked),
            ..Default::default()
        }
    }

    #[test]
    fn test_weighted_days_all_month1_is_fifteen() {
        let cfg = AgingConfig::default();
        assert_eq!(weighted_days(&month1_only(dec!(5000)), &cfg.midpoints), dec!(15));
    }

    #[test]
    fn test_weighted_days_empty_is_zero() {
        let cfg = AgingConfig::default();
        assert_eq!(weighted_days(&AgingBuckets::default(), &cfg.midpoints), dec!(0));
    }

    #[test]
    fn test_weighted_days_uses_absolute_balances() {
        // 100 at 15 days and a -100 credit memo at 270 days:
        // (100*15 + 100*270) / 200 = 142.5
        let cfg = AgingConfig::default();
        let b = AgingBuckets {
            month1: amt(dec!(100), dec!(100)),
            overdue: amt(dec!(-100), dec!(0)),
            ..Default::default()
        };
        assert_eq!(weighted_days(&b, &cfg.midpoints), dec!(142.5));
    }

    #[test]
    fn test_weighted_days_within_midpoint_bounds() {
        let cfg = AgingConfig::default();
        let b = AgingBuckets {
            month2: amt(dec!(300), dec!(300)),
            month4: amt(dec!(700), dec!(700)),
            ..Default::default()
        };
        let d = weighted_days(&b, &cfg.midpoints);
        assert!(d >= dec!(45) && d <= dec!(105), "got {d}");
        // (300*45 + 700*105) / 1000 = 87
        assert_eq!(d, dec!(87));
    }

    #[test]
    fn test_customer_profile_groups_and_sorts() {
        let records = vec![
            row("C1", "A팀", "KRW", month1_only(dec!(100))),
            row("C2", "A팀", "KRW", month1_only(dec!(500))),
            row("C1", "A팀", "KRW", AgingBuckets {
                month3: amt(dec!(100), dec!(120)),
                ..Default::default()
            }),
        ];
        let out = compute_customer_aging_profile(&records, &AgingConfig::default())
            .unwrap()
            .result;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].customer_code, "C2");
        let c1 = &out[1];
        assert_eq!(c1.row_count, 2);
        assert_eq!(c1.total.booked, dec!(200));
        assert_eq!(c1.total.invoiced, dec!(220));
        // (100*15 + 100*75) / 200 = 45
        assert_eq!(c1.weighted_days, dec!(45));
        assert_eq!(c1.invoice_book_gap, dec!(20));
        assert_eq!(c1.gap_ratio, dec!(10));
    }

    #[test]
    fn test_customer_profile_flags_total_mismatch() {
        let mut r = row("C1", "A팀", "KRW", month1_only(dec!(100)));
        r.total = amt(dec!(90), dec!(100));
        let out = compute_customer_aging_profile(&[r], &AgingConfig::default()).unwrap();
        assert_eq!(out.result[0].total.booked, dec!(90));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_currency_exposure_defaults_blank_to_krw() {
        let records = vec![
            row("C1", "A팀", "", month1_only(dec!(300))),
            row("C2", "A팀", "USD", month1_only(dec!(100))),
            row("C3", "A팀", "KRW", month1_only(dec!(100))),
        ];
        let out = compute_currency_exposure(&records, &AgingConfig::default()).unwrap();
        let rows = &out.result;
        assert_eq!(rows[0].currency, "KRW");
        assert_eq!(rows[0].booked_amount, dec!(400));
        assert_eq!(rows[0].customer_count, 2);
        assert_eq!(rows[0].share, dec!(80));
        assert_eq!(rows[1].currency, "USD");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_org_gap_ranked_by_absolute_gap() {
        let mut small = row("C1", "A팀", "KRW", month1_only(dec!(1000)));
        small.total = amt(dec!(1000), dec!(1010));
        let mut big_negative = row("C2", "B팀", "KRW", month1_only(dec!(1000)));
        big_negative.total = amt(dec!(1000), dec!(900));
        let mut blank = row("C3", " ", "KRW", month1_only(dec!(10)));
        blank.total = amt(dec!(10), dec!(40));

        let rows = [small, big_negative, blank];
        let out = compute_org_invoice_book_gap(&rows, &AgingConfig::default())
            .unwrap()
            .result;
        let orgs: Vec<&str> = out.iter().map(|r| r.org.as_str()).collect();
        assert_eq!(orgs, vec!["B팀", "unassigned", "A팀"]);
        assert_eq!(out[0].gap, dec!(-100));
        assert_eq!(out[0].gap_ratio, dec!(-10));
        assert_eq!(out[1].gap_ratio, dec!(300));
    }

    #[test]
    fn test_portfolio_weighted_days() {
        let records = vec![
            row("C1", "A팀", "KRW", month1_only(dec!(100))),
            row("C2", "A팀", "KRW", AgingBuckets {
                overdue: amt(dec!(100), dec!(100)),
                ..Default::default()
            }),
        ];
        let out = compute_weighted_aging_days(&records, &AgingConfig::default())
            .unwrap()
            .result;
        // (100*15 + 100*270) / 200 = 142.5
        assert_eq!(out.weighted_days, dec!(142.5));
        assert_eq!(out.total_booked, dec!(200));
    }

    #[test]
    fn test_distribution_shares_sum_to_hundred() {
        let records = vec![
            row("C1", "A팀", "KRW", month1_only(dec!(300))),
            row("C2", "A팀", "KRW", AgingBuckets {
                month6: amt(dec!(100), dec!(100)),
                ..Default::default()
            }),
        ];
        let out = compute_aging_distribution(&records, &AgingConfig::default())
            .unwrap()
            .result;
        assert_eq!(out.len(), 7);
        assert_eq!(out[0].share, dec!(75));
        assert_eq!(out[5].share, dec!(25));
        let total: Decimal = out.iter().map(|b| b.share).sum();
        assert_eq!(total, dec!(100));
    }

    #[test]
    fn test_risk_score_uses_month3_onward() {
        let records = vec![row("C1", "A팀", "KRW", AgingBuckets {
            month1: amt(dec!(300), dec!(300)),
            month2: amt(dec!(100), dec!(100)),
            month3: amt(dec!(100), dec!(100)),
            overdue: amt(dec!(500), dec!(500)),
            ..Default::default()
        })];
        let out = compute_org_risk_scores(&records).unwrap().result;
        assert_eq!(out[0].at_risk_booked, dec!(600));
        assert_eq!(out[0].risk_score, dec!(60));
    }

    #[test]
    fn test_risk_score_clamped_and_zero_guarded() {
        let mut over = row("C1", "A팀", "KRW", AgingBuckets {
            overdue: amt(dec!(500), dec!(500)),
            ..Default::default()
        });
        over.total = amt(dec!(100), dec!(100));
        let mut empty = row("C2", "B팀", "KRW", AgingBuckets::default());
        empty.total = AgingAmount::default();
        let table = org_risk_table(&[over, empty]);
        assert_eq!(table[0].1.risk_score, dec!(100));
        assert_eq!(table[1].1.risk_score, dec!(0));
    }

    #[test]
    fn test_empty_inputs() {
        let cfg = AgingConfig::default();
        assert!(compute_customer_aging_profile(&[], &cfg).unwrap().result.is_empty());
        assert!(compute_currency_exposure(&[], &cfg).unwrap().result.is_empty());
        assert!(compute_org_invoice_book_gap(&[], &cfg).unwrap().result.is_empty());
        assert_eq!(
            compute_weighted_aging_days(&[], &cfg).unwrap().result.weighted_days,
            dec!(0)
        );
    }
}
