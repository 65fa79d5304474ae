use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::aggregation::{extract_month, safe_pct, KeyedAccumulator};
use crate::records::{CollectionRecord, OrderRecord, SalesRecord};
use crate::types::{with_metadata, ComputationOutput, Money, Pct};
use crate::BizMetricsResult;

// ---------------------------------------------------------------------------
// Types: O2C funnel
// ---------------------------------------------------------------------------

/// Funnel stages in their fixed reporting order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStageKind {
    Order,
    RevenueConversion,
    NetCollection,
    Outstanding,
}

impl FunnelStageKind {
    pub fn label(&self) -> &'static str {
        match self {
            FunnelStageKind::Order => "Order",
            FunnelStageKind::RevenueConversion => "Revenue conversion",
            FunnelStageKind::NetCollection => "Net collection",
            FunnelStageKind::Outstanding => "Outstanding",
        }
    }
}

/// A single funnel stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: FunnelStageKind,
    pub label: String,
    pub amount: Money,
    /// Backing row count. The outstanding stage is derived and reports 0.
    pub count: usize,
    /// amount / total orders * 100
    pub percentage: Pct,
}

/// Order-to-cash funnel output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct O2CPipelineResult {
    pub stages: Vec<FunnelStage>,
    pub total_orders: Money,
    pub total_sales: Money,
    pub gross_collections: Money,
    pub prepayment_amount: Money,
    /// gross - prepayment; may be negative
    pub net_collections: Money,
    /// max(0, sales - net collections)
    pub outstanding: Money,
}

/// One month of the conversion trend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyConversion {
    /// `YYYY-MM`
    pub month: String,
    pub order_amount: Money,
    pub sales_amount: Money,
    pub net_collection_amount: Money,
    pub order_count: usize,
    pub sales_count: usize,
    pub collection_count: usize,
    /// sales / orders * 100
    pub conversion_rate: Pct,
    /// net collections / sales * 100
    pub collection_rate: Pct,
}

#[derive(Default)]
struct MonthAcc {
    orders: Money,
    sales: Money,
    net_collections: Money,
    order_count: usize,
    sales_count: usize,
    collection_count: usize,
}

// ---------------------------------------------------------------------------
// Function 1: compute_o2c_pipeline
// ---------------------------------------------------------------------------

/// Stage orders through revenue and net cash collection to the outstanding
/// balance.
pub fn compute_o2c_pipeline(
    orders: &[OrderRecord],
    sales: &[SalesRecord],
    collections: &[CollectionRecord],
) -> BizMetricsResult<ComputationOutput<O2CPipelineResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let total_orders: Money = orders.iter().map(|o| o.amount).sum();
    let total_sales: Money = sales.iter().map(|s| s.amount).sum();
    let gross_collections: Money = collections.iter().map(|c| c.booked_amount).sum();
    let prepayment_amount: Money = collections.iter().map(|c| c.booked_prepayment).sum();
    let net_collections = gross_collections - prepayment_amount;

    let raw_outstanding = total_sales - net_collections;
    if raw_outstanding < Decimal::ZERO {
        warnings.push(format!(
            "Net collections exceed sales by {}; outstanding reported as zero",
            -raw_outstanding
        ));
    }
    let outstanding = raw_outstanding.max(Decimal::ZERO);

    let stage = |kind: FunnelStageKind, amount: Money, count: usize| FunnelStage {
        stage: kind,
        label: kind.label().to_string(),
        amount,
        count,
        percentage: safe_pct(amount, total_orders),
    };

    let stages = vec![
        stage(FunnelStageKind::Order, total_orders, orders.len()),
        stage(FunnelStageKind::RevenueConversion, total_sales, sales.len()),
        stage(FunnelStageKind::NetCollection, net_collections, collections.len()),
        stage(FunnelStageKind::Outstanding, outstanding, 0),
    ];

    log::debug!(
        "o2c pipeline: {} orders, {} sales, {} collections, outstanding {}",
        orders.len(),
        sales.len(),
        collections.len(),
        outstanding
    );

    let output = O2CPipelineResult {
        stages,
        total_orders,
        total_sales,
        gross_collections,
        prepayment_amount,
        net_collections,
        outstanding,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Order-to-Cash Funnel (order → revenue → net collection → outstanding)",
        &serde_json::json!({
            "net_collection": "gross booked collection - booked prepayment",
            "outstanding": "max(0, sales - net collections)",
            "percentage_base": "total orders",
        }),
        warnings,
        elapsed,
        orders.len() + sales.len() + collections.len(),
        output,
    ))
}

// ---------------------------------------------------------------------------
// Function 2: compute_monthly_conversion
// ---------------------------------------------------------------------------

/// Month-by-month conversion (sales / orders) and collection (net
/// collections / sales) rates. Each record lands in its own month.
pub fn compute_monthly_conversion(
    orders: &[OrderRecord],
    sales: &[SalesRecord],
    collections: &[CollectionRecord],
) -> BizMetricsResult<ComputationOutput<Vec<MonthlyConversion>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let mut months: KeyedAccumulator<MonthAcc> = KeyedAccumulator::new();

    let mut undated = (0usize, 0usize, 0usize);

    for o in orders {
        match extract_month(&o.order_date) {
            Some(m) => {
                let acc = months.entry(&m);
                acc.orders += o.amount;
                acc.order_count += 1;
            }
            None => undated.0 += 1,
        }
    }
    for s in sales {
        match extract_month(&s.sale_date) {
            Some(m) => {
                let acc = months.entry(&m);
                acc.sales += s.amount;
                acc.sales_count += 1;
            }
            None => undated.1 += 1,
        }
    }
    for c in collections {
        match extract_month(&c.collection_date) {
            Some(m) => {
                let acc = months.entry(&m);
                acc.net_collections += c.net_amount();
                acc.collection_count += 1;
            }
            None => undated.2 += 1,
        }
    }

    for (name, n) in [
        ("order", undated.0),
        ("sales", undated.1),
        ("collection", undated.2),
    ] {
        if n > 0 {
            warnings.push(format!(
                "{n} {name} rows have no valid date and were left out of the monthly trend"
            ));
        }
    }

    let mut rows: Vec<MonthlyConversion> = months
        .into_entries()
        .into_iter()
        .map(|(month, a)| MonthlyConversion {
            month,
            conversion_rate: safe_pct(a.sales, a.orders),
            collection_rate: safe_pct(a.net_collections, a.sales),
            order_amount: a.orders,
            sales_amount: a.sales,
            net_collection_amount: a.net_collections,
            order_count: a.order_count,
            sales_count: a.sales_count,
            collection_count: a.collection_count,
        })
        .collect();

    // YYYY-MM sorts chronologically as a string
    rows.sort_by(|a, b| a.month.cmp(&b.month));

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly Order-to-Revenue Conversion and Collection Rates",
        &serde_json::json!({
            "conversion_rate": "sales / orders * 100",
            "collection_rate": "net collections / sales * 100",
            "months": rows.len(),
        }),
        warnings,
        elapsed,
        orders.len() + sales.len() + collections.len(),
        rows,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(date: &str, amount: Decimal) -> OrderRecord {
        OrderRecord {
            order_date: date.into(),
            org: "영업1팀".into(),
            amount,
        }
    }

    fn sale(date: &str, amount: Decimal) -> SalesRecord {
        SalesRecord {
            sale_date: date.into(),
            org: "영업1팀".into(),
            customer_code: "C001".into(),
            customer_name: "Acme".into(),
            amount,
        }
    }

    fn collection(date: &str, gross: Decimal, prepay: Decimal) -> CollectionRecord {
        CollectionRecord {
            collection_date: date.into(),
            org: "영업1팀".into(),
            booked_amount: gross,
            booked_prepayment: prepay,
            prepayment_amount: prepay,
        }
    }

    #[test]
    fn test_pipeline_stages_in_fixed_order() {
        let orders = vec![order("2024-01-10", dec!(1000))];
        let sales = vec![sale("2024-01-20", dec!(800))];
        let colls = vec![collection("2024-02-01", dec!(700), dec!(100))];
        let out = compute_o2c_pipeline(&orders, &sales, &colls).unwrap().result;

        let kinds: Vec<FunnelStageKind> = out.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            kinds,
            vec![
                FunnelStageKind::Order,
                FunnelStageKind::RevenueConversion,
                FunnelStageKind::NetCollection,
                FunnelStageKind::Outstanding,
            ]
        );
        // net = 700 - 100 = 600, outstanding = 800 - 600 = 200
        assert_eq!(out.net_collections, dec!(600));
        assert_eq!(out.outstanding, dec!(200));
        assert_eq!(out.stages[0].percentage, dec!(100));
        assert_eq!(out.stages[1].percentage, dec!(80));
        assert_eq!(out.stages[2].percentage, dec!(60));
        assert_eq!(out.stages[3].percentage, dec!(20));
    }

    #[test]
    fn test_outstanding_clamped_when_over_collected() {
        let colls = vec![collection("2024-01-01", dec!(100), dec!(0))];
        let result = compute_o2c_pipeline(&[], &[], &colls).unwrap();
        assert_eq!(result.result.total_sales, dec!(0));
        assert_eq!(result.result.outstanding, dec!(0));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_zero_orders_gives_zero_percentages() {
        let sales = vec![sale("2024-01-20", dec!(500))];
        let out = compute_o2c_pipeline(&[], &sales, &[]).unwrap().result;
        assert!(out.stages.iter().all(|s| s.percentage == dec!(0)));
    }

    #[test]
    fn test_negative_net_collection_tolerated() {
        let sales = vec![sale("2024-01-20", dec!(100))];
        let colls = vec![collection("2024-01-25", dec!(50), dec!(80))];
        let out = compute_o2c_pipeline(&[], &sales, &colls).unwrap().result;
        assert_eq!(out.net_collections, dec!(-30));
        assert_eq!(out.outstanding, dec!(130));
    }

    #[test]
    fn test_stage_counts() {
        let orders = vec![order("2024-01-10", dec!(1)), order("2024-01-11", dec!(1))];
        let out = compute_o2c_pipeline(&orders, &[], &[]).unwrap().result;
        assert_eq!(out.stages[0].count, 2);
        assert_eq!(out.stages[3].count, 0);
    }

    #[test]
    fn test_monthly_conversion_union_of_months() {
        let orders = vec![order("2024-01-10", dec!(1000)), order("2024-03-02", dec!(400))];
        let sales = vec![sale("2024-01-20", dec!(500)), sale("2024-02-15", dec!(300))];
        let colls = vec![collection("2024-02-28", dec!(350), dec!(50))];
        let rows = compute_monthly_conversion(&orders, &sales, &colls)
            .unwrap()
            .result;

        let months: Vec<&str> = rows.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);

        assert_eq!(rows[0].conversion_rate, dec!(50));
        assert_eq!(rows[0].collection_rate, dec!(0));
        // Feb: no orders -> conversion 0; collection = 300 / 300
        assert_eq!(rows[1].conversion_rate, dec!(0));
        assert_eq!(rows[1].net_collection_amount, dec!(300));
        assert_eq!(rows[1].collection_rate, dec!(100));
        assert_eq!(rows[2].sales_amount, dec!(0));
    }

    #[test]
    fn test_monthly_conversion_zero_sales_month() {
        let orders = vec![order("2024-04-03", dec!(900))];
        let sales = vec![sale("2024-04-20", dec!(0))];
        let colls = vec![collection("2024-04-30", dec!(250), dec!(0))];
        let rows = compute_monthly_conversion(&orders, &sales, &colls)
            .unwrap()
            .result;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sales_count, 1);
        assert_eq!(rows[0].net_collection_amount, dec!(250));
        assert_eq!(rows[0].conversion_rate, dec!(0));
        assert_eq!(rows[0].collection_rate, dec!(0));
    }

    #[test]
    fn test_monthly_conversion_skips_undated_rows() {
        let orders = vec![order("", dec!(1000)), order("2024-05-01", dec!(10))];
        let result = compute_monthly_conversion(&orders, &[], &[]).unwrap();
        assert_eq!(result.result.len(), 1);
        assert_eq!(result.result[0].order_amount, dec!(10));
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_monthly_conversion_empty_inputs() {
        let result = compute_monthly_conversion(&[], &[], &[]).unwrap();
        assert!(result.result.is_empty());
        assert!(result.warnings.is_empty());
    }
}
