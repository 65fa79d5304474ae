use bizmetrics_core::config::AgingConfig;
use bizmetrics_core::o2c::{pipeline, prepayment};
use bizmetrics_core::receivables::aging;
use bizmetrics_core::records::{
    AgingAmount, AgingBuckets, CollectionRecord, ReceivableAgingRecord, SalesRecord,
};
use bizmetrics_core::Dataset;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

fn fixture() -> Dataset {
    Dataset::from_json_str(
        r#"{
        "orders": [
            {"order_date": "2024-01-03", "org": "건자재팀", "amount": "600"},
            {"order_date": "2024-02-07", "org": "철강팀", "amount": "400"}
        ],
        "sales": [
            {"sale_date": "2024-01-15", "org": "건자재팀", "customer_code": "C1", "customer_name": "Alpha", "amount": "500"},
            {"sale_date": "2024-02-20", "org": "철강팀", "customer_code": "C2", "customer_name": "Beta", "amount": "300"}
        ],
        "collections": [
            {"collection_date": "2024-01-31", "org": "건자재", "booked_amount": "450", "booked_prepayment": "100", "prepayment_amount": "100"},
            {"collection_date": "2024-02-28", "org": "철강", "booked_amount": "250", "booked_prepayment": "0", "prepayment_amount": "0"}
        ],
        "aging": [
            {"customer_code": "C1", "customer_name": "Alpha", "org": "건자재", "currency": "KRW",
             "month1": {"booked": "100", "invoiced": "100"},
             "total": {"booked": "100", "invoiced": "100"}},
            {"customer_code": "C2", "customer_name": "Beta", "org": "철강", "currency": "USD",
             "month1": {"booked": "50", "invoiced": "60"},
             "overdue": {"booked": "50", "invoiced": "50"},
             "total": {"booked": "100", "invoiced": "110"}}
        ]
    }"#,
    )
    .unwrap()
}

// ===========================================================================
// O2C funnel
// ===========================================================================

#[test]
fn test_pipeline_stages_and_percentages() {
    let ds = fixture();
    let out = pipeline::compute_o2c_pipeline(&ds.orders, &ds.sales, &ds.collections).unwrap();
    let r = &out.result;
    assert_eq!(r.total_orders, dec!(1000));
    assert_eq!(r.total_sales, dec!(800));
    assert_eq!(r.gross_collections, dec!(700));
    assert_eq!(r.prepayment_amount, dec!(100));
    assert_eq!(r.net_collections, dec!(600));
    assert_eq!(r.outstanding, dec!(200));

    let pct: Vec<_> = r.stages.iter().map(|s| s.percentage).collect();
    assert_eq!(pct, vec![dec!(100), dec!(80), dec!(60), dec!(20)]);
    let counts: Vec<_> = r.stages.iter().map(|s| s.count).collect();
    assert_eq!(counts, vec![2, 2, 2, 0]);
}

#[test]
fn test_outstanding_never_negative() {
    let collections = vec![CollectionRecord {
        booked_amount: dec!(100),
        ..Default::default()
    }];
    let out = pipeline::compute_o2c_pipeline(&[], &[], &collections).unwrap();
    assert_eq!(out.result.outstanding, dec!(0));
    assert!(!out.warnings.is_empty());
}

#[test]
fn test_zero_orders_zero_percentages() {
    let sales = vec![SalesRecord {
        amount: dec!(500),
        ..Default::default()
    }];
    let out = pipeline::compute_o2c_pipeline(&[], &sales, &[]).unwrap();
    assert!(out.result.stages.iter().all(|s| s.percentage == dec!(0)));
}

#[test]
fn test_monthly_conversion_ascending() {
    let ds = fixture();
    let out = pipeline::compute_monthly_conversion(&ds.orders, &ds.sales, &ds.collections).unwrap();
    let rows = &out.result;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].month, "2024-01");
    assert_eq!(rows[1].month, "2024-02");
    // 500 / 600
    assert_eq!(rows[0].conversion_rate, dec!(500) / dec!(600) * dec!(100));
    // net 350 / sales 500
    assert_eq!(rows[0].collection_rate, dec!(70));
}

// ===========================================================================
// Prepayment + org filter
// ===========================================================================

#[test]
fn test_prepayment_after_org_filter() {
    let ds = fixture().filter_orgs(&["건자재팀"]);
    assert_eq!(ds.collections.len(), 1);
    assert_eq!(ds.orders.len(), 1);

    let out =
        prepayment::analyze_prepayments(&ds.collections, &ds.sales, &["건자재팀"]).unwrap();
    let r = &out.result;
    assert_eq!(r.summary.total_booked_prepayment, dec!(100));
    assert_eq!(r.summary.prepayment_to_sales_ratio, dec!(20));
    assert_eq!(r.by_org.len(), 1);
    // reconciled to the canonical name
    assert_eq!(r.by_org[0].org, "건자재팀");
    assert_eq!(r.by_month[0].month, "2024-01");
}

// ===========================================================================
// Receivable aging
// ===========================================================================

#[test]
fn test_all_month1_weighted_fifteen_days() {
    let rows = vec![ReceivableAgingRecord {
        customer_code: "C1".into(),
        buckets: AgingBuckets {
            month1: AgingAmount {
                booked: dec!(250),
                invoiced: dec!(250),
            },
            ..Default::default()
        },
        total: AgingAmount {
            booked: dec!(250),
            invoiced: dec!(250),
        },
        ..Default::default()
    }];
    let out = aging::compute_weighted_aging_days(&rows, &AgingConfig::default()).unwrap();
    assert_eq!(out.result.weighted_days, dec!(15));
}

#[test]
fn test_weighted_days_within_midpoint_bounds() {
    let ds = fixture();
    let out = aging::compute_customer_aging_profile(&ds.aging, &AgingConfig::default()).unwrap();
    for p in &out.result {
        assert!(p.weighted_days >= dec!(15) && p.weighted_days <= dec!(270));
    }
    // C2: (50*15 + 50*270) / 100
    let c2 = out.result.iter().find(|p| p.customer_code == "C2").unwrap();
    assert_eq!(c2.weighted_days, dec!(142.5));
    assert_eq!(c2.invoice_book_gap, dec!(10));
}

#[test]
fn test_currency_exposure_and_risk_scores() {
    let ds = fixture();
    let fx = aging::compute_currency_exposure(&ds.aging, &AgingConfig::default()).unwrap();
    assert_eq!(fx.result.len(), 2);
    assert_eq!(fx.result[0].share, dec!(50));

    let risk = aging::compute_org_risk_scores(&ds.aging).unwrap();
    assert_eq!(risk.result[0].org, "철강");
    assert_eq!(risk.result[0].risk_score, dec!(50));
    assert_eq!(risk.result[1].risk_score, dec!(0));
}

#[test]
fn test_empty_dataset_is_all_zero() {
    let ds = Dataset::default();
    let funnel = pipeline::compute_o2c_pipeline(&ds.orders, &ds.sales, &ds.collections).unwrap();
    assert_eq!(funnel.result.outstanding, dec!(0));
    let monthly =
        pipeline::compute_monthly_conversion(&ds.orders, &ds.sales, &ds.collections).unwrap();
    assert!(monthly.result.is_empty());
    let profile =
        aging::compute_customer_aging_profile(&ds.aging, &AgingConfig::default()).unwrap();
    assert!(profile.result.is_empty());
}
