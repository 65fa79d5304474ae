use serde::{Deserialize, Serialize};

use crate::org_match::filter_by_orgs;
use crate::records::{
    CollectionRecord, OrderRecord, OrgProfitRecord, ProfitabilityAnalysisRecord,
    ReceivableAgingRecord, SalesRecord,
};
use crate::BizMetricsResult;

/// One point-in-time extract of every record collection.
///
/// Consistency across collections (same cut-off date) is the producer's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub orders: Vec<OrderRecord>,
    pub sales: Vec<SalesRecord>,
    pub collections: Vec<CollectionRecord>,
    pub aging: Vec<ReceivableAgingRecord>,
    pub org_profits: Vec<OrgProfitRecord>,
    pub profitability: Vec<ProfitabilityAnalysisRecord>,
}

impl Dataset {
    pub fn from_json_str(json: &str) -> BizMetricsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Restrict every collection to the given organizations.
    pub fn filter_orgs<S: AsRef<str>>(&self, names: &[S]) -> Dataset {
        Dataset {
            orders: filter_by_orgs(&self.orders, names),
            sales: filter_by_orgs(&self.sales, names),
            collections: filter_by_orgs(&self.collections, names),
            aging: filter_by_orgs(&self.aging, names),
            org_profits: filter_by_orgs(&self.org_profits, names),
            profitability: filter_by_orgs(&self.profitability, names),
        }
    }

    pub fn row_count(&self) -> usize {
        self.orders.len()
            + self.sales.len()
            + self.collections.len()
            + self.aging.len()
            + self.org_profits.len()
            + self.profitability.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_partial_json_defaults_missing_collections() {
        let ds = Dataset::from_json_str(
            r#"{"sales": [{"sale_date": "2024-01-05", "org": "A", "amount": 100}]}"#,
        )
        .unwrap();
        assert_eq!(ds.sales.len(), 1);
        assert_eq!(ds.sales[0].amount, dec!(100));
        assert!(ds.orders.is_empty());
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn test_aging_buckets_flattened() {
        let ds = Dataset::from_json_str(
            r#"{"aging": [{"customer_code": "C1", "month1": {"booked": "10", "invoiced": "11"},
                "overdue": {"booked": 5}, "total": {"booked": 15, "invoiced": 11}}]}"#,
        )
        .unwrap();
        let row = &ds.aging[0];
        assert_eq!(row.buckets.month1.booked, dec!(10));
        assert_eq!(row.buckets.overdue.booked, dec!(5));
        assert_eq!(row.buckets.month2.booked, dec!(0));
        assert_eq!(row.total.invoiced, dec!(11));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        assert!(Dataset::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_filter_orgs_applies_to_every_collection() {
        let mut ds = Dataset::default();
        ds.orders.push(OrderRecord {
            org: "영업1팀".into(),
            ..Default::default()
        });
        ds.orders.push(OrderRecord {
            org: "영업2팀".into(),
            ..Default::default()
        });
        ds.org_profits.push(OrgProfitRecord {
            org: "영업1".into(),
            ..Default::default()
        });
        let filtered = ds.filter_orgs(&["영업1팀"]);
        assert_eq!(filtered.orders.len(), 1);
        assert_eq!(filtered.org_profits.len(), 1);
    }
}
