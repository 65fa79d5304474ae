//! Typed input records produced by the ingestion layer.
//!
//! The core never mutates these. Blank strings and zero amounts are the only
//! "missing" values it understands; every field defaults when absent so
//! partially-populated extracts still deserialize.

use serde::{Deserialize, Serialize};

use crate::types::{Money, PlanActual};

/// Record types that carry an organization label.
pub trait OrgScoped {
    fn org(&self) -> &str;
}

/// A booked order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderRecord {
    /// Raw order date as delivered by ingestion (any supported date format)
    pub order_date: String,
    pub org: String,
    pub amount: Money,
}

/// A recognized sale (revenue line).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesRecord {
    pub sale_date: String,
    pub org: String,
    pub customer_code: String,
    pub customer_name: String,
    pub amount: Money,
}

/// A cash receipt. `booked_amount` is gross and includes prepayments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionRecord {
    pub collection_date: String,
    pub org: String,
    /// Gross collection in the base currency
    pub booked_amount: Money,
    /// Prepayment portion in the base currency
    pub booked_prepayment: Money,
    /// Prepayment in the original transaction currency
    pub prepayment_amount: Money,
}

impl CollectionRecord {
    /// Gross collection less prepayment. May be negative when prepayments
    /// are reclassified after the fact.
    pub fn net_amount(&self) -> Money {
        self.booked_amount - self.booked_prepayment
    }
}

/// One aging bucket: the booked (base currency) balance and the
/// invoiced/shipped value it corresponds to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingAmount {
    pub booked: Money,
    pub invoiced: Money,
}

impl std::ops::AddAssign for AgingAmount {
    fn add_assign(&mut self, rhs: Self) {
        self.booked += rhs.booked;
        self.invoiced += rhs.invoiced;
    }
}

/// The seven aging buckets in ascending age order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingBuckets {
    pub month1: AgingAmount,
    pub month2: AgingAmount,
    pub month3: AgingAmount,
    pub month4: AgingAmount,
    pub month5: AgingAmount,
    pub month6: AgingAmount,
    pub overdue: AgingAmount,
}

impl AgingBuckets {
    pub const LABELS: [&'static str; 7] = [
        "month1", "month2", "month3", "month4", "month5", "month6", "overdue",
    ];

    pub fn as_array(&self) -> [AgingAmount; 7] {
        [
            self.month1,
            self.month2,
            self.month3,
            self.month4,
            self.month5,
            self.month6,
            self.overdue,
        ]
    }

    /// Sum of all seven buckets.
    pub fn sum(&self) -> AgingAmount {
        let mut total = AgingAmount::default();
        for b in self.as_array() {
            total += b;
        }
        total
    }

    /// Booked balance aged more than two months (month3 onward, including overdue).
    pub fn at_risk_booked(&self) -> Money {
        self.month3.booked
            + self.month4.booked
            + self.month5.booked
            + self.month6.booked
            + self.overdue.booked
    }
}

impl std::ops::AddAssign for AgingBuckets {
    fn add_assign(&mut self, rhs: Self) {
        self.month1 += rhs.month1;
        self.month2 += rhs.month2;
        self.month3 += rhs.month3;
        self.month4 += rhs.month4;
        self.month5 += rhs.month5;
        self.month6 += rhs.month6;
        self.overdue += rhs.overdue;
    }
}

/// A receivable aging snapshot row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceivableAgingRecord {
    pub customer_code: String,
    pub customer_name: String,
    pub rep: String,
    pub org: String,
    pub currency: String,
    #[serde(flatten)]
    pub buckets: AgingBuckets,
    /// Upstream total; trusted to equal the bucket sum but read independently.
    pub total: AgingAmount,
}

/// Organization-level plan/actual P&L.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrgProfitRecord {
    pub org: String,
    pub revenue: PlanActual,
    /// Cost of sales as a percentage of revenue (0–100 scale)
    pub cost_rate: PlanActual,
    pub gross_profit: PlanActual,
    pub sga: PlanActual,
    pub operating_profit: PlanActual,
    /// Operating margin as a percentage (0–100 scale)
    pub operating_margin: PlanActual,
}

/// Plan/actual quantity and amount per (org, customer, product).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfitabilityAnalysisRecord {
    pub org: String,
    pub customer: String,
    pub product: String,
    pub quantity: PlanActual,
    pub amount: PlanActual,
}

macro_rules! impl_org_scoped {
    ($($t:ty),* $(,)?) => {
        $(impl OrgScoped for $t {
            fn org(&self) -> &str {
                &self.org
            }
        })*
    };
}

impl_org_scoped!(
    OrderRecord,
    SalesRecord,
    CollectionRecord,
    ReceivableAgingRecord,
    OrgProfitRecord,
    ProfitabilityAnalysisRecord,
);
