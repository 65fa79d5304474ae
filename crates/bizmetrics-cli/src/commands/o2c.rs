use clap::Args;
use serde_json::Value;

use bizmetrics_core::o2c::{pipeline, prepayment};

use super::DataArgs;
use crate::input;

/// Arguments for prepayment analysis
#[derive(Args)]
pub struct PrepaymentArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Canonical organization names to reconcile collections against
    /// (repeatable); unmatched names are reported as "unclassified"
    #[arg(long = "canonical-org")]
    pub canonical_org: Vec<String>,
}

pub fn run_o2c_pipeline(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, _) = input::load(&args)?;
    let result = pipeline::compute_o2c_pipeline(&ds.orders, &ds.sales, &ds.collections)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_monthly_conversion(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, _) = input::load(&args)?;
    let result = pipeline::compute_monthly_conversion(&ds.orders, &ds.sales, &ds.collections)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_prepayment(args: PrepaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, _) = input::load(&args.data)?;
    let result =
        prepayment::analyze_prepayments(&ds.collections, &ds.sales, &args.canonical_org)?;
    Ok(serde_json::to_value(result)?)
}
