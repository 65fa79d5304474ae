use serde_json::Value;

use bizmetrics_core::receivables::aging;

use super::DataArgs;
use crate::input;

pub fn run_aging_profile(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args)?;
    let result = aging::compute_customer_aging_profile(&ds.aging, &cfg.aging)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_currency_exposure(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args)?;
    let result = aging::compute_currency_exposure(&ds.aging, &cfg.aging)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_invoice_gap(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args)?;
    let result = aging::compute_org_invoice_book_gap(&ds.aging, &cfg.aging)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_weighted_aging(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args)?;
    let result = aging::compute_weighted_aging_days(&ds.aging, &cfg.aging)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_aging_distribution(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args)?;
    let result = aging::compute_aging_distribution(&ds.aging, &cfg.aging)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_risk_scores(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, _) = input::load(&args)?;
    let result = aging::compute_org_risk_scores(&ds.aging)?;
    Ok(serde_json::to_value(result)?)
}
