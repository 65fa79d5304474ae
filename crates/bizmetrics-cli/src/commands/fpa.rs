use serde_json::Value;

use bizmetrics_core::fpa::variance;

use super::DataArgs;
use crate::input;

pub fn run_variance(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args)?;
    if ds.profitability.is_empty() {
        log::warn!("dataset has no profitability records; variance will be empty");
    }
    let result = variance::compute_variance_analysis(&ds.profitability, &cfg.variance)?;
    Ok(serde_json::to_value(result)?)
}
