use serde_json::Value;

use bizmetrics_core::profitability::risk_matrix;

use super::DataArgs;
use crate::input;

pub fn run_profit_risk(args: DataArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args)?;
    let result = risk_matrix::compute_profit_risk_matrix(
        &ds.org_profits,
        &ds.aging,
        &ds.sales,
        &cfg.profit_risk,
    )?;
    Ok(serde_json::to_value(result)?)
}
