use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use bizmetrics_core::customer::clv;

use super::DataArgs;
use crate::input;

/// Arguments for customer lifetime value
#[derive(Args)]
pub struct ClvArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Years of history the sales cover (default: derived from sale dates)
    #[arg(long)]
    pub years: Option<Decimal>,
}

pub fn run_clv(args: ClvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args.data)?;
    let result = clv::compute_clv(&ds.sales, &ds.org_profits, args.years, &cfg.clv)?;
    Ok(serde_json::to_value(result)?)
}
