use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use bizmetrics_core::scenarios::sensitivity;
use bizmetrics_core::scenarios::what_if::{self, SweepParameter, WhatIfParams};

use super::DataArgs;
use crate::input;

/// Arguments for the price x volume sensitivity grid
#[derive(Args)]
pub struct SensitivityGridArgs {
    /// Base-case sales
    #[arg(long, allow_hyphen_values = true)]
    pub base_sales: Decimal,

    /// Base-case gross profit
    #[arg(long, allow_hyphen_values = true)]
    pub base_gross_profit: Decimal,

    /// Base-case operating profit
    #[arg(long, allow_hyphen_values = true)]
    pub base_op_profit: Decimal,

    /// Price steps in percent (default from config: -20..20 step 5)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub price_steps: Option<Vec<Decimal>>,

    /// Volume steps in percent
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub volume_steps: Option<Vec<Decimal>>,

    /// Path to an analytics config file supplying default steps
    #[arg(long)]
    pub config: Option<String>,
}

/// Arguments for a what-if scenario
#[derive(Args)]
pub struct WhatIfArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Sales change in percent (e.g. 10 for +10%)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub sales_change: Decimal,

    /// Cost-rate change in percentage points
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub cost_rate_change: Decimal,

    /// SG&A change in percent
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub sga_change: Decimal,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SweepParameterArg {
    Sales,
    Cost,
    Sga,
}

impl From<SweepParameterArg> for SweepParameter {
    fn from(p: SweepParameterArg) -> Self {
        match p {
            SweepParameterArg::Sales => SweepParameter::Sales,
            SweepParameterArg::Cost => SweepParameter::Cost,
            SweepParameterArg::Sga => SweepParameter::Sga,
        }
    }
}

/// Arguments for a single-parameter sweep
#[derive(Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Lever to vary
    #[arg(long)]
    pub parameter: SweepParameterArg,

    /// Comma-separated lever values (percent, or points for cost)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub values: Vec<Decimal>,
}

pub fn run_sensitivity_grid(
    args: SensitivityGridArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let cfg = input::load_config(args.config.as_deref())?;
    let price_steps = args.price_steps.unwrap_or(cfg.sensitivity.price_steps);
    let volume_steps = args.volume_steps.unwrap_or(cfg.sensitivity.volume_steps);
    let result = sensitivity::compute_sensitivity_grid(
        args.base_sales,
        args.base_gross_profit,
        args.base_op_profit,
        &price_steps,
        &volume_steps,
    )?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_what_if(args: WhatIfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args.data)?;
    let params = WhatIfParams {
        sales_change_percent: args.sales_change,
        cost_rate_change_points: args.cost_rate_change,
        sga_change_percent: args.sga_change,
    };
    let result = what_if::compute_what_if_scenario(&ds.org_profits, &params, &cfg.sensitivity)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, cfg) = input::load(&args.data)?;
    let result = what_if::compute_sensitivity_sweep(
        &ds.org_profits,
        args.parameter.into(),
        &args.values,
        &cfg.sensitivity,
    )?;
    Ok(serde_json::to_value(result)?)
}
