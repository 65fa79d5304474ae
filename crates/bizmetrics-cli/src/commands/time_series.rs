use clap::{Args, ValueEnum};
use serde_json::Value;

use bizmetrics_core::time_series::decomposition;

use super::DataArgs;
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SeriesSource {
    Sales,
    Orders,
    /// Net collections (gross less prepayment)
    Collections,
}

/// Arguments for time-series decomposition
#[derive(Args)]
pub struct DecomposeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Which monthly series to decompose
    #[arg(long, value_enum, default_value = "sales")]
    pub source: SeriesSource,

    /// Seasonal period in months (overrides the config)
    #[arg(long)]
    pub period: Option<usize>,
}

pub fn run_decompose(args: DecomposeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (ds, mut cfg) = input::load(&args.data)?;
    if let Some(period) = args.period {
        cfg.decomposition.period = period;
    }
    let series = match args.source {
        SeriesSource::Sales => decomposition::monthly_series_from_sales(&ds.sales),
        SeriesSource::Orders => decomposition::monthly_series_from_orders(&ds.orders),
        SeriesSource::Collections => {
            decomposition::monthly_series_from_collections(&ds.collections)
        }
    };
    let result = decomposition::decompose_time_series(&series, &cfg.decomposition)?;
    Ok(serde_json::to_value(result)?)
}
