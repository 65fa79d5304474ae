pub mod customer;
pub mod fpa;
pub mod o2c;
pub mod profitability;
pub mod receivables;
pub mod scenarios;
pub mod time_series;

use clap::Args;

/// Dataset, config and organization filter shared by every data-driven command
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Path to the dataset (JSON or YAML); read from stdin when omitted
    #[arg(long)]
    pub input: Option<String>,

    /// Path to an analytics config file (JSON or YAML) overriding the defaults
    #[arg(long)]
    pub config: Option<String>,

    /// Restrict every record collection to these organizations (repeatable,
    /// matched exactly or by containment)
    #[arg(long = "org")]
    pub org: Vec<String>,
}
