mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::customer::ClvArgs;
use commands::o2c::PrepaymentArgs;
use commands::scenarios::{SensitivityGridArgs, SweepArgs, WhatIfArgs};
use commands::time_series::DecomposeArgs;
use commands::DataArgs;

/// Order-to-cash, receivables and profitability analytics
#[derive(Parser)]
#[command(
    name = "bzm",
    version,
    about = "Order-to-cash, receivables and profitability analytics",
    long_about = "A CLI for managerial sales analytics with decimal precision. Reads a \
                  dataset of orders, sales, collections, receivable aging and plan/actual \
                  profitability records and derives funnel, aging, variance, CLV, \
                  profitability-risk, scenario and seasonality metrics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Order -> revenue -> net collection -> outstanding funnel
    O2cPipeline(DataArgs),
    /// Monthly conversion and collection rates
    MonthlyConversion(DataArgs),
    /// Prepayment summary, per-org and monthly breakdowns
    Prepayment(PrepaymentArgs),
    /// Per-customer aging buckets and weighted age
    AgingProfile(DataArgs),
    /// Receivable exposure by currency
    CurrencyExposure(DataArgs),
    /// Invoiced vs booked gap per organization
    InvoiceGap(DataArgs),
    /// Portfolio weighted-average aging days
    WeightedAging(DataArgs),
    /// Portfolio balance per aging bucket
    AgingDistribution(DataArgs),
    /// Aging-derived collection risk score per organization
    RiskScores(DataArgs),
    /// Price/volume/mix variance decomposition
    Variance(DataArgs),
    /// Customer lifetime value
    Clv(ClvArgs),
    /// Profitability x collection-risk quadrant matrix
    ProfitRisk(DataArgs),
    /// Price x volume sensitivity grid around a base P&L
    SensitivityGrid(SensitivityGridArgs),
    /// What-if projection of sales, cost-rate and SG&A changes
    WhatIf(WhatIfArgs),
    /// Sweep one what-if lever across a set of values
    Sweep(SweepArgs),
    /// Trend/seasonal/residual decomposition of a monthly series
    Decompose(DecomposeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::O2cPipeline(args) => commands::o2c::run_o2c_pipeline(args),
        Commands::MonthlyConversion(args) => commands::o2c::run_monthly_conversion(args),
        Commands::Prepayment(args) => commands::o2c::run_prepayment(args),
        Commands::AgingProfile(args) => commands::receivables::run_aging_profile(args),
        Commands::CurrencyExposure(args) => commands::receivables::run_currency_exposure(args),
        Commands::InvoiceGap(args) => commands::receivables::run_invoice_gap(args),
        Commands::WeightedAging(args) => commands::receivables::run_weighted_aging(args),
        Commands::AgingDistribution(args) => commands::receivables::run_aging_distribution(args),
        Commands::RiskScores(args) => commands::receivables::run_risk_scores(args),
        Commands::Variance(args) => commands::fpa::run_variance(args),
        Commands::Clv(args) => commands::customer::run_clv(args),
        Commands::ProfitRisk(args) => commands::profitability::run_profit_risk(args),
        Commands::SensitivityGrid(args) => commands::scenarios::run_sensitivity_grid(args),
        Commands::WhatIf(args) => commands::scenarios::run_what_if(args),
        Commands::Sweep(args) => commands::scenarios::run_sweep(args),
        Commands::Decompose(args) => commands::time_series::run_decompose(args),
        Commands::Version => {
            println!("bzm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
