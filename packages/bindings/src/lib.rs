use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use bizmetrics_core::scenarios::what_if::{SweepParameter, WhatIfParams};
use bizmetrics_core::{AnalyticsConfig, Dataset};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SeriesSource {
    #[default]
    Sales,
    Orders,
    Collections,
}

/// Per-call options. Every field is optional; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Options {
    config: AnalyticsConfig,
    /// Organization filter applied to every collection before the analysis
    orgs: Vec<String>,
    canonical_orgs: Vec<String>,
    years: Option<Decimal>,
    what_if: WhatIfParams,
    parameter: Option<SweepParameter>,
    values: Vec<Decimal>,
    source: SeriesSource,
}

#[derive(Debug, Deserialize)]
struct GridInput {
    base_sales: Decimal,
    base_gross_profit: Decimal,
    base_operating_profit: Decimal,
    #[serde(default)]
    price_steps: Option<Vec<Decimal>>,
    #[serde(default)]
    volume_steps: Option<Vec<Decimal>>,
    #[serde(default)]
    config: AnalyticsConfig,
}

/// Parse the dataset and options, validate the config and apply the org filter.
fn prepare(dataset_json: &str, options_json: Option<String>) -> NapiResult<(Dataset, Options)> {
    let dataset = Dataset::from_json_str(dataset_json).map_err(to_napi_error)?;
    let options: Options = match options_json {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(&json).map_err(to_napi_error)?
        }
        _ => Options::default(),
    };
    options.config.validate().map_err(to_napi_error)?;
    let dataset = if options.orgs.is_empty() {
        dataset
    } else {
        dataset.filter_orgs(&options.orgs)
    };
    Ok((dataset, options))
}

fn to_json<T: serde::Serialize>(output: &T) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Order-to-cash
// ---------------------------------------------------------------------------

#[napi]
pub fn o2c_pipeline(dataset_json: String, options_json: Option<String>) -> NapiResult<String> {
    let (ds, _) = prepare(&dataset_json, options_json)?;
    let output =
        bizmetrics_core::o2c::pipeline::compute_o2c_pipeline(&ds.orders, &ds.sales, &ds.collections)
            .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn monthly_conversion(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, _) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::o2c::pipeline::compute_monthly_conversion(
        &ds.orders,
        &ds.sales,
        &ds.collections,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn prepayment_analysis(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::o2c::prepayment::analyze_prepayments(
        &ds.collections,
        &ds.sales,
        &opts.canonical_orgs,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Receivables
// ---------------------------------------------------------------------------

#[napi]
pub fn customer_aging_profile(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::receivables::aging::compute_customer_aging_profile(
        &ds.aging,
        &opts.config.aging,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn currency_exposure(dataset_json: String, options_json: Option<String>) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::receivables::aging::compute_currency_exposure(
        &ds.aging,
        &opts.config.aging,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn org_invoice_book_gap(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::receivables::aging::compute_org_invoice_book_gap(
        &ds.aging,
        &opts.config.aging,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn weighted_aging_days(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::receivables::aging::compute_weighted_aging_days(
        &ds.aging,
        &opts.config.aging,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn aging_distribution(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::receivables::aging::compute_aging_distribution(
        &ds.aging,
        &opts.config.aging,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn org_risk_scores(dataset_json: String, options_json: Option<String>) -> NapiResult<String> {
    let (ds, _) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::receivables::aging::compute_org_risk_scores(&ds.aging)
        .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Variance, CLV, profitability x risk
// ---------------------------------------------------------------------------

#[napi]
pub fn variance_analysis(dataset_json: String, options_json: Option<String>) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::fpa::variance::compute_variance_analysis(
        &ds.profitability,
        &opts.config.variance,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn customer_lifetime_value(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::customer::clv::compute_clv(
        &ds.sales,
        &ds.org_profits,
        opts.years,
        &opts.config.clv,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn profit_risk_matrix(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::profitability::risk_matrix::compute_profit_risk_matrix(
        &ds.org_profits,
        &ds.aging,
        &ds.sales,
        &opts.config.profit_risk,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Takes the base P&L and optional steps instead of a dataset.
#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: GridInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.config.validate().map_err(to_napi_error)?;
    let price_steps = input
        .price_steps
        .unwrap_or_else(|| input.config.sensitivity.price_steps.clone());
    let volume_steps = input
        .volume_steps
        .unwrap_or_else(|| input.config.sensitivity.volume_steps.clone());
    let output = bizmetrics_core::scenarios::sensitivity::compute_sensitivity_grid(
        input.base_sales,
        input.base_gross_profit,
        input.base_operating_profit,
        &price_steps,
        &volume_steps,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn what_if_scenario(dataset_json: String, options_json: Option<String>) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let output = bizmetrics_core::scenarios::what_if::compute_what_if_scenario(
        &ds.org_profits,
        &opts.what_if,
        &opts.config.sensitivity,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn sensitivity_sweep(dataset_json: String, options_json: Option<String>) -> NapiResult<String> {
    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let parameter = opts
        .parameter
        .ok_or_else(|| to_napi_error("options.parameter (sales, cost or sga) is required"))?;
    let output = bizmetrics_core::scenarios::what_if::compute_sensitivity_sweep(
        &ds.org_profits,
        parameter,
        &opts.values,
        &opts.config.sensitivity,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

#[napi]
pub fn decompose_time_series(
    dataset_json: String,
    options_json: Option<String>,
) -> NapiResult<String> {
    use bizmetrics_core::time_series::decomposition;

    let (ds, opts) = prepare(&dataset_json, options_json)?;
    let series = match opts.source {
        SeriesSource::Sales => decomposition::monthly_series_from_sales(&ds.sales),
        SeriesSource::Orders => decomposition::monthly_series_from_orders(&ds.orders),
        SeriesSource::Collections => {
            decomposition::monthly_series_from_collections(&ds.collections)
        }
    };
    let output = decomposition::decompose_time_series(&series, &opts.config.decomposition)
        .map_err(to_napi_error)?;
    to_json(&output)
}
