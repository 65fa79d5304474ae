//! Additive trend + seasonal + residual decomposition of a monthly series.
//!
//! The trend is a centered simple moving average over an odd window; edges
//! the window cannot reach take the nearest defined trend value. Seasonal
//! effects are averaged per calendar month and re-centered to zero mean.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::aggregation::{extract_month, mean, month_of_year, population_variance, sum_by_key};
use crate::config::DecompositionConfig;
use crate::records::{CollectionRecord, OrderRecord, SalesRecord};
use crate::types::{with_metadata, ComputationOutput, Pct};
use crate::BizMetricsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One month of a series. `month` is `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub value: Decimal,
}

impl MonthlyPoint {
    pub fn new(month: impl Into<String>, value: Decimal) -> Self {
        Self {
            month: month.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionPoint {
    pub month: String,
    pub value: Decimal,
    pub trend: Decimal,
    pub seasonal: Decimal,
    pub residual: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub points: Vec<DecompositionPoint>,
    /// January..December seasonal effect, mean zero
    pub seasonal_index: [Decimal; 12],
    pub trend_direction: TrendDirection,
    /// 1 - Var(residual) / Var(detrended), in [0, 1]
    pub seasonal_strength: Decimal,
    pub period: usize,
    /// False when the series was too short and a neutral result was returned
    pub sufficient_data: bool,
}

// ---------------------------------------------------------------------------
// Series builders
// ---------------------------------------------------------------------------

fn monthly_series<T>(
    rows: &[T],
    date: impl Fn(&T) -> &str,
    amount: impl Fn(&T) -> Decimal,
) -> Vec<MonthlyPoint> {
    let acc = sum_by_key(rows, |r| extract_month(date(r)), amount);
    let mut points: Vec<MonthlyPoint> = acc
        .into_entries()
        .into_iter()
        .map(|(month, value)| MonthlyPoint { month, value })
        .collect();
    points.sort_by(|a, b| a.month.cmp(&b.month));
    points
}

/// Monthly sales totals, oldest first. Undated rows are left out.
pub fn monthly_series_from_sales(sales: &[SalesRecord]) -> Vec<MonthlyPoint> {
    monthly_series(sales, |s| s.sale_date.as_str(), |s| s.amount)
}

/// Monthly order totals, oldest first.
pub fn monthly_series_from_orders(orders: &[OrderRecord]) -> Vec<MonthlyPoint> {
    monthly_series(orders, |o| o.order_date.as_str(), |o| o.amount)
}

/// Monthly net collections (gross less prepayment), oldest first.
pub fn monthly_series_from_collections(collections: &[CollectionRecord]) -> Vec<MonthlyPoint> {
    monthly_series(
        collections,
        |c| c.collection_date.as_str(),
        |c| c.net_amount(),
    )
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// Centered moving average with edge fill.
fn centered_trend(values: &[Decimal], window: usize) -> Vec<Decimal> {
    let n = values.len();
    let half = window / 2;
    let mut trend: Vec<Option<Decimal>> = vec![None; n];
    if n >= window {
        for (i, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
            *slot = Some(mean(&values[i - half..=i + half]));
        }
    }

    let first = trend.iter().flatten().next().copied();
    let last = trend.iter().flatten().last().copied();
    let mut seen_defined = false;
    trend
        .into_iter()
        .zip(values)
        .map(|(t, v)| match t {
            Some(t) => {
                seen_defined = true;
                t
            }
            None if !seen_defined => first.unwrap_or(*v),
            None => last.unwrap_or(*v),
        })
        .collect()
}

/// Mean detrended value per calendar month, re-centered. Months with no
/// observations contribute 0 before re-centering.
fn seasonal_index(months: &[u32], detrended: &[Decimal]) -> [Decimal; 12] {
    let mut buckets: Vec<Vec<Decimal>> = vec![Vec::new(); 12];
    for (m, d) in months.iter().zip(detrended) {
        buckets[(*m as usize) - 1].push(*d);
    }
    let mut index = [Decimal::ZERO; 12];
    for (slot, bucket) in index.iter_mut().zip(&buckets) {
        *slot = mean(bucket);
    }
    let center = mean(&index);
    for slot in index.iter_mut() {
        *slot -= center;
    }
    index
}

fn trend_direction(trend: &[Decimal], threshold: Pct) -> TrendDirection {
    let mid = trend.len() / 2;
    if mid == 0 {
        return TrendDirection::Flat;
    }
    let first = mean(&trend[..mid]);
    let second = mean(&trend[mid..]);
    let change = if first.is_zero() {
        if second > Decimal::ZERO {
            threshold + Decimal::ONE
        } else if second < Decimal::ZERO {
            -threshold - Decimal::ONE
        } else {
            Decimal::ZERO
        }
    } else {
        (second - first) / first.abs() * Decimal::ONE_HUNDRED
    };

    if change > threshold {
        TrendDirection::Up
    } else if change < -threshold {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

fn neutral(points: &[(String, u32, Decimal)], period: usize) -> DecompositionResult {
    DecompositionResult {
        points: points
            .iter()
            .map(|(month, _, value)| DecompositionPoint {
                month: month.clone(),
                value: *value,
                trend: *value,
                seasonal: Decimal::ZERO,
                residual: Decimal::ZERO,
            })
            .collect(),
        seasonal_index: [Decimal::ZERO; 12],
        trend_direction: TrendDirection::Flat,
        seasonal_strength: Decimal::ZERO,
        period,
        sufficient_data: false,
    }
}

// ---------------------------------------------------------------------------
// Function: decompose_time_series
// ---------------------------------------------------------------------------

/// Decompose a monthly series into trend, seasonal and residual parts.
///
/// Needs at least `period + 1` points; shorter series get a neutral result
/// (trend = value, everything else zero) and a warning.
pub fn decompose_time_series(
    series: &[MonthlyPoint],
    config: &DecompositionConfig,
) -> BizMetricsResult<ComputationOutput<DecompositionResult>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings: Vec<String> = Vec::new();

    let mut points: Vec<(String, u32, Decimal)> = series
        .iter()
        .filter_map(|p| {
            let month = p.month.trim();
            month_of_year(month).map(|m| (month.to_string(), m, p.value))
        })
        .collect();
    if points.len() < series.len() {
        warnings.push(format!(
            "{} points have an invalid month and were dropped",
            series.len() - points.len()
        ));
    }
    points.sort_by(|a, b| a.0.cmp(&b.0));

    let period = config.period;
    let window = if period % 2 == 0 { period + 1 } else { period };
    let result = if points.len() < period + 1 {
        warnings.push(format!(
            "Decomposition needs at least {} points, got {}; returning a neutral result",
            period + 1,
            points.len()
        ));
        neutral(&points, period)
    } else {
        let values: Vec<Decimal> = points.iter().map(|p| p.2).collect();
        let months: Vec<u32> = points.iter().map(|p| p.1).collect();

        let trend = centered_trend(&values, window);
        let detrended: Vec<Decimal> = values.iter().zip(&trend).map(|(v, t)| *v - *t).collect();
        let index = seasonal_index(&months, &detrended);

        let decomposed: Vec<DecompositionPoint> = points
            .iter()
            .zip(trend.iter().zip(&detrended))
            .map(|((month, m, value), (t, d))| {
                let seasonal = index[(*m as usize) - 1];
                DecompositionPoint {
                    month: month.clone(),
                    value: *value,
                    trend: *t,
                    seasonal,
                    residual: *d - seasonal,
                }
            })
            .collect();

        let residuals: Vec<Decimal> = decomposed.iter().map(|p| p.residual).collect();
        let var_detrended = population_variance(&detrended);
        let seasonal_strength = if var_detrended.is_zero() {
            Decimal::ZERO
        } else {
            (Decimal::ONE - population_variance(&residuals) / var_detrended)
                .clamp(Decimal::ZERO, Decimal::ONE)
        };

        DecompositionResult {
            points: decomposed,
            seasonal_index: index,
            trend_direction: trend_direction(&trend, config.direction_threshold),
            seasonal_strength,
            period,
            sufficient_data: true,
        }
    };

    log::debug!(
        "decomposition: {} points, period {}, direction {:?}",
        result.points.len(),
        period,
        result.trend_direction
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Additive Moving-Average Time-Series Decomposition",
        &serde_json::json!({
            "period": period,
            "window": window,
            "direction_threshold_pct": config.direction_threshold.to_string(),
            "variance": "population",
        }),
        warnings,
        elapsed,
        series.len(),
        result,
    ))
}
