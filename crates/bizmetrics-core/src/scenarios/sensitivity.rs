use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::BizMetricsError;
use crate::types::*;
use crate::BizMetricsResult;

/// Base-case P&L the grid is built around. COGS and SG&A are implied:
/// COGS = sales - gross profit, SG&A = gross profit - operating profit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaseCase {
    pub sales: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub sga: Money,
    pub operating_profit: Money,
}

impl BaseCase {
    pub fn from_profits(sales: Money, gross_profit: Money, operating_profit: Money) -> Self {
        Self {
            sales,
            cogs: sales - gross_profit,
            gross_profit,
            sga: gross_profit - operating_profit,
            operating_profit,
        }
    }
}

/// One (price change, volume change) combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensitivityCell {
    /// Price change in percent (5 = +5%)
    pub price_change: Pct,
    /// Volume change in percent
    pub volume_change: Pct,
    pub sales: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub operating_profit: Money,
    pub sales_change_pct: Pct,
    pub gross_profit_change_pct: Pct,
    pub operating_profit_change_pct: Pct,
}

/// Output of the price x volume sensitivity grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub base: BaseCase,
    pub price_steps: Vec<Pct>,
    pub volume_steps: Vec<Pct>,
    /// Row-major: price step outer, volume step inner
    pub cells: Vec<SensitivityCell>,
    /// operating_profit_matrix[i][j] = OP at price_steps[i], volume_steps[j]
    pub operating_profit_matrix: Vec<Vec<Money>>,
    /// Position of the step pair closest to (0, 0) in the matrix (row, col)
    pub base_case_position: (usize, usize),
}

/// (result - base) / |base| * 100, zero when the base is zero.
pub fn pct_change(result: Decimal, base: Decimal) -> Pct {
    if base.is_zero() {
        Decimal::ZERO
    } else {
        (result - base) / base.abs() * dec!(100)
    }
}

/// Find the closest index to a target value.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Evaluate one grid cell. Price scales sales only; volume scales sales and
/// COGS; SG&A is fixed.
pub fn evaluate_cell(base: &BaseCase, price_change: Pct, volume_change: Pct) -> SensitivityCell {
    let price_factor = Decimal::ONE + price_change / dec!(100);
    let volume_factor = Decimal::ONE + volume_change / dec!(100);

    let sales = base.sales * price_factor * volume_factor;
    let cogs = base.cogs * volume_factor;
    let gross_profit = sales - cogs;
    let operating_profit = gross_profit - base.sga;

    SensitivityCell {
        price_change,
        volume_change,
        sales,
        cogs,
        gross_profit,
        operating_profit,
        sales_change_pct: pct_change(sales, base.sales),
        gross_profit_change_pct: pct_change(gross_profit, base.gross_profit),
        operating_profit_change_pct: pct_change(operating_profit, base.operating_profit),
    }
}

/// Build a 2-way price x volume sensitivity grid around a base P&L.
pub fn compute_sensitivity_grid(
    base_sales: Money,
    base_gross_profit: Money,
    base_operating_profit: Money,
    price_steps: &[Pct],
    volume_steps: &[Pct],
) -> BizMetricsResult<ComputationOutput<SensitivityResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if price_steps.is_empty() {
        return Err(BizMetricsError::invalid(
            "price_steps",
            "At least one price step is required",
        ));
    }
    if volume_steps.is_empty() {
        return Err(BizMetricsError::invalid(
            "volume_steps",
            "At least one volume step is required",
        ));
    }
    if base_sales.is_zero() {
        warnings.push("Base sales is zero; percent changes are reported as 0".to_string());
    }
    if price_steps
        .iter()
        .chain(volume_steps.iter())
        .any(|s| *s <= dec!(-100))
    {
        warnings.push("Steps at or below -100% produce non-positive sales or volume".to_string());
    }

    let base = BaseCase::from_profits(base_sales, base_gross_profit, base_operating_profit);

    let mut cells = Vec::with_capacity(price_steps.len() * volume_steps.len());
    let mut matrix = Vec::with_capacity(price_steps.len());
    for p in price_steps {
        let mut row = Vec::with_capacity(volume_steps.len());
        for v in volume_steps {
            let cell = evaluate_cell(&base, *p, *v);
            row.push(cell.operating_profit);
            cells.push(cell);
        }
        matrix.push(row);
    }

    let base_row = closest_index(price_steps, Decimal::ZERO);
    let base_col = closest_index(volume_steps, Decimal::ZERO);

    let output = SensitivityResult {
        base,
        price_steps: price_steps.to_vec(),
        volume_steps: volume_steps.to_vec(),
        cells,
        operating_profit_matrix: matrix,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Price x Volume Sensitivity Grid",
        &serde_json::json!({
            "price_effect": "sales * (1 + p)",
            "volume_effect": "sales and COGS * (1 + v)",
            "sga": "fixed",
            "grid": format!("{} x {}", price_steps.len(), volume_steps.len()),
        }),
        warnings,
        elapsed,
        1,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_steps;

    #[test]
    fn test_default_grid_has_81_cells() {
        let steps = default_steps();
        let out = compute_sensitivity_grid(dec!(1000), dec!(300), dec!(100), &steps, &steps)
            .unwrap();
        assert_eq!(out.result.cells.len(), 81);
        assert_eq!(out.result.operating_profit_matrix.len(), 9);
        assert_eq!(out.result.base_case_position, (4, 4));
    }

    #[test]
    fn test_zero_cell_reproduces_base() {
        let steps = default_steps();
        let out = compute_sensitivity_grid(dec!(1000), dec!(300), dec!(100), &steps, &steps)
            .unwrap();
        let (r, c) = out.result.base_case_position;
        let cell = &out.result.cells[r * steps.len() + c];
        assert_eq!(cell.price_change, dec!(0));
        assert_eq!(cell.volume_change, dec!(0));
        assert_eq!(cell.sales, dec!(1000));
        assert_eq!(cell.gross_profit, dec!(300));
        assert_eq!(cell.operating_profit, dec!(100));
        assert_eq!(cell.sales_change_pct, dec!(0));
        assert_eq!(cell.gross_profit_change_pct, dec!(0));
        assert_eq!(cell.operating_profit_change_pct, dec!(0));
    }

    #[test]
    fn test_price_and_volume_effects() {
        let base = BaseCase::from_profits(dec!(1000), dec!(300), dec!(100));
        assert_eq!(base.cogs, dec!(700));
        assert_eq!(base.sga, dec!(200));

        // +10% price: sales 1100, cogs unchanged
        let cell = evaluate_cell(&base, dec!(10), dec!(0));
        assert_eq!(cell.sales, dec!(1100));
        assert_eq!(cell.gross_profit, dec!(400));
        assert_eq!(cell.operating_profit, dec!(200));
        assert_eq!(cell.operating_profit_change_pct, dec!(100));

        // +10% volume: sales 1100, cogs 770
        let cell = evaluate_cell(&base, dec!(0), dec!(10));
        assert_eq!(cell.cogs, dec!(770));
        assert_eq!(cell.gross_profit, dec!(330));
        assert_eq!(cell.operating_profit, dec!(130));
    }

    #[test]
    fn test_negative_base_uses_absolute_denominator() {
        // base OP -100 improving to -50 is +50%
        assert_eq!(pct_change(dec!(-50), dec!(-100)), dec!(50));
        assert_eq!(pct_change(dec!(10), dec!(0)), dec!(0));
    }

    #[test]
    fn test_empty_steps_rejected() {
        assert!(compute_sensitivity_grid(dec!(1), dec!(1), dec!(1), &[], &[dec!(0)]).is_err());
        assert!(compute_sensitivity_grid(dec!(1), dec!(1), dec!(1), &[dec!(0)], &[]).is_err());
    }
}
