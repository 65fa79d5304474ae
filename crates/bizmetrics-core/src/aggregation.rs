//! Grouping and month-bucketing primitives shared by every analytics area.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::types::{Money, Pct};

// ---------------------------------------------------------------------------
// Keyed accumulator
// ---------------------------------------------------------------------------

/// Insertion-ordered map from a string key to a mutable accumulator.
///
/// Built fresh inside each computation and dropped with it. Iteration order
/// is first-insertion order, which is what fuzzy org matching relies on.
#[derive(Debug, Clone)]
pub struct KeyedAccumulator<A> {
    index: HashMap<String, usize>,
    entries: Vec<(String, A)>,
}

impl<A> Default for KeyedAccumulator<A> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<A> KeyedAccumulator<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator for `key`, created with `init` on first sight.
    pub fn entry_with(&mut self, key: &str, init: impl FnOnce() -> A) -> &mut A {
        let idx = match self.index.get(key) {
            Some(&i) => i,
            None => {
                self.entries.push((key.to_string(), init()));
                let i = self.entries.len() - 1;
                self.index.insert(key.to_string(), i);
                i
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get(&self, key: &str) -> Option<&A> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &A)> {
        self.entries.iter().map(|(k, a)| (k.as_str(), a))
    }

    /// Entries in insertion order, usable as a fuzzy-match mapping.
    pub fn as_slice(&self) -> &[(String, A)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(String, A)> {
        self.entries
    }
}

impl<A: Default> KeyedAccumulator<A> {
    pub fn entry(&mut self, key: &str) -> &mut A {
        self.entry_with(key, A::default)
    }
}

/// Sum `amount` per key. Rows whose key is `None` are skipped.
pub fn sum_by_key<T>(
    rows: &[T],
    key: impl Fn(&T) -> Option<String>,
    amount: impl Fn(&T) -> Money,
) -> KeyedAccumulator<Money> {
    let mut acc = KeyedAccumulator::new();
    for row in rows {
        if let Some(k) = key(row) {
            *acc.entry(&k) += amount(row);
        }
    }
    acc
}

// ---------------------------------------------------------------------------
// Month bucketing
// ---------------------------------------------------------------------------

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Extract a `YYYY-MM` bucket from a raw date string.
///
/// Accepts full dates in the common ingestion formats, datetimes with a date
/// prefix, and bare year-month strings. Returns `None` for anything else.
pub fn extract_month(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    parse_date(s).map(|d| format!("{:04}-{:02}", d.year(), d.month()))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // Datetime: keep the date part
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(d);
        }
    }

    // Compact YYYYMMDD
    if date_part.len() == 8 && date_part.bytes().all(|b| b.is_ascii_digit()) {
        let year = date_part[0..4].parse::<i32>().ok()?;
        let month = date_part[4..6].parse::<u32>().ok()?;
        let day = date_part[6..8].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    // Bare year-month
    for sep in ['-', '/', '.'] {
        let parts: Vec<&str> = date_part.split(sep).collect();
        if parts.len() == 2 && parts[0].len() == 4 && !parts[1].is_empty() && parts[1].len() <= 2
        {
            let year = parts[0].parse::<i32>().ok()?;
            let month = parts[1].parse::<u32>().ok()?;
            return NaiveDate::from_ymd_opt(year, month, 1);
        }
    }
    None
}

/// Months since year 0 for a `YYYY-MM` string, for span arithmetic.
pub fn month_index(month: &str) -> Option<i64> {
    let (y, m) = split_month(month)?;
    Some(i64::from(y) * 12 + i64::from(m) - 1)
}

/// Calendar month (1–12) of a `YYYY-MM` string.
pub fn month_of_year(month: &str) -> Option<u32> {
    split_month(month).map(|(_, m)| m)
}

fn split_month(month: &str) -> Option<(i32, u32)> {
    let (y, m) = month.trim().split_once('-')?;
    let year = y.parse::<i32>().ok()?;
    let mon = m.parse::<u32>().ok()?;
    if (1..=12).contains(&mon) {
        Some((year, mon))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Numeric guards
// ---------------------------------------------------------------------------

/// numerator / denominator, or zero when the denominator is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// numerator / denominator * 100, or zero when the denominator is zero.
pub fn safe_pct(numerator: Decimal, denominator: Decimal) -> Pct {
    safe_div(numerator, denominator) * dec!(100)
}

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len() as u64)
}

/// Population variance (divide by N); zero for an empty slice.
pub fn population_variance(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let m = mean(values);
    let ss: Decimal = values.iter().map(|v| (*v - m) * (*v - m)).sum();
    ss / Decimal::from(values.len() as u64)
}
