// SPDX-License-Identifier: PMPL-1.0-or-later
//! Aggregate calculations over a group's extracted values.
//!
//! SUM and AVG accumulate in `rust_decimal` so that e.g. `0.1 + 0.2` is
//! exactly `0.3`; both results are rounded to two decimal places, half away
//! from zero.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::record::{FieldValue, ValueKey};

const DECIMAL_PLACES: u32 = 2;

/// Largest value; `f64::NEG_INFINITY` for an empty slice.
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Smallest value; `f64::INFINITY` for an empty slice.
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Decimal-exact sum rounded to two places.
///
/// Totals outside the `Decimal` range (about ±7.9e28) are accumulated in
/// `f64` instead.
pub fn sum(values: &[f64]) -> f64 {
    match decimal_total(values) {
        Some(total) => round_decimal(total),
        None => round_float(values.iter().sum()),
    }
}

/// Decimal-exact total divided by the value count in floating point, then
/// rounded to two places. `0.0` for an empty slice.
pub fn avg(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total = match decimal_total(values) {
        Some(total) => to_float(total),
        None => values.iter().sum(),
    };
    round_float(total / values.len() as f64)
}

/// Number of distinct values. `[5, 5, 7]` counts as 2.
pub fn count_distinct(values: &[FieldValue<'_>]) -> usize {
    values
        .iter()
        .map(FieldValue::key)
        .collect::<HashSet<ValueKey<'_>>>()
        .len()
}

/// `None` if any value or partial total leaves the `Decimal` range.
fn decimal_total(values: &[f64]) -> Option<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(to_decimal(*v)?))
}

/// Convert through the shortest round-trip representation so `0.1` becomes
/// decimal `0.1` rather than its binary expansion.
fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(value))
}

fn round_decimal(d: Decimal) -> f64 {
    to_float(d.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
}

/// Round an `f64` to two places. Values too large for `Decimal` have no
/// fractional digits and pass through.
fn round_float(value: f64) -> f64 {
    match Decimal::from_f64_retain(value) {
        Some(d) => round_decimal(d),
        None => value,
    }
}

/// Nearest `f64` to `d`, so a rounded `82.83` compares equal to the literal.
fn to_float(d: Decimal) -> f64 {
    d.to_string().parse().unwrap_or(f64::NAN)
}
