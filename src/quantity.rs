//! Allocation quantities
//!
//! A tier asks for a share of a category's workers either as a fraction
//! (`Percent`) or as a headcount bound to the category's population
//! (`Number`). Headcounts carry the total they were measured against, so a
//! population change must go through [`Quantity::rebind`].

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Quantity {
    /// Fraction of the category's workers, in [0, 1]
    Percent { value: f64 },
    /// Absolute headcount out of `total` capable workers
    Number { count: u32, total: u32 },
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::Percent { value: 0.0 }
    }
}

impl Quantity {
    /// Fractional quantity, clamped to [0, 1]
    pub fn percent(value: f64) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Quantity::Percent { value }
    }

    pub fn number(count: u32, total: u32) -> Self {
        Quantity::Number { count, total }
    }

    /// Share of the population this quantity asks for, in [0, 1]
    pub fn as_fraction(&self) -> f64 {
        match *self {
            Quantity::Percent { value } => value,
            Quantity::Number { total: 0, .. } => 0.0,
            Quantity::Number { count, total } => (count as f64 / total as f64).min(1.0),
        }
    }

    /// Bind a headcount to a new population total, keeping its count
    pub fn rebind(self, total: u32) -> Self {
        match self {
            Quantity::Number { count, .. } => Quantity::Number { count, total },
            percent => percent,
        }
    }

    pub fn to_percent(self) -> Self {
        Quantity::percent(self.as_fraction())
    }

    /// Convert to a headcount of `total`, rounding the fraction
    pub fn to_number(self, total: u32) -> Self {
        match self {
            Quantity::Number { count, .. } => Quantity::Number { count, total },
            Quantity::Percent { value } => Quantity::Number {
                count: (value * total as f64).round() as u32,
                total,
            },
        }
    }

    /// Number of workers this quantity targets out of `population`
    pub fn headcount(&self, population: u32) -> u32 {
        (self.as_fraction() * population as f64).round() as u32
    }

    pub fn is_zero(&self) -> bool {
        self.as_fraction() <= 0.0
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Quantity::Number { .. })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Percent { value } => write!(f, "{:.0}%", value * 100.0),
            Quantity::Number { count, total } => write!(f, "{}/{}", count, total),
        }
    }
}
