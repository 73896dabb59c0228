//! Fixed-point price type.
//!
//! Prices are decimal values on a tick grid. All comparisons and cash
//! arithmetic stay in `rust_decimal::Decimal`; floating point never touches
//! a price or a monetary amount.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// A tick-aligned instrument price.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Price(value)
    }

    /// Underlying decimal value, for cash arithmetic and ratios.
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Convert a configuration float (e.g. `tick_size = 0.25`) into a price.
    ///
    /// Returns `None` for NaN/infinite inputs.
    pub fn from_config(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Price)
    }

    /// Price shifted by a signed number of ticks.
    pub fn offset_ticks(self, ticks: i64, tick_size: Price) -> Price {
        Price(self.0 + Decimal::from(ticks) * tick_size.0)
    }

    /// Signed distance to `other` in ticks.
    pub fn diff_ticks(self, other: Price, tick_size: Price) -> Decimal {
        (self.0 - other.0) / tick_size.0
    }

    /// Whether the price sits on the tick grid.
    pub fn is_aligned(self, tick_size: Price) -> bool {
        (self.0 % tick_size.0).is_zero()
    }

    /// Cash value of `qty` contracts at this price.
    pub fn notional(self, qty: i64) -> Decimal {
        self.0 * Decimal::from(qty)
    }
}

impl Add<Decimal> for Price {
    type Output = Price;

    fn add(self, rhs: Decimal) -> Price {
        Price(self.0 + rhs)
    }
}

impl Sub<Decimal> for Price {
    type Output = Price;

    fn sub(self, rhs: Decimal) -> Price {
        Price(self.0 - rhs)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
#[error("invalid price literal: {0}")]
pub struct ParsePriceError(String);

impl FromStr for Price {
    type Err = ParsePriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .map(Price)
            .map_err(|_| ParsePriceError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tick() -> Price {
        Price::new(dec!(0.25))
    }

    #[test]
    fn parse_and_display_round_trip() {
        let p: Price = "5950.25".parse().unwrap();
        assert_eq!(p.value(), dec!(5950.25));
        assert_eq!(p.to_string(), "5950.25");
    }

    #[test]
    fn offset_ticks_moves_on_grid() {
        let p = Price::new(dec!(5950.00));
        assert_eq!(p.offset_ticks(3, tick()), Price::new(dec!(5950.75)));
        assert_eq!(p.offset_ticks(-2, tick()), Price::new(dec!(5949.50)));
    }

    #[test]
    fn diff_ticks_is_signed() {
        let a = Price::new(dec!(5950.75));
        let b = Price::new(dec!(5950.00));
        assert_eq!(a.diff_ticks(b, tick()), dec!(3));
        assert_eq!(b.diff_ticks(a, tick()), dec!(-3));
    }

    #[test]
    fn alignment_check() {
        assert!(Price::new(dec!(5950.25)).is_aligned(tick()));
        assert!(!Price::new(dec!(5950.30)).is_aligned(tick()));
    }

    #[test]
    fn from_config_preserves_common_tick_sizes() {
        assert_eq!(Price::from_config(0.25).unwrap(), Price::new(dec!(0.25)));
        assert_eq!(Price::from_config(12.50).unwrap(), Price::new(dec!(12.5)));
        assert!(Price::from_config(f64::NAN).is_none());
    }

    #[test]
    fn notional_multiplies_by_quantity() {
        let p = Price::new(dec!(5950.50));
        assert_eq!(p.notional(2), dec!(11901.00));
        assert_eq!(p.notional(-1), dec!(-5950.50));
    }
}
