//! # Money Module
//!
//! Integer-cent money plus the scaled-integer helpers used by pricing
//! (`BasisPoints`, `Multiplier`, `Quantity`).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every price, delta, discount and total is an i64 cent count.         │
//! │    Percentages are basis points, multipliers are thousandths,           │
//! │    quantities are hundredths. Rounding is explicit and half-up,         │
//! │    applied exactly where the pricing rules say, never twice.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in integer cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: intermediate discount math can dip negative before
///   clamping
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Half-up helpers**: every scaled multiplication rounds half away from
///   zero, in one place
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns the smaller of two values.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    /// Clamps negative values to zero.
    #[inline]
    pub const fn clamp_at_zero(self) -> Money {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Multiplies by a percentage expressed in basis points, rounding
    /// half away from zero.
    ///
    /// ## Implementation
    /// Integer math widened to i128: `(cents * bps + 5000) / 10000`.
    /// The +5000 provides the half-up rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use supper_core::money::{BasisPoints, Money};
    ///
    /// let subtotal = Money::from_cents(210_000);
    /// let pct = BasisPoints::from_bps(500); // 5%
    /// assert_eq!(subtotal.percent_of(pct).cents(), 10_500);
    /// ```
    pub fn percent_of(&self, rate: BasisPoints) -> Money {
        Money(div_half_up(self.0 as i128 * rate.bps() as i128, 10_000))
    }

    /// Scales by a multiplier (thousandths), rounding half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use supper_core::money::{Money, Multiplier};
    ///
    /// let base = Money::from_cents(150_000);
    /// let m = Multiplier::from_millis(1_200); // x1.2
    /// assert_eq!(base.scale(m).cents(), 180_000);
    /// ```
    pub fn scale(&self, m: Multiplier) -> Money {
        Money(div_half_up(self.0 as i128 * m.millis() as i128, 1_000))
    }

    /// Multiplies by a decimal quantity (hundredths), rounding half away
    /// from zero. This is the line-subtotal operation: it happens once per
    /// line, after the unit price is final.
    pub fn times_quantity(&self, qty: Quantity) -> Money {
        Money(div_half_up(self.0 as i128 * qty.hundredths() as i128, 100))
    }

    /// Multiplies by an exact rational factor, rounding half away from zero
    /// once. The pricing engine uses this to apply a *product* of
    /// multipliers (numerator = product of thousandths, denominator =
    /// 1000^k) with a single rounding instead of one per factor.
    pub fn mul_ratio(&self, numerator: i128, denominator: i128) -> Money {
        Money(div_half_up(self.0 as i128 * numerator, denominator))
    }
}

/// Division with half-away-from-zero rounding.
///
/// `denominator` must be positive; `numerator` may be negative (discount
/// intermediate values).
fn div_half_up(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let adjusted = if numerator >= 0 {
        numerator + half
    } else {
        numerator - half
    };
    (adjusted / denominator) as i64
}

/// Display implementation shows money in a human-readable format.
/// For debugging only; wire formats use raw cents.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

// =============================================================================
// Basis Points
// =============================================================================

/// A percentage in basis points (1 bps = 0.01%).
///
/// 500 bps = 5% (a typical membership), 1000 bps = 10%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasisPoints(i64);

impl BasisPoints {
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        BasisPoints(bps)
    }

    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }
}

// =============================================================================
// Multiplier
// =============================================================================

/// A price multiplier in thousandths (1200 = x1.2, 1000 = identity).
///
/// Catalog multipliers carry up to three decimal places, so thousandths are
/// exact. Products of several multipliers are accumulated in i128 by the
/// pricing engine so that rounding still happens only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplier(i64);

impl Multiplier {
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Multiplier(millis)
    }

    /// Identity multiplier (x1.0).
    #[inline]
    pub const fn one() -> Self {
        Multiplier(1_000)
    }

    #[inline]
    pub const fn millis(&self) -> i64 {
        self.0
    }

    /// The fractional part above identity, in thousandths. A x1.1 option
    /// yields 100, which drives the sequential delta rule
    /// `delta = round_half_up(running * (m - 1))`.
    #[inline]
    pub const fn excess_millis(&self) -> i64 {
        self.0 - 1_000
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / 1_000, (self.0 % 1_000).abs())
    }
}

// =============================================================================
// Quantity
// =============================================================================

/// A decimal quantity in hundredths (150 = 1.50).
///
/// Party sizes and default-item counts come in with two decimal places;
/// hundredths keep them exact without floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Quantity(hundredths)
    }

    /// Whole-unit quantity (2 -> 2.00).
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 100)
    }

    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

/// Parses decimal strings like "1", "1.5", "2.00".
impl FromStr for Quantity {
    type Err = QuantityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(QuantityParseError);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(QuantityParseError);
        }

        let whole: i64 = whole.parse().map_err(|_| QuantityParseError)?;
        if whole < 0 {
            return Err(QuantityParseError);
        }

        let frac_value = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| QuantityParseError)? * 10,
            _ => frac.parse::<i64>().map_err(|_| QuantityParseError)?,
        };

        Ok(Quantity(whole * 100 + frac_value))
    }
}

/// Error for unparseable quantity strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityParseError;

impl fmt::Display for QuantityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quantity must be a non-negative decimal with up to 2 places")
    }
}

impl std::error::Error for QuantityParseError {}

/// Quantities serialize as decimal strings ("1.50"), matching the wire
/// format consumed by ordering clients.
impl Serialize for Quantity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl serde::de::Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a decimal quantity string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Quantity, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Quantity, E> {
                Ok(Quantity::from_units(v as i64))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Quantity, E> {
                if v < 0 {
                    return Err(E::custom(QuantityParseError));
                }
                Ok(Quantity::from_units(v))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Quantity, E> {
                if !v.is_finite() || v < 0.0 {
                    return Err(E::custom(QuantityParseError));
                }
                Ok(Quantity::from_hundredths((v * 100.0).round() as i64))
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        // 5% of 210,000 = 10,500 exactly
        assert_eq!(
            Money::from_cents(210_000).percent_of(BasisPoints::from_bps(500)).cents(),
            10_500
        );
        // 8.25% of 1,000 = 82.5 -> 83
        assert_eq!(
            Money::from_cents(1_000).percent_of(BasisPoints::from_bps(825)).cents(),
            83
        );
        // 8.2% of 1,000 = 82 (no rounding)
        assert_eq!(
            Money::from_cents(1_000).percent_of(BasisPoints::from_bps(820)).cents(),
            82
        );
    }

    #[test]
    fn test_scale_rounds_half_up() {
        assert_eq!(
            Money::from_cents(150_000).scale(Multiplier::from_millis(1_200)).cents(),
            180_000
        );
        // 101 * 1.005 = 101.505 -> 102
        assert_eq!(
            Money::from_cents(101).scale(Multiplier::from_millis(1_005)).cents(),
            102
        );
    }

    #[test]
    fn test_times_quantity() {
        // 122,400 * 1.50 = 183,600
        assert_eq!(
            Money::from_cents(122_400)
                .times_quantity(Quantity::from_hundredths(150))
                .cents(),
            183_600
        );
        // 333 * 0.50 = 166.5 -> 167 (half up)
        assert_eq!(
            Money::from_cents(333).times_quantity(Quantity::from_hundredths(50)).cents(),
            167
        );
    }

    #[test]
    fn test_clamp_at_zero() {
        assert_eq!(Money::from_cents(-5).clamp_at_zero().cents(), 0);
        assert_eq!(Money::from_cents(5).clamp_at_zero().cents(), 5);
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!("1".parse::<Quantity>().unwrap().hundredths(), 100);
        assert_eq!("1.5".parse::<Quantity>().unwrap().hundredths(), 150);
        assert_eq!("2.00".parse::<Quantity>().unwrap().hundredths(), 200);
        assert_eq!("0".parse::<Quantity>().unwrap().hundredths(), 0);

        assert!("".parse::<Quantity>().is_err());
        assert!("-1".parse::<Quantity>().is_err());
        assert!("1.234".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_quantity_display_roundtrip() {
        let q: Quantity = "1.50".parse().unwrap();
        assert_eq!(q.to_string(), "1.50");
        assert_eq!(Quantity::from_units(3).to_string(), "3.00");
    }

    #[test]
    fn test_quantity_serde() {
        let q: Quantity = serde_json::from_str("\"2.50\"").unwrap();
        assert_eq!(q.hundredths(), 250);

        let q: Quantity = serde_json::from_str("3").unwrap();
        assert_eq!(q.hundredths(), 300);

        assert_eq!(serde_json::to_string(&q).unwrap(), "\"3.00\"");
    }

    #[test]
    fn test_multiplier_excess() {
        assert_eq!(Multiplier::from_millis(1_100).excess_millis(), 100);
        assert_eq!(Multiplier::one().excess_millis(), 0);
    }
}
