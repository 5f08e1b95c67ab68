//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SPLITTING A BILL                                                       │
//! │                                                                         │
//! │  Floating point:                                                        │
//! │    $100.00 / 3 = 33.333...  → three payers, who pays the fraction?     │
//! │                                                                         │
//! │  Integer minor units:                                                   │
//! │    10000 / 3 = 3333 remainder 1                                         │
//! │    parts = [3334, 3333, 3333]   → sum is exactly 10000                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use floor_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.cents(), 2198);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// Every price, line total, order total and partial payment flows through
/// this type. There is no float constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use floor_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use floor_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Splits the amount into `parts` integer shares that sum exactly to
    /// the original amount.
    ///
    /// The first share absorbs the whole remainder.
    ///
    /// ## Example
    /// ```rust
    /// use floor_core::money::Money;
    ///
    /// let parts = Money::from_cents(100).split_evenly(3);
    /// let cents: Vec<i64> = parts.iter().map(|m| m.cents()).collect();
    /// assert_eq!(cents, vec![34, 33, 33]);
    /// ```
    ///
    /// ## Returns
    /// An empty vector when `parts` is zero.
    pub fn split_evenly(&self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }

        let n = parts as i64;
        let share = self.0.div_euclid(n);
        let remainder = self.0.rem_euclid(n);

        let mut shares = vec![Money(share); parts];
        shares[0] = Money(share + remainder);
        shares
    }

    /// Returns `floor(amount × bps / 10000)`.
    ///
    /// Used for percentage splits. Whatever is lost to flooring stays lost;
    /// callers decide whether to reconcile it.
    ///
    /// ## Example
    /// ```rust
    /// use floor_core::money::Money;
    ///
    /// // 33.33% of 10.00 = 3.333 → 3.33
    /// assert_eq!(Money::from_cents(1000).portion_bps(3333).cents(), 333);
    /// ```
    pub fn portion_bps(&self, bps: u32) -> Money {
        // i128 keeps large totals from overflowing before the division
        let scaled = self.0 as i128 * bps as i128;
        Money(scaled.div_euclid(10_000) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation for logs; UI formatting is locale-aware elsewhere.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::zero()), "0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_split_evenly_first_absorbs_remainder() {
        let parts = Money::from_cents(100).split_evenly(3);
        assert_eq!(
            parts,
            vec![
                Money::from_cents(34),
                Money::from_cents(33),
                Money::from_cents(33)
            ]
        );

        let parts = Money::from_cents(10000).split_evenly(3);
        assert_eq!(parts[0].cents(), 3334);
        assert_eq!(parts[1].cents(), 3333);
    }

    #[test]
    fn test_split_evenly_never_leaks() {
        for total in [0_i64, 1, 7, 99, 100, 101, 12345, 999_999] {
            for n in 1..=12 {
                let parts = Money::from_cents(total).split_evenly(n);
                assert_eq!(parts.len(), n);
                let sum: Money = parts.iter().copied().sum();
                assert_eq!(sum.cents(), total, "total {total} across {n}");
            }
        }
    }

    #[test]
    fn test_split_evenly_zero_parts() {
        assert!(Money::from_cents(100).split_evenly(0).is_empty());
    }

    #[test]
    fn test_portion_bps_floors() {
        assert_eq!(Money::from_cents(100).portion_bps(5000).cents(), 50);
        assert_eq!(Money::from_cents(101).portion_bps(5000).cents(), 50);
        assert_eq!(Money::from_cents(1000).portion_bps(3333).cents(), 333);
        assert_eq!(Money::from_cents(1000).portion_bps(0).cents(), 0);
    }
}
