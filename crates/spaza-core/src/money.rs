//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  In many retail systems:                                            │
//! │    R10.00 / 3 = R3.33 (×3 = R9.99)  → Lost R0.01!                   │
//! │                                                                     │
//! │  OUR SOLUTION: Integer Cents                                        │
//! │    1000 cents / 3 = 333 cents (×3 = 999 cents)                      │
//! │    We KNOW we lost 1 cent, and handle it explicitly                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use spaza_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // R10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                      // R21.98
//! let total = price + Money::from_cents(500);   // R15.99
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::VatRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: variances and refunds can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Derives**: full serde support for JSON serialization
///
/// Every monetary value in the system flows through this type: product
/// prices, line totals, tendered amounts, till floats and variances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use spaza_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents R10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (rand and cents).
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` = -R5.50, not -R4.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (rand) portion.
    #[inline]
    pub const fn rand(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
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

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Extracts the VAT portion of a VAT-INCLUSIVE amount.
    ///
    /// ## The Inclusive Formula
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────┐
    /// │  VAT-INCLUSIVE EXTRACTION (division, not addition)              │
    /// │                                                                 │
    /// │  Shelf prices already contain VAT. The tax is back-calculated:  │
    /// │                                                                 │
    /// │    vat = total × rate / (100 + rate)                            │
    /// │                                                                 │
    /// │  Example: R115.00 at 15%                                        │
    /// │    vat = 115.00 × 15 / 115 = R15.00                             │
    /// │    net = 115.00 − 15.00    = R100.00                            │
    /// │                                                                 │
    /// │  NEVER add VAT on top of a shelf price: the sticker is what    │
    /// │  the customer pays.                                             │
    /// └─────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Implementation
    /// Integer math with the rate in basis points:
    /// `(cents × bps + (10000 + bps)/2) / (10000 + bps)`, rounding half up.
    /// i128 intermediates prevent overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use spaza_core::money::Money;
    /// use spaza_core::types::VatRate;
    ///
    /// let total = Money::from_cents(11500); // R115.00 shelf price
    /// let rate = VatRate::from_bps(1500);   // 15%
    ///
    /// assert_eq!(total.vat_portion(rate).cents(), 1500); // R15.00
    /// ```
    pub fn vat_portion(&self, rate: VatRate) -> Money {
        if rate.is_zero() {
            return Money::zero();
        }
        let denom = 10_000i128 + rate.bps() as i128;
        let vat_cents = (self.0 as i128 * rate.bps() as i128 + denom / 2) / denom;
        Money::from_cents(vat_cents as i64)
    }

    /// Returns the VAT-exclusive portion of a VAT-inclusive amount.
    ///
    /// Defined as `self − vat_portion(rate)` so that the identity
    /// `excluding_vat + vat_portion == self` holds exactly in cents.
    pub fn excluding_vat(&self, rate: VatRate) -> Money {
        *self - self.vat_portion(rate)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use spaza_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // R2.99
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897); // R8.97
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// Debug/logging convenience; the front-end formats with the configured
/// currency symbol for actual display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}R{}.{:02}", sign, self.rand().abs(), self.cents_part())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
