//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    162 × 0.05 = 8.100000000000001  ❌ WRONG!                            │
//! │                                                                         │
//! │  Invoices need more than integer cents, too:                            │
//! │    quantity 2.5 kg × 3.333 / unit, multiplier 1.25 on a daily price     │
//! │                                                                         │
//! │  OUR SOLUTION: Base-10 Decimal                                          │
//! │    Exact arithmetic in the core, rounded to cents only when a value     │
//! │    is persisted (see `round_cents`)                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let doubled = price * Decimal::from(2); // $21.98
//! assert_eq!(doubled, Money::from_cents(2198));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percent;

/// Minor-unit precision used when amounts are persisted.
pub const CURRENCY_DECIMALS: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in major currency units (dollars, rupees, ...).
///
/// ## Design Decisions
/// - **Signed**: per-bird adjustments and intermediate differences can be
///   negative; clamping is explicit via [`Money::clamp_non_negative`]
/// - **Unrounded**: arithmetic keeps full precision until `round_cents`
///
/// ## Where Money Flows
/// ```text
/// PriceHistoryEntry.price ──► resolved unit price ──► line subtotal
///                                                         │
///                         discount / tax amounts ◄────────┘
///                                    │
///                                    ▼
///                        Invoice.total_amount ──► Payment allocation
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Wraps a decimal amount in major units.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from minor units (cents).
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, CURRENCY_DECIMALS))
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Replaces negative amounts with zero.
    ///
    /// Resolved prices are never negative, however large a flat discount or
    /// per-bird deduction is.
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Rounds to the currency's minor unit, half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    ///
    /// let tax = Money::new(Decimal::new(825, 3)); // 0.825
    /// assert_eq!(tax.round_cents(), Money::from_cents(83));
    /// ```
    pub fn round_cents(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(CURRENCY_DECIMALS, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Returns `rate` percent of this amount, unrounded.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use tally_core::money::Money;
    /// use tally_core::types::Percent;
    ///
    /// let base = Money::new(Decimal::from(162));
    /// let tax = base.percent_of(Percent::new(Decimal::from(5)));
    /// assert_eq!(tax, Money::new(Decimal::new(81, 1))); // 8.1
    /// ```
    #[inline]
    pub fn percent_of(&self, rate: Percent) -> Money {
        Money(self.0 * rate.fraction())
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    #[inline]
    pub fn times(&self, quantity: Decimal) -> Money {
        Money(self.0 * quantity)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain amount with two decimals, e.g. `10.99`.
///
/// Currency symbols belong to the presentation layer
/// (see `tally_db::config::AppConfig::format_currency`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.round_cents().0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a decimal factor (quantities, multipliers, bird counts).
impl Mul<Decimal> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Decimal) -> Self {
        Money(self.0 * factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
