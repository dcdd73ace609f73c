//! # Invoice Totals
//!
//! Computes line and invoice totals in a fixed order of operations.
//!
//! ## Order of Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   item_subtotal   = qty × unit_price                         │
//! │              line_discount   = item_subtotal × discount%                │
//! │              line_tax        = (item_subtotal − line_discount) × tax%   │
//! │                                                                         │
//! │  invoice:    subtotal            = Σ item_subtotal                      │
//! │              after_line_discount = subtotal − Σ line_discount           │
//! │              invoice_discount    = after_line_discount × invoice_disc%  │
//! │              after_all_discounts = after_line_discount − invoice_disc   │
//! │              invoice_tax         = after_all_discounts × invoice_tax%   │
//! │                                                                         │
//! │              discount_amount = Σ line_discount + invoice_discount       │
//! │              tax_amount      = Σ line_tax + invoice_tax                 │
//! │              total_amount    = after_all_discounts + tax_amount         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A line's tax is computed after its own discount but before the
//! invoice-level discount. A line's `line_total` never includes the
//! invoice-level discount or tax; only the invoice aggregate does.
//!
//! ## Example
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::Money;
//! use tally_core::totals::{compute_totals, LineInput};
//! use tally_core::types::Percent;
//!
//! let line = LineInput {
//!     quantity: Decimal::from(2),
//!     unit_price: Money::new(Decimal::from(100)),
//!     tax_rate: Percent::new(Decimal::from(5)),
//!     discount: Percent::new(Decimal::from(10)),
//! };
//! let totals = compute_totals(&[line], Percent::zero(), Percent::zero());
//! assert_eq!(totals.total_amount, Money::new(Decimal::from(189)));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Percent, ResolvedLineItem};

/// Decimal places kept on percentages re-derived from stored amounts.
pub const DERIVED_RATE_DECIMALS: u32 = 6;

// =============================================================================
// Line Amounts
// =============================================================================

/// The four values of a line that feed totals.
///
/// Implemented by draft lines, saved lines and the plain [`LineInput`].
pub trait PricedLine {
    fn quantity(&self) -> Decimal;
    fn unit_price(&self) -> Money;
    fn tax_rate(&self) -> Percent;
    fn discount(&self) -> Percent;
}

/// A bare line for computing totals without a draft or saved invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub quantity: Decimal,
    pub unit_price: Money,
    pub tax_rate: Percent,
    pub discount: Percent,
}

impl PricedLine for LineInput {
    fn quantity(&self) -> Decimal {
        self.quantity
    }
    fn unit_price(&self) -> Money {
        self.unit_price
    }
    fn tax_rate(&self) -> Percent {
        self.tax_rate
    }
    fn discount(&self) -> Percent {
        self.discount
    }
}

impl PricedLine for ResolvedLineItem {
    fn quantity(&self) -> Decimal {
        self.quantity
    }
    fn unit_price(&self) -> Money {
        self.unit_price
    }
    fn tax_rate(&self) -> Percent {
        self.tax_rate
    }
    fn discount(&self) -> Percent {
        self.discount
    }
}

/// Line-level breakdown, before any invoice-level adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
}

impl LineAmounts {
    /// Computes one line's subtotal, discount and tax.
    pub fn of<L: PricedLine + ?Sized>(line: &L) -> Self {
        let subtotal = line.unit_price().times(line.quantity());
        let discount = subtotal.percent_of(line.discount());
        let tax = (subtotal - discount).percent_of(line.tax_rate());
        LineAmounts {
            subtotal,
            discount,
            tax,
        }
    }

    /// `subtotal − discount + tax`: what is stored as the line total.
    pub fn total(&self) -> Money {
        self.subtotal - self.discount + self.tax
    }
}

/// `(qty × price) × (1 − discount%) × (1 + tax%)`, unrounded.
pub fn line_total<L: PricedLine + ?Sized>(line: &L) -> Money {
    LineAmounts::of(line).total()
}

// =============================================================================
// Invoice Totals
// =============================================================================

/// Every intermediate of the totals calculation.
///
/// Only `subtotal`, `discount_amount`, `tax_amount` and `total_amount` are
/// persisted on the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub line_discount_amount: Money,
    pub after_line_discount: Money,
    pub line_tax_amount: Money,
    pub invoice_discount_amount: Money,
    pub after_all_discounts: Money,
    pub invoice_tax_amount: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
}

impl InvoiceTotals {
    /// Rounds the persisted amounts to cents.
    ///
    /// `total_amount` is rebuilt from the rounded parts, so
    /// `total = subtotal − discount + tax` still holds to the cent.
    pub fn rounded(&self) -> InvoiceTotals {
        let subtotal = self.subtotal.round_cents();
        let line_discount_amount = self.line_discount_amount.round_cents();
        let invoice_discount_amount = self.invoice_discount_amount.round_cents();
        let line_tax_amount = self.line_tax_amount.round_cents();
        let invoice_tax_amount = self.invoice_tax_amount.round_cents();

        let discount_amount = line_discount_amount + invoice_discount_amount;
        let tax_amount = line_tax_amount + invoice_tax_amount;
        let after_line_discount = subtotal - line_discount_amount;
        let after_all_discounts = after_line_discount - invoice_discount_amount;

        InvoiceTotals {
            subtotal,
            line_discount_amount,
            after_line_discount,
            line_tax_amount,
            invoice_discount_amount,
            after_all_discounts,
            invoice_tax_amount,
            discount_amount,
            tax_amount,
            total_amount: after_all_discounts + tax_amount,
        }
    }
}

/// Computes invoice totals from lines and invoice-level rates.
pub fn compute_totals<L: PricedLine>(
    items: &[L],
    invoice_discount: Percent,
    invoice_tax: Percent,
) -> InvoiceTotals {
    let mut subtotal = Money::zero();
    let mut line_discount_amount = Money::zero();
    let mut line_tax_amount = Money::zero();

    for item in items {
        let amounts = LineAmounts::of(item);
        subtotal += amounts.subtotal;
        line_discount_amount += amounts.discount;
        line_tax_amount += amounts.tax;
    }

    let after_line_discount = subtotal - line_discount_amount;
    let invoice_discount_amount = after_line_discount.percent_of(invoice_discount);
    let after_all_discounts = after_line_discount - invoice_discount_amount;
    let invoice_tax_amount = after_all_discounts.percent_of(invoice_tax);

    let discount_amount = line_discount_amount + invoice_discount_amount;
    let tax_amount = line_tax_amount + invoice_tax_amount;

    InvoiceTotals {
        subtotal,
        line_discount_amount,
        after_line_discount,
        line_tax_amount,
        invoice_discount_amount,
        after_all_discounts,
        invoice_tax_amount,
        discount_amount,
        tax_amount,
        total_amount: after_all_discounts + tax_amount,
    }
}

// =============================================================================
// Reverse Derivation
// =============================================================================

/// Invoice-level discount and tax percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceRates {
    pub discount_percent: Percent,
    pub tax_percent: Percent,
}

/// Re-derives invoice-level percentages from stored aggregate amounts.
///
/// Invoices persist amounts, not rates. The line-level share is recomputed
/// from `items` and whatever remains of the stored discount/tax is expressed
/// as a percentage of the amount it would have applied to. Zero denominators
/// yield 0%. Results are approximate when the stored amounts did not come
/// from [`compute_totals`]; that divergence is accepted.
pub fn derive_rates_from_persisted<L: PricedLine>(
    items: &[L],
    discount_amount: Money,
    tax_amount: Money,
) -> InvoiceRates {
    let line_only = compute_totals(items, Percent::zero(), Percent::zero());

    let invoice_discount = (discount_amount - line_only.line_discount_amount).clamp_non_negative();
    let discount_percent = ratio_percent(invoice_discount, line_only.after_line_discount);

    let after_all_discounts = line_only.after_line_discount - invoice_discount;
    let invoice_tax = (tax_amount - line_only.line_tax_amount).clamp_non_negative();
    let tax_percent = ratio_percent(invoice_tax, after_all_discounts);

    InvoiceRates {
        discount_percent,
        tax_percent,
    }
}

fn ratio_percent(part: Money, whole: Money) -> Percent {
    if !whole.is_positive() {
        return Percent::zero();
    }

    let pct = part.amount() / whole.amount() * Decimal::ONE_HUNDRED;
    Percent::new(
        pct.round_dp_with_strategy(DERIVED_RATE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
            .normalize(),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
