//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PriceCategory  │──►│PriceHistoryEntry│   │     Client      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, name       │   │  price          │   │  due_days       │       │
//! │  └─────────────────┘   │  effective_date │   │  value_per_bird │       │
//! │          ▲             └─────────────────┘   └────────┬────────┘       │
//! │          │ anchors base price                         │                │
//! │  ┌───────┴─────────────────┐   ┌─────────────────┐    │                │
//! │  │   ClientPricingRule     │──►│     Product     │◄───┘                │
//! │  │  rule: PriceRule        │   │  unit_price     │                     │
//! │  └─────────────────────────┘   │  paper_price    │                     │
//! │                                └─────────────────┘                     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Invoice     │──►│ResolvedLineItem │   │    Payment      │       │
//! │  │  status, totals │   │  frozen prices  │   │  allocations    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity carries a UUID v4 `id`; invoices also carry a human-readable
//! `invoice_number`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage, stored as the human-facing number (`10` means 10%).
///
/// Used for line and invoice discount/tax rates and for
/// `discount_percentage` pricing rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Percent(#[ts(type = "string")] Decimal);

impl Percent {
    /// Creates a percentage from its human-facing value.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Percent(value)
    }

    /// Returns the percentage value (`10` for 10%).
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the rate as a fraction (`0.1` for 10%).
    #[inline]
    pub fn fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(Decimal::ZERO)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl From<Decimal> for Percent {
    fn from(value: Decimal) -> Self {
        Percent(value)
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

// =============================================================================
// Price Categories
// =============================================================================

/// A named bucket of time-varying commodity prices ("Paper Price", "Eggs").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceCategory {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One daily price observation for a category.
///
/// At most one entry exists per `(price_category_id, effective_date)`; the
/// storage layer upserts on that key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceHistoryEntry {
    pub id: String,
    pub price_category_id: String,
    pub price: Money,
    pub effective_date: NaiveDate,
}

impl PriceHistoryEntry {
    /// Creates a new entry with a fresh id.
    pub fn new(price_category_id: impl Into<String>, price: Money, effective_date: NaiveDate) -> Self {
        PriceHistoryEntry {
            id: Uuid::new_v4().to_string(),
            price_category_id: price_category_id.into(),
            price,
            effective_date,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// An invoiceable catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on invoices.
    pub name: String,

    pub description: Option<String>,

    /// Default price used when the client has no pricing rule.
    pub unit_price: Money,

    /// Base price for pricing rules that are not anchored to a category,
    /// and fallback when the anchored category has no price yet.
    pub paper_price: Money,

    /// Line tax rate applied when the product is added to an invoice.
    pub tax_rate: Percent,

    /// Inactive products stay referenced by old invoices but are hidden
    /// from new ones.
    pub is_active: bool,

    /// Sort order in product pickers.
    pub position: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Client
// =============================================================================

/// A billable party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// Default payment terms: due date = issue date + due_days.
    pub due_days: u32,

    /// Per-bird adjustment applied when per-bird pricing is enabled on a
    /// line. Positive is a surcharge, negative a discount.
    pub value_per_bird: Money,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Pricing Rules
// =============================================================================

/// How a client pricing rule adjusts its base price.
///
/// Serialized as `{"type": "discount_percentage", "value": "10"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PriceRule {
    /// `base × (1 − value/100)`
    DiscountPercentage(Percent),
    /// `max(0, base − value)`
    DiscountFlat(Money),
    /// `base × value`
    Multiplier(#[ts(type = "string")] Decimal),
}

impl PriceRule {
    /// Storage tag for the rule type.
    pub const fn kind(&self) -> &'static str {
        match self {
            PriceRule::DiscountPercentage(_) => "discount_percentage",
            PriceRule::DiscountFlat(_) => "discount_flat",
            PriceRule::Multiplier(_) => "multiplier",
        }
    }

    /// Raw rule value regardless of type.
    pub fn value(&self) -> Decimal {
        match self {
            PriceRule::DiscountPercentage(pct) => pct.value(),
            PriceRule::DiscountFlat(amount) => amount.amount(),
            PriceRule::Multiplier(factor) => *factor,
        }
    }

    /// Rebuilds a rule from its storage tag and value.
    ///
    /// Returns `None` for unknown tags.
    pub fn from_parts(kind: &str, value: Decimal) -> Option<Self> {
        match kind {
            "discount_percentage" => Some(PriceRule::DiscountPercentage(Percent::new(value))),
            "discount_flat" => Some(PriceRule::DiscountFlat(Money::new(value))),
            "multiplier" => Some(PriceRule::Multiplier(value)),
            _ => None,
        }
    }

    /// All storage tags, for validation messages.
    pub const KINDS: [&'static str; 3] = ["discount_percentage", "discount_flat", "multiplier"];
}

/// A client-specific override of a product's default price.
///
/// At most one rule exists per `(client_id, product_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientPricingRule {
    pub id: String,
    pub client_id: String,
    pub product_id: String,

    /// When set, the rule's base price is this category's price on the
    /// invoice date instead of the product's paper price.
    pub price_category_id: Option<String>,

    pub rule: PriceRule,
}

/// Per-bird pricing toggle captured on a line.
///
/// `bird_count` is kept when the toggle is off so the form can restore it,
/// but it contributes nothing to the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PerBirdPricing {
    pub enabled: bool,
    pub bird_count: u32,
}

impl PerBirdPricing {
    /// Per-bird pricing switched on for `bird_count` birds.
    pub const fn enabled(bird_count: u32) -> Self {
        PerBirdPricing {
            enabled: true,
            bird_count,
        }
    }

    /// No per-bird adjustment.
    pub const fn disabled() -> Self {
        PerBirdPricing {
            enabled: false,
            bird_count: 0,
        }
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The persisted status of an invoice.
///
/// "Overdue" is never stored; see [`DisplayStatus`] and
/// `lifecycle::display_status`. Serialized input carrying the legacy
/// `"overdue"` string deserializes as `Sent`; the database only ever holds
/// the four statuses below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being prepared, not yet sent to the client.
    #[default]
    Draft,
    /// Issued to the client and awaiting payment.
    #[serde(alias = "overdue")]
    Sent,
    /// Fully paid.
    Paid,
    /// Voided. Terminal.
    Cancelled,
}

impl InvoiceStatus {
    /// Lowercase storage/display name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shown to users: the stored status plus derived `Overdue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Draft,
    Sent,
    Overdue,
    Paid,
    Cancelled,
}

// =============================================================================
// Invoice
// =============================================================================

/// A persisted invoice header with its aggregate amounts.
///
/// `total_amount = subtotal − discount_amount + tax_amount` always holds for
/// amounts produced by `totals::compute_totals`. Invoice-level discount and
/// tax percentages are not stored; they are re-derived when editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub client_id: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub tax_amount: Money,
    pub total_amount: Money,
    /// Grows with every recorded payment; never decreases.
    pub amount_paid: Money,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Amount still owed. Negative when the invoice was overpaid.
    #[inline]
    pub fn balance(&self) -> Money {
        self.total_amount - self.amount_paid
    }

    /// Amount still owed, never below zero.
    #[inline]
    pub fn outstanding(&self) -> Money {
        self.balance().clamp_non_negative()
    }
}

// =============================================================================
// Resolved Line Item
// =============================================================================

/// A saved invoice line.
///
/// Uses the snapshot pattern: `unit_price` and `per_bird_adjustment` were
/// resolved when the line was created and are never recomputed from current
/// price history. There is no way to re-price one of these;
/// editing goes through `draft::DraftLineItem::from_resolved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedLineItem {
    pub id: String,
    pub invoice_id: String,
    /// `None` once the product has been deleted.
    pub product_id: Option<String>,
    pub description: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    /// Resolved unit price at creation time (frozen).
    pub unit_price: Money,
    pub tax_rate: Percent,
    pub discount: Percent,
    /// Stored even when per-bird pricing is off.
    pub bird_count: Option<u32>,
    /// Per-bird amount already included in `unit_price`. `Some` exactly when
    /// per-bird pricing was on.
    pub per_bird_adjustment: Option<Money>,
    /// `(qty × price) × (1 − discount) × (1 + tax)`, rounded to cents.
    /// Excludes invoice-level discount and tax.
    pub line_total: Money,
    /// Zero-based order on the invoice.
    pub position: u32,
}

// =============================================================================
// Payments
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Cheque,
    Card,
    Other,
}

/// Money received from a client, applied to one or more invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub client_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    /// Bank reference, cheque number, etc.
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// The share of a payment applied to one invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentAllocation {
    pub id: String,
    pub payment_id: String,
    pub invoice_id: String,
    pub amount: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_percent_fraction() {
        let rate = Percent::new(dec!(8.25));
        assert_eq!(rate.fraction(), dec!(0.0825));
        assert_eq!(rate.to_string(), "8.25%");
    }

    #[test]
    fn test_price_rule_parts_round_trip() {
        let rule = PriceRule::from_parts("multiplier", dec!(1.25)).unwrap();
        assert_eq!(rule, PriceRule::Multiplier(dec!(1.25)));
        assert_eq!(rule.kind(), "multiplier");
        assert_eq!(rule.value(), dec!(1.25));

        assert!(PriceRule::from_parts("bogus", dec!(1)).is_none());
    }

    #[test]
    fn test_price_rule_serialization() {
        let rule = PriceRule::DiscountPercentage(Percent::new(dec!(10)));
        let json = serde_json::to_value(rule).unwrap();
        assert_eq!(json["type"], "discount_percentage");
        assert_eq!(json["value"], "10");
    }

    #[test]
    fn test_legacy_overdue_status_reads_as_sent() {
        let status: InvoiceStatus = serde_json::from_str("\"overdue\"").unwrap();
        assert_eq!(status, InvoiceStatus::Sent);

        let json = serde_json::to_string(&InvoiceStatus::Sent).unwrap();
        assert_eq!(json, "\"sent\"");
    }

    #[test]
    fn test_invoice_status_default() {
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
    }

    #[test]
    fn test_per_bird_constructors() {
        assert!(PerBirdPricing::enabled(5).enabled);
        assert_eq!(PerBirdPricing::disabled(), PerBirdPricing::default());
    }
}
