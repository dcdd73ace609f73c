//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the **heart** of Tally. It contains the pricing, totals,
//! invoice and payment logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web front end (ts-rs bindings)               │   │
//! │  │    Clients ──► Price board ──► Invoice form ──► Payments        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐    │   │
//! │  │   │ pricing  │──►│  draft   │──►│  totals  │   │ payment  │    │   │
//! │  │   │ category │   │ reducers │   │  order   │   │ allocate │    │   │
//! │  │   │ rules    │   │ snapshot │   │  of ops  │   │ lifecycle│    │   │
//! │  │   └──────────┘   └──────────┘   └──────────┘   └──────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (PriceCategory, Client, Invoice, etc.)
//! - [`money`] - Exact decimal Money type
//! - [`pricing`] - Category price lookup and client pricing rules
//! - [`totals`] - Line and invoice totals, reverse rate derivation
//! - [`draft`] - Immutable invoice draft with pure reducers
//! - [`lifecycle`] - Status transitions, derived overdue, numbering
//! - [`payment`] - Single payments and bulk allocation
//! - [`report`] - Client statements and aging
//! - [`notification`] - Event notices
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; safe to call concurrently
//! 2. **No I/O**: callers fetch price history and rules, then pass them in
//! 3. **Decimal Money**: exact base-10 arithmetic, rounded to cents only on persist
//! 4. **Explicit Errors**: typed errors for rule violations, fallbacks for missing data
//!
//! ## Example Usage
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::money::Money;
//! use tally_core::pricing::apply_rule;
//! use tally_core::types::{Percent, PriceRule};
//!
//! let base = Money::new(Decimal::from(100));
//! let rule = PriceRule::DiscountPercentage(Percent::new(Decimal::from(10)));
//!
//! assert_eq!(apply_rule(base, &rule), Money::new(Decimal::from(90)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod draft;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod notification;
pub mod payment;
pub mod pricing;
pub mod report;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use draft::{DraftLineItem, InvoiceDraft, InvoiceRate, ResolvedInvoice};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{resolve_category_price, resolve_unit_price, PricingContext};
pub use totals::{compute_totals, derive_rates_from_persisted, InvoiceRates, InvoiceTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed on a single invoice.
///
/// ## Business Reason
/// Keeps invoices printable and transactions a reasonable size.
pub const MAX_INVOICE_LINES: usize = 200;

/// Maximum quantity on a single invoice line.
///
/// ## Business Reason
/// Catches typos like an extra row of zeros before they reach an invoice.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Maximum unit, paper or category price, and maximum flat discount.
///
/// Together with [`MAX_LINE_QUANTITY`] and [`MAX_INVOICE_LINES`] this keeps
/// every invoice total well inside `Decimal`'s range.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000;

/// Maximum birds on a per-bird priced line.
pub const MAX_BIRD_COUNT: u32 = 1_000_000;

/// Maximum factor of a `multiplier` pricing rule.
pub const MAX_RULE_MULTIPLIER: i64 = 100;
