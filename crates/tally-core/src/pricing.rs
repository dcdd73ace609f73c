//! # Pricing
//!
//! Resolves the unit price a client pays for a product on a given date.
//!
//! ## Resolution Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     resolve_price_breakdown                             │
//! │                                                                         │
//! │  rule for (client, product)?                                            │
//! │       │                                                                 │
//! │       ├── no ──► product.unit_price ─────────────────────────┐          │
//! │       │                                                      │          │
//! │       └── yes ─► base price                                  │          │
//! │                  ├── rule.price_category_id set:             │          │
//! │                  │     resolve_category_price(on_date)       │          │
//! │                  │     └── none yet? product.paper_price     │          │
//! │                  └── unset: product.paper_price              │          │
//! │                        │                                     │          │
//! │                        ▼                                     │          │
//! │                  apply_rule(base, rule) ─────────────────────┤          │
//! │                                                              ▼          │
//! │                             + per_bird_adjustment ──► clamp ≥ 0         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `on_date` is the invoice's issue date, so the same invoice resolves to the
//! same price no matter when it is opened.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Client, ClientPricingRule, PerBirdPricing, PriceHistoryEntry, PriceRule, Product};

// =============================================================================
// Category Price Resolver
// =============================================================================

/// Finds the price of `category_id` effective on `on_date`.
///
/// Picks the entry with the latest `effective_date` that is not after
/// `on_date`. Returns `None` when the category has no price yet; callers fall
/// back to a static product price. The input order does not matter.
///
/// Two entries for the same category and date break the storage uniqueness
/// guarantee; the later one in `history` wins and a warning is logged.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use tally_core::money::Money;
/// use tally_core::pricing::resolve_category_price;
/// use tally_core::types::PriceHistoryEntry;
///
/// let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
/// let history = vec![
///     PriceHistoryEntry::new("A", Money::from_cents(1000), jan),
///     PriceHistoryEntry::new("A", Money::from_cents(1200), feb),
/// ];
///
/// let mid_jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// assert_eq!(resolve_category_price("A", mid_jan, &history), Some(Money::from_cents(1000)));
/// ```
pub fn resolve_category_price(
    category_id: &str,
    on_date: NaiveDate,
    history: &[PriceHistoryEntry],
) -> Option<Money> {
    let mut best: Option<&PriceHistoryEntry> = None;

    for entry in history
        .iter()
        .filter(|e| e.price_category_id == category_id && e.effective_date <= on_date)
    {
        match best.map(|b| b.effective_date) {
            Some(latest) if entry.effective_date < latest => {}
            Some(latest) if entry.effective_date == latest => {
                warn!(
                    category_id = %category_id,
                    effective_date = %entry.effective_date,
                    "Duplicate price history entries for one date"
                );
                best = Some(entry);
            }
            _ => best = Some(entry),
        }
    }

    best.map(|e| e.price)
}

// =============================================================================
// Rule Application
// =============================================================================

/// Applies a pricing rule to a base price.
///
/// `discount_flat` clamps at zero. A percentage over 100 or a negative
/// multiplier can still go negative here; the final resolved price is
/// clamped by [`resolve_price_breakdown`].
pub fn apply_rule(base: Money, rule: &PriceRule) -> Money {
    match rule {
        PriceRule::DiscountPercentage(pct) => base * (Decimal::ONE - pct.fraction()),
        PriceRule::DiscountFlat(amount) => (base - *amount).clamp_non_negative(),
        PriceRule::Multiplier(factor) => base * *factor,
    }
}

/// Per-bird amount added to the unit price.
///
/// Zero when per-bird pricing is off. A bird count of zero counts as one bird.
pub fn per_bird_adjustment(client: &Client, per_bird: PerBirdPricing) -> Money {
    if !per_bird.enabled {
        return Money::zero();
    }

    let birds = per_bird.bird_count.max(1);
    client.value_per_bird * Decimal::from(birds)
}

/// Finds the pricing rule for a client and product.
pub fn find_rule<'a>(
    rules: &'a [ClientPricingRule],
    client_id: &str,
    product_id: &str,
) -> Option<&'a ClientPricingRule> {
    rules
        .iter()
        .find(|r| r.client_id == client_id && r.product_id == product_id)
}

// =============================================================================
// Client Pricing Rule Resolver
// =============================================================================

/// Where the pre-adjustment price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// No rule: the product's default unit price.
    ProductDefault,
    /// Rule anchored to a category that had a price on the date.
    CategoryPrice,
    /// Rule applied to the product's paper price.
    PaperPrice,
}

/// Result of resolving a price, with the parts that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedPrice {
    /// Final unit price, never negative.
    pub unit_price: Money,
    /// Price before the rule was applied.
    pub base_price: Money,
    /// Per-bird amount included in `unit_price`.
    pub per_bird_adjustment: Money,
    pub source: PriceSource,
}

/// Resolves a unit price and reports how it was built.
pub fn resolve_price_breakdown(
    product: &Product,
    client: &Client,
    rule: Option<&ClientPricingRule>,
    on_date: NaiveDate,
    history: &[PriceHistoryEntry],
    per_bird: PerBirdPricing,
) -> ResolvedPrice {
    let adjustment = per_bird_adjustment(client, per_bird);

    let Some(rule) = rule else {
        return ResolvedPrice {
            unit_price: (product.unit_price + adjustment).clamp_non_negative(),
            base_price: product.unit_price,
            per_bird_adjustment: adjustment,
            source: PriceSource::ProductDefault,
        };
    };

    let category_price = rule
        .price_category_id
        .as_deref()
        .and_then(|category_id| resolve_category_price(category_id, on_date, history));

    let (base_price, source) = match category_price {
        Some(price) => (price, PriceSource::CategoryPrice),
        None => (product.paper_price, PriceSource::PaperPrice),
    };

    let ruled = apply_rule(base_price, &rule.rule);

    ResolvedPrice {
        unit_price: (ruled + adjustment).clamp_non_negative(),
        base_price,
        per_bird_adjustment: adjustment,
        source,
    }
}

/// Resolves the unit price a client pays for a product on `on_date`.
pub fn resolve_unit_price(
    product: &Product,
    client: &Client,
    rule: Option<&ClientPricingRule>,
    on_date: NaiveDate,
    history: &[PriceHistoryEntry],
    per_bird: PerBirdPricing,
) -> Money {
    resolve_price_breakdown(product, client, rule, on_date, history, per_bird).unit_price
}

// =============================================================================
// Pricing Context
// =============================================================================

/// Everything needed to price lines for one client on one invoice date.
///
/// ## Usage
/// ```rust,ignore
/// let ctx = PricingContext::new(&client, &rules, &history, draft.issue_date());
/// let price = ctx.resolve(&product, PerBirdPricing::enabled(12));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub client: &'a Client,
    pub rules: &'a [ClientPricingRule],
    pub history: &'a [PriceHistoryEntry],
    pub on_date: NaiveDate,
}

impl<'a> PricingContext<'a> {
    pub fn new(
        client: &'a Client,
        rules: &'a [ClientPricingRule],
        history: &'a [PriceHistoryEntry],
        on_date: NaiveDate,
    ) -> Self {
        PricingContext {
            client,
            rules,
            history,
            on_date,
        }
    }

    /// Resolves `product` using this client's rule for it, if any.
    pub fn resolve(&self, product: &Product, per_bird: PerBirdPricing) -> ResolvedPrice {
        let rule = find_rule(self.rules, &self.client.id, &product.id);
        resolve_price_breakdown(product, self.client, rule, self.on_date, self.history, per_bird)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
