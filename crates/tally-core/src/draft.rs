//! # Invoice Draft
//!
//! An invoice being composed or edited, as an immutable value.
//!
//! ## Reducer Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   InvoiceDraft ──add_line──► InvoiceDraft' ──set_invoice_rate──► ...    │
//! │        │                          │                                     │
//! │        └── totals                 └── totals recomputed                 │
//! │                                                                         │
//! │   every reducer validates, builds a new draft, recomputes totals        │
//! │   and leaves the original untouched                                     │
//! │                                                                         │
//! │   draft.resolve() ──► Vec<ResolvedLineItem> + rounded InvoiceTotals     │
//! │                       (what the repository writes)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Semantics
//! [`DraftLineItem::for_product`] is the only place a price is resolved. Lines
//! rebuilt from a saved invoice ([`DraftLineItem::from_resolved`]) keep the
//! stored unit price even if the client's rule or the category price changed
//! since.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::lifecycle::default_due_date;
use crate::money::Money;
use crate::pricing::PricingContext;
use crate::totals::{
    compute_totals, derive_rates_from_persisted, line_total, InvoiceRates, InvoiceTotals,
    PricedLine,
};
use crate::types::{Client, Invoice, Percent, PerBirdPricing, Product, ResolvedLineItem};
use crate::validation::{
    validate_bird_count, validate_percent, validate_quantity, validate_unit_price,
};
use crate::MAX_INVOICE_LINES;

// =============================================================================
// Draft Line Item
// =============================================================================

/// A line on a draft invoice.
///
/// `unit_price` already includes `per_bird_adjustment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftLineItem {
    pub product_id: Option<String>,
    pub description: String,
    #[ts(as = "String")]
    pub quantity: Decimal,
    pub unit_price: Money,
    pub tax_rate: Percent,
    pub discount: Percent,
    pub per_bird: PerBirdPricing,
    pub per_bird_adjustment: Money,
}

impl DraftLineItem {
    /// Prices `product` for the context's client and date.
    ///
    /// Takes the product's name as description and its tax rate; no
    /// line discount.
    pub fn for_product(
        ctx: &PricingContext<'_>,
        product: &Product,
        quantity: Decimal,
        per_bird: PerBirdPricing,
    ) -> Self {
        let resolved = ctx.resolve(product, per_bird);

        DraftLineItem {
            product_id: Some(product.id.clone()),
            description: product.name.clone(),
            quantity,
            unit_price: resolved.unit_price,
            tax_rate: product.tax_rate,
            discount: Percent::zero(),
            per_bird,
            per_bird_adjustment: resolved.per_bird_adjustment,
        }
    }

    /// A free-text line with a manually entered price.
    pub fn custom(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Money,
        tax_rate: Percent,
    ) -> Self {
        DraftLineItem {
            product_id: None,
            description: description.into(),
            quantity,
            unit_price,
            tax_rate,
            discount: Percent::zero(),
            per_bird: PerBirdPricing::disabled(),
            per_bird_adjustment: Money::zero(),
        }
    }

    /// Rebuilds a draft line from a saved line without re-pricing it.
    pub fn from_resolved(item: &ResolvedLineItem) -> Self {
        let per_bird = PerBirdPricing {
            enabled: item.per_bird_adjustment.is_some(),
            bird_count: item.bird_count.unwrap_or(0),
        };

        DraftLineItem {
            product_id: item.product_id.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            tax_rate: item.tax_rate,
            discount: item.discount,
            per_bird,
            per_bird_adjustment: item.per_bird_adjustment.unwrap_or_default(),
        }
    }

    /// Returns the line with a line-level discount.
    pub fn with_discount(mut self, discount: Percent) -> Self {
        self.discount = discount;
        self
    }

    /// Returns the line with a different quantity.
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    /// Unrounded line total excluding invoice-level discount and tax.
    pub fn line_total(&self) -> Money {
        line_total(self)
    }

    fn validate(&self) -> CoreResult<()> {
        validate_quantity(self.quantity)?;
        validate_percent("tax_rate", self.tax_rate)?;
        validate_percent("discount", self.discount)?;
        if self.per_bird.enabled {
            validate_bird_count(self.per_bird.bird_count)?;
        }
        validate_unit_price("unit_price", self.unit_price)?;
        Ok(())
    }

    fn freeze(&self, invoice_id: &str, position: u32) -> ResolvedLineItem {
        // a switched-off count is kept for the form; only the adjustment
        // marks per-bird pricing as on
        let bird_count = Some(self.per_bird.bird_count).filter(|count| *count >= 1);
        let per_bird_adjustment = self.per_bird.enabled.then_some(self.per_bird_adjustment);

        ResolvedLineItem {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.to_string(),
            product_id: self.product_id.clone(),
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
            discount: self.discount,
            bird_count,
            per_bird_adjustment,
            line_total: self.line_total().round_cents(),
            position,
        }
    }
}

impl PricedLine for DraftLineItem {
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

// =============================================================================
// Invoice Draft
// =============================================================================

/// Which invoice-level rate to set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceRate {
    Discount,
    Tax,
}

/// An invoice under composition.
///
/// Fields are private so totals can never go stale; use the reducers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDraft {
    invoice_id: String,
    client_id: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    notes: Option<String>,
    lines: Vec<DraftLineItem>,
    rates: InvoiceRates,
    totals: InvoiceTotals,
}

/// What a draft persists as: frozen lines and cent-rounded totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInvoice {
    pub invoice_id: String,
    pub client_id: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub items: Vec<ResolvedLineItem>,
    pub totals: InvoiceTotals,
}

impl InvoiceDraft {
    /// Starts an empty draft for `client`, due after the client's terms.
    pub fn new(client: &Client, issue_date: NaiveDate) -> Self {
        InvoiceDraft {
            invoice_id: Uuid::new_v4().to_string(),
            client_id: client.id.clone(),
            issue_date,
            due_date: default_due_date(issue_date, client.due_days),
            notes: None,
            lines: Vec::new(),
            rates: InvoiceRates::default(),
            totals: InvoiceTotals::default(),
        }
    }

    /// Rebuilds an edit draft from a saved invoice.
    ///
    /// Line prices come from `items` as stored. Invoice-level rates are
    /// re-derived from the stored discount and tax amounts.
    ///
    /// ## Errors
    /// `CoreError::InvoiceLocked` for paid or cancelled invoices.
    pub fn from_persisted(invoice: &Invoice, items: &[ResolvedLineItem]) -> CoreResult<Self> {
        if invoice.status.is_terminal() {
            return Err(CoreError::InvoiceLocked {
                invoice_id: invoice.id.clone(),
                status: invoice.status.to_string(),
            });
        }

        let mut ordered: Vec<&ResolvedLineItem> = items.iter().collect();
        ordered.sort_by_key(|item| item.position);
        let lines: Vec<DraftLineItem> = ordered.into_iter().map(DraftLineItem::from_resolved).collect();

        let rates = derive_rates_from_persisted(&lines, invoice.discount_amount, invoice.tax_amount);

        Ok(InvoiceDraft {
            invoice_id: invoice.id.clone(),
            client_id: invoice.client_id.clone(),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            notes: invoice.notes.clone(),
            lines,
            rates,
            totals: InvoiceTotals::default(),
        }
        .recomputed())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn lines(&self) -> &[DraftLineItem] {
        &self.lines
    }

    pub fn rates(&self) -> InvoiceRates {
        self.rates
    }

    /// Unrounded totals for display while editing.
    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    // -------------------------------------------------------------------------
    // Reducers
    // -------------------------------------------------------------------------

    /// Appends a line.
    pub fn add_line(&self, line: DraftLineItem) -> CoreResult<Self> {
        if self.lines.len() >= MAX_INVOICE_LINES {
            return Err(CoreError::DraftTooLarge {
                max: MAX_INVOICE_LINES,
            });
        }
        line.validate()?;

        let mut next = self.clone();
        next.lines.push(line);
        Ok(next.recomputed())
    }

    /// Replaces the line at `index`.
    pub fn update_line(&self, index: usize, line: DraftLineItem) -> CoreResult<Self> {
        self.check_index(index)?;
        line.validate()?;

        let mut next = self.clone();
        next.lines[index] = line;
        Ok(next.recomputed())
    }

    /// Removes the line at `index`, shifting later lines up.
    pub fn remove_line(&self, index: usize) -> CoreResult<Self> {
        self.check_index(index)?;

        let mut next = self.clone();
        next.lines.remove(index);
        Ok(next.recomputed())
    }

    /// Sets the invoice-level discount or tax percentage.
    pub fn set_invoice_rate(&self, which: InvoiceRate, rate: Percent) -> CoreResult<Self> {
        let mut next = self.clone();
        match which {
            InvoiceRate::Discount => {
                validate_percent("discount_percent", rate)?;
                next.rates.discount_percent = rate;
            }
            InvoiceRate::Tax => {
                validate_percent("tax_percent", rate)?;
                next.rates.tax_percent = rate;
            }
        }
        Ok(next.recomputed())
    }

    /// Sets issue and due dates. Line prices are not re-resolved.
    pub fn set_dates(&self, issue_date: NaiveDate, due_date: NaiveDate) -> CoreResult<Self> {
        if due_date < issue_date {
            return Err(ValidationError::InvalidFormat {
                field: "due_date".to_string(),
                reason: "must not be before the issue date".to_string(),
            }
            .into());
        }

        let mut next = self.clone();
        next.issue_date = issue_date;
        next.due_date = due_date;
        Ok(next)
    }

    /// Sets notes; blank notes clear them.
    pub fn set_notes(&self, notes: Option<String>) -> Self {
        let mut next = self.clone();
        next.notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        next
    }

    /// Freezes the draft for persistence.
    ///
    /// Unit prices keep full precision; line totals and invoice totals are
    /// rounded to cents.
    pub fn resolve(&self) -> ResolvedInvoice {
        let items = self
            .lines
            .iter()
            .enumerate()
            .map(|(position, line)| line.freeze(&self.invoice_id, position as u32))
            .collect();

        ResolvedInvoice {
            invoice_id: self.invoice_id.clone(),
            client_id: self.client_id.clone(),
            issue_date: self.issue_date,
            due_date: self.due_date,
            notes: self.notes.clone(),
            items,
            totals: self.totals.rounded(),
        }
    }

    fn check_index(&self, index: usize) -> CoreResult<()> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound {
                index,
                len: self.lines.len(),
            });
        }
        Ok(())
    }

    fn recomputed(mut self) -> Self {
        self.totals = compute_totals(
            &self.lines,
            self.rates.discount_percent,
            self.rates.tax_percent,
        );
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::test_invoice;
    use crate::pricing::tests::{date, test_client, test_product};
    use crate::types::{ClientPricingRule, InvoiceStatus, PriceHistoryEntry, PriceRule};
    use rust_decimal_macros::dec;

    fn line(qty: Decimal, price: Decimal, discount: Decimal, tax: Decimal) -> DraftLineItem {
        DraftLineItem::custom("Eggs", qty, Money::new(price), Percent::new(tax))
            .with_discount(Percent::new(discount))
    }

    fn empty_draft() -> InvoiceDraft {
        InvoiceDraft::new(&test_client(dec!(0)), date("2024-01-10"))
    }

    #[test]
    fn test_new_draft_uses_client_terms() {
        let draft = empty_draft();
        assert_eq!(draft.due_date(), date("2024-02-09"));
        assert!(draft.is_empty());
        assert!(draft.totals().total_amount.is_zero());
    }

    #[test]
    fn test_reducers_leave_original_untouched() {
        let draft = empty_draft();
        let with_line = draft.add_line(line(dec!(2), dec!(100), dec!(10), dec!(5))).unwrap();

        assert!(draft.is_empty());
        assert_eq!(with_line.lines().len(), 1);
        assert_eq!(with_line.totals().total_amount, Money::new(dec!(189)));
    }

    #[test]
    fn test_invoice_rates_recompute_totals() {
        let draft = empty_draft()
            .add_line(line(dec!(2), dec!(100), dec!(10), dec!(5)))
            .unwrap()
            .set_invoice_rate(InvoiceRate::Discount, Percent::new(dec!(10)))
            .unwrap()
            .set_invoice_rate(InvoiceRate::Tax, Percent::new(dec!(5)))
            .unwrap();

        assert_eq!(draft.totals().total_amount, Money::new(dec!(179.1)));
        assert_eq!(draft.totals().discount_amount, Money::new(dec!(38)));
    }

    #[test]
    fn test_update_and_remove_line() {
        let draft = empty_draft()
            .add_line(line(dec!(1), dec!(10), dec!(0), dec!(0)))
            .unwrap()
            .add_line(line(dec!(1), dec!(20), dec!(0), dec!(0)))
            .unwrap();
        assert_eq!(draft.totals().subtotal, Money::new(dec!(30)));

        let updated = draft.update_line(0, line(dec!(3), dec!(10), dec!(0), dec!(0))).unwrap();
        assert_eq!(updated.totals().subtotal, Money::new(dec!(50)));

        let removed = updated.remove_line(0).unwrap();
        assert_eq!(removed.totals().subtotal, Money::new(dec!(20)));
        assert_eq!(removed.lines()[0].unit_price, Money::new(dec!(20)));
    }

    #[test]
    fn test_line_index_out_of_range() {
        let err = empty_draft().remove_line(0).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound { index: 0, len: 0 }));
    }

    #[test]
    fn test_rejects_invalid_lines() {
        let draft = empty_draft();
        assert!(draft.add_line(line(dec!(-1), dec!(10), dec!(0), dec!(0))).is_err());
        assert!(draft.add_line(line(dec!(1), dec!(10), dec!(150), dec!(0))).is_err());

        let zero_birds = line(dec!(1), dec!(10), dec!(0), dec!(0));
        let zero_birds = DraftLineItem {
            per_bird: PerBirdPricing::enabled(0),
            ..zero_birds
        };
        assert!(draft.add_line(zero_birds).is_err());
    }

    #[test]
    fn test_rejects_lines_beyond_amount_bounds() {
        let draft = empty_draft();

        let err = draft
            .add_line(line(dec!(100000000000000000000), dec!(10000000000), dec!(0), dec!(0)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let err = draft
            .add_line(line(dec!(1), dec!(10000000000), dec!(0), dec!(0)))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        // the largest line allowed still totals exactly
        let largest = draft
            .add_line(line(dec!(1000000), dec!(1000000000), dec!(0), dec!(100)))
            .unwrap();
        assert_eq!(
            largest.totals().total_amount,
            Money::new(dec!(2000000000000000))
        );
    }

    #[test]
    fn test_line_limit() {
        let mut draft = empty_draft();
        for _ in 0..MAX_INVOICE_LINES {
            draft = draft.add_line(line(dec!(1), dec!(1), dec!(0), dec!(0))).unwrap();
        }

        let err = draft.add_line(line(dec!(1), dec!(1), dec!(0), dec!(0))).unwrap_err();
        assert!(matches!(err, CoreError::DraftTooLarge { .. }));
    }

    #[test]
    fn test_for_product_resolves_through_context() {
        let client = test_client(dec!(2));
        let product = test_product(dec!(50), dec!(40));
        let rules = vec![ClientPricingRule {
            id: "rule-1".to_string(),
            client_id: client.id.clone(),
            product_id: product.id.clone(),
            price_category_id: Some("cat-a".to_string()),
            rule: PriceRule::Multiplier(dec!(1.25)),
        }];
        let history = vec![PriceHistoryEntry::new("cat-a", Money::new(dec!(40)), date("2024-01-01"))];
        let ctx = PricingContext::new(&client, &rules, &history, date("2024-01-10"));

        let item = DraftLineItem::for_product(&ctx, &product, dec!(3), PerBirdPricing::enabled(5));

        // 40 × 1.25 + 2 × 5
        assert_eq!(item.unit_price, Money::new(dec!(60)));
        assert_eq!(item.per_bird_adjustment, Money::new(dec!(10)));
        assert_eq!(item.product_id.as_deref(), Some("prod-1"));
    }

    #[test]
    fn test_resolve_rounds_for_persistence() {
        let draft = empty_draft()
            .add_line(line(dec!(3), dec!(3.333), dec!(0), dec!(0)))
            .unwrap();
        let resolved = draft.resolve();

        assert_eq!(resolved.items.len(), 1);
        assert_eq!(resolved.items[0].line_total, Money::new(dec!(10.00)));
        assert_eq!(resolved.items[0].position, 0);
        assert_eq!(resolved.items[0].invoice_id, draft.invoice_id());
        assert_eq!(resolved.totals.total_amount, Money::new(dec!(10.00)));
        assert!(resolved.items[0].bird_count.is_none());
    }

    #[test]
    fn test_switched_off_bird_count_survives_reload() {
        let off = DraftLineItem {
            per_bird: PerBirdPricing {
                enabled: false,
                bird_count: 7,
            },
            ..line(dec!(2), dec!(10), dec!(0), dec!(0))
        };
        let on = DraftLineItem {
            per_bird: PerBirdPricing::enabled(4),
            per_bird_adjustment: Money::new(dec!(2)),
            ..line(dec!(1), dec!(12), dec!(0), dec!(0))
        };
        let draft = empty_draft().add_line(off).unwrap().add_line(on).unwrap();
        let resolved = draft.resolve();

        assert_eq!(resolved.items[0].bird_count, Some(7));
        assert_eq!(resolved.items[0].per_bird_adjustment, None);
        assert_eq!(resolved.items[1].bird_count, Some(4));
        assert_eq!(resolved.items[1].per_bird_adjustment, Some(Money::new(dec!(2))));

        let reloaded_off = DraftLineItem::from_resolved(&resolved.items[0]);
        assert_eq!(
            reloaded_off.per_bird,
            PerBirdPricing {
                enabled: false,
                bird_count: 7
            }
        );
        assert!(reloaded_off.per_bird_adjustment.is_zero());
        assert_eq!(reloaded_off.unit_price, Money::new(dec!(10)));

        let reloaded_on = DraftLineItem::from_resolved(&resolved.items[1]);
        assert_eq!(reloaded_on.per_bird, PerBirdPricing::enabled(4));
        assert_eq!(reloaded_on.per_bird_adjustment, Money::new(dec!(2)));
    }

    #[test]
    fn test_from_persisted_keeps_stored_prices_and_rates() {
        let draft = empty_draft()
            .add_line(line(dec!(2), dec!(100), dec!(10), dec!(5)))
            .unwrap()
            .set_invoice_rate(InvoiceRate::Discount, Percent::new(dec!(10)))
            .unwrap()
            .set_invoice_rate(InvoiceRate::Tax, Percent::new(dec!(5)))
            .unwrap();
        let resolved = draft.resolve();

        let mut invoice = test_invoice(
            "INV-2024-00001",
            InvoiceStatus::Sent,
            resolved.totals.total_amount,
            Money::zero(),
            draft.due_date(),
        );
        invoice.id = resolved.invoice_id.clone();
        invoice.subtotal = resolved.totals.subtotal;
        invoice.discount_amount = resolved.totals.discount_amount;
        invoice.tax_amount = resolved.totals.tax_amount;

        let reopened = InvoiceDraft::from_persisted(&invoice, &resolved.items).unwrap();
        assert_eq!(reopened.rates().discount_percent, Percent::new(dec!(10)));
        assert_eq!(reopened.rates().tax_percent, Percent::new(dec!(5)));
        assert_eq!(reopened.lines()[0].unit_price, Money::new(dec!(100)));
        assert_eq!(reopened.totals().total_amount, Money::new(dec!(179.1)));
    }

    #[test]
    fn test_from_persisted_rejects_locked_invoice() {
        let invoice = test_invoice(
            "INV-2024-00002",
            InvoiceStatus::Paid,
            Money::new(dec!(10)),
            Money::new(dec!(10)),
            date("2024-02-01"),
        );
        let err = InvoiceDraft::from_persisted(&invoice, &[]).unwrap_err();
        assert!(matches!(err, CoreError::InvoiceLocked { .. }));
    }

    #[test]
    fn test_set_dates_and_notes() {
        let draft = empty_draft();
        assert!(draft.set_dates(date("2024-02-01"), date("2024-01-01")).is_err());

        let moved = draft.set_dates(date("2024-02-01"), date("2024-02-15")).unwrap();
        assert_eq!(moved.issue_date(), date("2024-02-01"));

        let noted = moved.set_notes(Some("  ".to_string()));
        assert!(noted.notes().is_none());
        let noted = moved.set_notes(Some("Deliver Friday".to_string()));
        assert_eq!(noted.notes(), Some("Deliver Friday"));
    }
}
