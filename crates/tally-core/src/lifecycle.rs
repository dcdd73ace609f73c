//! # Invoice Lifecycle
//!
//! Status transitions, the derived overdue classification, due dates and
//! invoice numbering.
//!
//! ## State Machine
//! ```text
//!            ┌──────────────── paid ◄───────────────┐
//!            │                                      │
//!   draft ───┼──────────────► sent ─────────────────┘
//!            │                  │
//!            └──► cancelled ◄───┘
//!
//!   sent + balance > 0 + today > due_date  ══►  shown as Overdue
//! ```
//!
//! `paid` and `cancelled` are terminal. Overdue is never stored: it is
//! computed by [`display_status`] so every view agrees on it.

use chrono::{Days, NaiveDate};

use crate::error::{CoreError, CoreResult};
use crate::types::{DisplayStatus, Invoice, InvoiceStatus};

impl InvoiceStatus {
    /// Returns true if an invoice may move from `self` to `target`.
    pub fn can_transition_to(&self, target: InvoiceStatus) -> bool {
        use InvoiceStatus::*;

        matches!(
            (self, target),
            (Draft, Sent) | (Draft, Paid) | (Sent, Paid) | (Draft, Cancelled) | (Sent, Cancelled)
        )
    }

    /// True for `paid` and `cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// True while the invoice accepts payments and edits.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }
}

/// Checks a transition, returning the target status on success.
pub fn transition(from: InvoiceStatus, to: InvoiceStatus) -> CoreResult<InvoiceStatus> {
    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidStatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(to)
}

/// Returns true when a sent invoice still owes money after its due date.
pub fn is_overdue(invoice: &Invoice, today: NaiveDate) -> bool {
    invoice.status == InvoiceStatus::Sent
        && invoice.balance().is_positive()
        && today > invoice.due_date
}

/// The status to show for an invoice on `today`.
pub fn display_status(invoice: &Invoice, today: NaiveDate) -> DisplayStatus {
    if is_overdue(invoice, today) {
        return DisplayStatus::Overdue;
    }

    match invoice.status {
        InvoiceStatus::Draft => DisplayStatus::Draft,
        InvoiceStatus::Sent => DisplayStatus::Sent,
        InvoiceStatus::Paid => DisplayStatus::Paid,
        InvoiceStatus::Cancelled => DisplayStatus::Cancelled,
    }
}

/// Whole days between the due date and `today`; zero when not yet due.
pub fn days_past_due(due_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - due_date).num_days().max(0)
}

/// `issue_date + due_days`, saturating at the last representable date.
pub fn default_due_date(issue_date: NaiveDate, due_days: u32) -> NaiveDate {
    issue_date
        .checked_add_days(Days::new(u64::from(due_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Formats an invoice number as `PREFIX-YYYY-NNNNN`.
///
/// ## Example
/// ```rust
/// use tally_core::lifecycle::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 2024, 42), "INV-2024-00042");
/// ```
pub fn format_invoice_number(prefix: &str, year: i32, sequence: u32) -> String {
    format!("{prefix}-{year:04}-{sequence:05}")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    pub(crate) fn test_invoice(
        number: &str,
        status: InvoiceStatus,
        total: Money,
        paid: Money,
        due_date: NaiveDate,
    ) -> Invoice {
        Invoice {
            id: format!("inv-{number}"),
            invoice_number: number.to_string(),
            client_id: "client-1".to_string(),
            issue_date: due_date - Days::new(30),
            due_date,
            status,
            subtotal: total,
            discount_amount: Money::zero(),
            tax_amount: Money::zero(),
            total_amount: total,
            amount_paid: paid,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_allowed_transitions() {
        use InvoiceStatus::*;

        assert!(Draft.can_transition_to(Sent));
        assert!(Draft.can_transition_to(Paid));
        assert!(Sent.can_transition_to(Paid));
        assert!(Draft.can_transition_to(Cancelled));
        assert!(Sent.can_transition_to(Cancelled));
    }

    #[test]
    fn test_rejected_transitions() {
        use InvoiceStatus::*;

        assert!(!Paid.can_transition_to(Sent));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Draft));
        assert!(!Cancelled.can_transition_to(Cancelled));
        assert!(!Sent.can_transition_to(Draft));
        assert!(!Sent.can_transition_to(Sent));

        let err = transition(Paid, Sent).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_display_status_overdue_is_derived() {
        let due = date("2024-03-01");
        let inv = test_invoice("INV-1", InvoiceStatus::Sent, Money::new(dec!(100)), Money::zero(), due);

        assert_eq!(display_status(&inv, date("2024-03-01")), DisplayStatus::Sent);
        assert_eq!(display_status(&inv, date("2024-03-02")), DisplayStatus::Overdue);
    }

    #[test]
    fn test_display_status_not_overdue_when_settled_or_draft() {
        let due = date("2024-03-01");
        let later = date("2024-06-01");

        let settled = test_invoice(
            "INV-1",
            InvoiceStatus::Sent,
            Money::new(dec!(100)),
            Money::new(dec!(100)),
            due,
        );
        assert_eq!(display_status(&settled, later), DisplayStatus::Sent);

        let draft = test_invoice("INV-2", InvoiceStatus::Draft, Money::new(dec!(100)), Money::zero(), due);
        assert_eq!(display_status(&draft, later), DisplayStatus::Draft);

        let paid = test_invoice("INV-3", InvoiceStatus::Paid, Money::new(dec!(100)), Money::zero(), due);
        assert_eq!(display_status(&paid, later), DisplayStatus::Paid);
    }

    #[test]
    fn test_default_due_date() {
        assert_eq!(default_due_date(date("2024-01-31"), 30), date("2024-03-01"));
        assert_eq!(default_due_date(date("2024-01-31"), 0), date("2024-01-31"));
    }

    #[test]
    fn test_days_past_due() {
        assert_eq!(days_past_due(date("2024-03-01"), date("2024-03-31")), 30);
        assert_eq!(days_past_due(date("2024-03-01"), date("2024-02-01")), 0);
    }

    #[test]
    fn test_format_invoice_number() {
        assert_eq!(format_invoice_number("INV", 2024, 1), "INV-2024-00001");
        assert_eq!(format_invoice_number("TLY", 2025, 123456), "TLY-2025-123456");
    }
}
