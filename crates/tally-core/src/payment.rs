//! # Payments
//!
//! Applying money received to invoices.
//!
//! ## Two Entry Points
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_payment(invoice, amount)                                         │
//! │    one invoice, the full amount, may overpay                            │
//! │                                                                         │
//! │  allocate_payment(amount, open_invoices)                                │
//! │    oldest due first:                                                    │
//! │                                                                         │
//! │    amount 250 ──► INV-1 due 01-01 balance 100 ◄── 100                   │
//! │               ──► INV-2 due 01-15 balance 100 ◄── 100                   │
//! │               ──► INV-3 due 02-01 balance 100 ◄──  50                   │
//! │                                                  ─────                  │
//! │                                   unallocated:      0                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Neither function touches storage. The repository writes the returned
//! applications, allocation rows and notifications in one transaction.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Invoice, InvoiceStatus};
use crate::validation::validate_payment_amount;

/// The effect of a payment on one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentApplication {
    pub invoice_id: String,
    pub invoice_number: String,
    /// Amount applied to this invoice.
    pub amount: Money,
    /// `amount_paid` after the application.
    pub amount_paid: Money,
    pub previous_status: InvoiceStatus,
    pub status: InvoiceStatus,
}

impl PaymentApplication {
    /// True when this application moved the invoice to `paid`.
    pub fn settled_invoice(&self) -> bool {
        self.status == InvoiceStatus::Paid && self.previous_status != InvoiceStatus::Paid
    }
}

/// Result of spreading one payment across several invoices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Allocation {
    pub applications: Vec<PaymentApplication>,
    /// Left over after every payable invoice is settled; client credit.
    pub unallocated: Money,
}

impl Allocation {
    pub fn allocated(&self) -> Money {
        self.applications.iter().map(|a| a.amount).sum()
    }
}

fn ensure_payable(invoice: &Invoice) -> CoreResult<()> {
    if !invoice.status.is_open() {
        return Err(CoreError::InvoiceNotPayable {
            invoice_id: invoice.id.clone(),
            status: invoice.status.to_string(),
        });
    }
    Ok(())
}

fn application(invoice: &Invoice, amount: Money) -> PaymentApplication {
    let amount_paid = invoice.amount_paid + amount;
    let status = if amount_paid >= invoice.total_amount {
        InvoiceStatus::Paid
    } else {
        invoice.status
    };

    PaymentApplication {
        invoice_id: invoice.id.clone(),
        invoice_number: invoice.invoice_number.clone(),
        amount,
        amount_paid,
        previous_status: invoice.status,
        status,
    }
}

/// Applies the full `amount` to a single invoice.
///
/// ## Errors
/// - `Validation` if `amount` is not positive
/// - `InvoiceNotPayable` if the invoice is paid or cancelled
pub fn apply_payment(invoice: &Invoice, amount: Money) -> CoreResult<PaymentApplication> {
    validate_payment_amount(amount)?;
    ensure_payable(invoice)?;
    Ok(application(invoice, amount))
}

/// Spreads `amount` over a client's open invoices, oldest due first.
///
/// Invoices that are paid, cancelled or have no balance are skipped. Each
/// invoice receives at most its balance; ties on due date fall back to issue
/// date and then invoice number.
///
/// ## Example
/// ```rust,ignore
/// let allocation = allocate_payment(Money::new(dec!(250)), &open)?;
/// for app in &allocation.applications {
///     println!("{} ← {}", app.invoice_number, app.amount);
/// }
/// ```
pub fn allocate_payment(amount: Money, open_invoices: &[Invoice]) -> CoreResult<Allocation> {
    validate_payment_amount(amount)?;

    let mut candidates: Vec<&Invoice> = open_invoices
        .iter()
        .filter(|inv| inv.status.is_open() && inv.balance().is_positive())
        .collect();
    candidates.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.issue_date.cmp(&b.issue_date))
            .then_with(|| a.invoice_number.cmp(&b.invoice_number))
    });

    let mut remaining = amount;
    let mut applications = Vec::new();

    for invoice in candidates {
        if !remaining.is_positive() {
            break;
        }
        let applied = remaining.min(invoice.balance());
        applications.push(application(invoice, applied));
        remaining -= applied;
    }

    Ok(Allocation {
        applications,
        unallocated: remaining,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::test_invoice;
    use crate::pricing::tests::date;
    use rust_decimal_macros::dec;

    fn sent(number: &str, total: Money, due: &str) -> Invoice {
        test_invoice(number, InvoiceStatus::Sent, total, Money::zero(), date(due))
    }

    #[test]
    fn test_partial_payment_keeps_status() {
        let inv = sent("INV-1", Money::new(dec!(100)), "2024-02-01");
        let app = apply_payment(&inv, Money::new(dec!(40))).unwrap();

        assert_eq!(app.amount_paid, Money::new(dec!(40)));
        assert_eq!(app.status, InvoiceStatus::Sent);
        assert!(!app.settled_invoice());
    }

    #[test]
    fn test_full_payment_marks_paid() {
        let mut inv = sent("INV-1", Money::new(dec!(100)), "2024-02-01");
        inv.amount_paid = Money::new(dec!(60));

        let app = apply_payment(&inv, Money::new(dec!(40))).unwrap();
        assert_eq!(app.status, InvoiceStatus::Paid);
        assert!(app.settled_invoice());
    }

    #[test]
    fn test_single_payment_may_overpay() {
        let inv = sent("INV-1", Money::new(dec!(100)), "2024-02-01");
        let app = apply_payment(&inv, Money::new(dec!(150))).unwrap();
        assert_eq!(app.amount, Money::new(dec!(150)));
        assert_eq!(app.amount_paid, Money::new(dec!(150)));
        assert_eq!(app.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_draft_can_be_paid_directly() {
        let inv = test_invoice(
            "INV-1",
            InvoiceStatus::Draft,
            Money::new(dec!(20)),
            Money::zero(),
            date("2024-02-01"),
        );
        let app = apply_payment(&inv, Money::new(dec!(20))).unwrap();
        assert_eq!(app.previous_status, InvoiceStatus::Draft);
        assert_eq!(app.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_rejects_closed_invoices_and_bad_amounts() {
        let mut inv = sent("INV-1", Money::new(dec!(100)), "2024-02-01");
        assert!(apply_payment(&inv, Money::zero()).is_err());

        inv.status = InvoiceStatus::Cancelled;
        let err = apply_payment(&inv, Money::new(dec!(10))).unwrap_err();
        assert!(matches!(err, CoreError::InvoiceNotPayable { .. }));
    }

    #[test]
    fn test_allocation_oldest_due_first() {
        let invoices = vec![
            sent("INV-3", Money::new(dec!(100)), "2024-02-01"),
            sent("INV-1", Money::new(dec!(100)), "2024-01-01"),
            sent("INV-2", Money::new(dec!(100)), "2024-01-15"),
        ];

        let allocation = allocate_payment(Money::new(dec!(250)), &invoices).unwrap();
        let numbers: Vec<&str> = allocation
            .applications
            .iter()
            .map(|a| a.invoice_number.as_str())
            .collect();

        assert_eq!(numbers, vec!["INV-1", "INV-2", "INV-3"]);
        assert_eq!(allocation.applications[2].amount, Money::new(dec!(50)));
        assert_eq!(allocation.applications[2].status, InvoiceStatus::Sent);
        assert!(allocation.unallocated.is_zero());
        assert_eq!(allocation.allocated(), Money::new(dec!(250)));
    }

    #[test]
    fn test_allocation_never_overshoots() {
        let mut partly_paid = sent("INV-1", Money::new(dec!(100)), "2024-01-01");
        partly_paid.amount_paid = Money::new(dec!(70));
        let invoices = vec![partly_paid, sent("INV-2", Money::new(dec!(50)), "2024-01-10")];

        let allocation = allocate_payment(Money::new(dec!(100)), &invoices).unwrap();

        assert_eq!(allocation.applications[0].amount, Money::new(dec!(30)));
        assert_eq!(allocation.applications[0].amount_paid, Money::new(dec!(100)));
        assert_eq!(allocation.applications[1].amount, Money::new(dec!(50)));
        assert!(allocation.applications.iter().all(|a| a.status == InvoiceStatus::Paid));
        assert_eq!(allocation.unallocated, Money::new(dec!(20)));
    }

    #[test]
    fn test_allocation_skips_closed_and_settled() {
        let mut paid = sent("INV-1", Money::new(dec!(100)), "2024-01-01");
        paid.status = InvoiceStatus::Paid;
        let mut cancelled = sent("INV-2", Money::new(dec!(100)), "2024-01-02");
        cancelled.status = InvoiceStatus::Cancelled;
        let mut settled = sent("INV-3", Money::new(dec!(100)), "2024-01-03");
        settled.amount_paid = Money::new(dec!(100));
        let open = sent("INV-4", Money::new(dec!(100)), "2024-01-04");

        let allocation =
            allocate_payment(Money::new(dec!(10)), &[paid, cancelled, settled, open]).unwrap();
        assert_eq!(allocation.applications.len(), 1);
        assert_eq!(allocation.applications[0].invoice_number, "INV-4");
    }

    #[test]
    fn test_allocation_tie_breaks() {
        let a = sent("INV-B", Money::new(dec!(10)), "2024-01-01");
        let b = sent("INV-A", Money::new(dec!(10)), "2024-01-01");

        let allocation = allocate_payment(Money::new(dec!(10)), &[a, b]).unwrap();
        assert_eq!(allocation.applications[0].invoice_number, "INV-A");
    }

    #[test]
    fn test_allocation_with_nothing_open() {
        let allocation = allocate_payment(Money::new(dec!(75)), &[]).unwrap();
        assert!(allocation.applications.is_empty());
        assert_eq!(allocation.unallocated, Money::new(dec!(75)));
    }
}
