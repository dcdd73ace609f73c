//! # Notifications
//!
//! In-app notices raised by invoice and payment events.
//!
//! Builders only create values. The repository stores them in the same
//! transaction as the event that raised them, so a notice exists if and only
//! if its event was committed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::lifecycle::{days_past_due, is_overdue};
use crate::payment::PaymentApplication;
use crate::types::{Invoice, InvoiceStatus};

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    InvoiceSent,
    PaymentReceived,
    InvoicePaid,
    InvoiceOverdue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub invoice_id: Option<String>,
    pub is_read: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        invoice_id: Option<String>,
    ) -> Self {
        Notification {
            id: Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            message: message.into(),
            invoice_id,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// Notice for a manual status change, if that status warrants one.
pub fn for_status_change(invoice: &Invoice, new_status: InvoiceStatus) -> Option<Notification> {
    match new_status {
        InvoiceStatus::Sent => Some(Notification::new(
            NotificationKind::InvoiceSent,
            "Invoice sent",
            format!(
                "Invoice {} for {} was sent, due {}",
                invoice.invoice_number, invoice.total_amount, invoice.due_date
            ),
            Some(invoice.id.clone()),
        )),
        InvoiceStatus::Paid => Some(Notification::new(
            NotificationKind::InvoicePaid,
            "Invoice paid",
            format!("Invoice {} was marked paid", invoice.invoice_number),
            Some(invoice.id.clone()),
        )),
        InvoiceStatus::Draft | InvoiceStatus::Cancelled => None,
    }
}

/// One `payment_received` per application, plus `invoice_paid` for each
/// invoice the payment settled.
pub fn for_payment_applications(applications: &[PaymentApplication]) -> Vec<Notification> {
    let mut notices = Vec::with_capacity(applications.len());

    for app in applications {
        notices.push(Notification::new(
            NotificationKind::PaymentReceived,
            "Payment received",
            format!("{} applied to invoice {}", app.amount, app.invoice_number),
            Some(app.invoice_id.clone()),
        ));

        if app.settled_invoice() {
            notices.push(Notification::new(
                NotificationKind::InvoicePaid,
                "Invoice paid",
                format!("Invoice {} is fully paid", app.invoice_number),
                Some(app.invoice_id.clone()),
            ));
        }
    }

    notices
}

/// One reminder per invoice that is overdue on `today`.
pub fn overdue_reminders(invoices: &[Invoice], today: NaiveDate) -> Vec<Notification> {
    invoices
        .iter()
        .filter(|inv| is_overdue(inv, today))
        .map(|inv| {
            Notification::new(
                NotificationKind::InvoiceOverdue,
                "Invoice overdue",
                format!(
                    "Invoice {} is {} days overdue with {} outstanding",
                    inv.invoice_number,
                    days_past_due(inv.due_date, today),
                    inv.outstanding()
                ),
                Some(inv.id.clone()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::tests::test_invoice;
    use crate::money::Money;
    use crate::payment::allocate_payment;
    use crate::pricing::tests::date;
    use rust_decimal_macros::dec;

    fn sent(number: &str, total: Money, due: &str) -> Invoice {
        test_invoice(number, InvoiceStatus::Sent, total, Money::zero(), date(due))
    }

    #[test]
    fn test_status_change_notices() {
        let inv = sent("INV-2024-00001", Money::new(dec!(170.1)), "2024-02-01");

        let notice = for_status_change(&inv, InvoiceStatus::Sent).unwrap();
        assert_eq!(notice.kind, NotificationKind::InvoiceSent);
        assert_eq!(
            notice.message,
            "Invoice INV-2024-00001 for 170.10 was sent, due 2024-02-01"
        );
        assert!(!notice.is_read);

        assert!(for_status_change(&inv, InvoiceStatus::Cancelled).is_none());
    }

    #[test]
    fn test_payment_notices() {
        let invoices = vec![
            sent("INV-1", Money::new(dec!(100)), "2024-01-01"),
            sent("INV-2", Money::new(dec!(100)), "2024-02-01"),
        ];
        let allocation = allocate_payment(Money::new(dec!(150)), &invoices).unwrap();

        let notices = for_payment_applications(&allocation.applications);
        let kinds: Vec<NotificationKind> = notices.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::PaymentReceived,
                NotificationKind::InvoicePaid,
                NotificationKind::PaymentReceived,
            ]
        );
        assert_eq!(notices[2].message, "50.00 applied to invoice INV-2");
    }

    #[test]
    fn test_overdue_reminders() {
        let mut paid = sent("INV-2", Money::new(dec!(10)), "2024-01-01");
        paid.status = InvoiceStatus::Paid;
        let invoices = vec![
            sent("INV-1", Money::new(dec!(80)), "2024-01-01"),
            paid,
            sent("INV-3", Money::new(dec!(10)), "2024-03-01"),
        ];

        let reminders = overdue_reminders(&invoices, date("2024-01-11"));
        assert_eq!(reminders.len(), 1);
        assert_eq!(
            reminders[0].message,
            "Invoice INV-1 is 10 days overdue with 80.00 outstanding"
        );
        assert_eq!(reminders[0].invoice_id.as_deref(), Some("inv-INV-1"));
    }
}
