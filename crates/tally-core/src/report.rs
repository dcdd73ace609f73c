//! # Reports
//!
//! Client statements and receivables aging, computed from invoices already
//! loaded by the caller.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::lifecycle::{days_past_due, display_status, is_overdue};
use crate::money::Money;
use crate::types::{DisplayStatus, Invoice, InvoiceStatus};

// =============================================================================
// Client Statement
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatementLine {
    pub invoice_id: String,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total: Money,
    pub paid: Money,
    pub balance: Money,
    pub status: DisplayStatus,
}

/// Everything a client has been billed, as of one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientStatement {
    pub client_id: String,
    pub as_of: NaiveDate,
    pub lines: Vec<StatementLine>,
    pub total_invoiced: Money,
    pub total_paid: Money,
    /// Sum of positive balances. Overpayments do not offset other invoices.
    pub total_outstanding: Money,
    pub total_overdue: Money,
}

/// Builds a statement from the client's issued invoices.
///
/// Drafts and cancelled invoices are left out. Invoices belonging to other
/// clients are ignored, so callers may pass an unfiltered list.
pub fn client_statement(client_id: &str, invoices: &[Invoice], as_of: NaiveDate) -> ClientStatement {
    let mut issued: Vec<&Invoice> = invoices
        .iter()
        .filter(|inv| inv.client_id == client_id)
        .filter(|inv| !matches!(inv.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled))
        .collect();
    issued.sort_by(|a, b| {
        a.issue_date
            .cmp(&b.issue_date)
            .then_with(|| a.invoice_number.cmp(&b.invoice_number))
    });

    let mut statement = ClientStatement {
        client_id: client_id.to_string(),
        as_of,
        lines: Vec::with_capacity(issued.len()),
        total_invoiced: Money::zero(),
        total_paid: Money::zero(),
        total_outstanding: Money::zero(),
        total_overdue: Money::zero(),
    };

    for inv in issued {
        statement.total_invoiced += inv.total_amount;
        statement.total_paid += inv.amount_paid;
        statement.total_outstanding += inv.outstanding();
        if is_overdue(inv, as_of) {
            statement.total_overdue += inv.outstanding();
        }

        statement.lines.push(StatementLine {
            invoice_id: inv.id.clone(),
            invoice_number: inv.invoice_number.clone(),
            issue_date: inv.issue_date,
            due_date: inv.due_date,
            total: inv.total_amount,
            paid: inv.amount_paid,
            balance: inv.balance(),
            status: display_status(inv, as_of),
        });
    }

    statement
}

// =============================================================================
// Aging
// =============================================================================

/// Days-past-due bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBucket {
    pub fn for_days_past_due(days: i64) -> Self {
        match days {
            i64::MIN..=0 => AgingBucket::Current,
            1..=30 => AgingBucket::Days1To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "Current",
            AgingBucket::Days1To30 => "1-30 days",
            AgingBucket::Days31To60 => "31-60 days",
            AgingBucket::Days61To90 => "61-90 days",
            AgingBucket::Over90 => "Over 90 days",
        }
    }
}

/// Outstanding amounts per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgingBuckets {
    pub current: Money,
    pub days_1_30: Money,
    pub days_31_60: Money,
    pub days_61_90: Money,
    pub over_90: Money,
}

impl AgingBuckets {
    pub fn add(&mut self, bucket: AgingBucket, amount: Money) {
        let slot = match bucket {
            AgingBucket::Current => &mut self.current,
            AgingBucket::Days1To30 => &mut self.days_1_30,
            AgingBucket::Days31To60 => &mut self.days_31_60,
            AgingBucket::Days61To90 => &mut self.days_61_90,
            AgingBucket::Over90 => &mut self.over_90,
        };
        *slot += amount;
    }

    pub fn get(&self, bucket: AgingBucket) -> Money {
        match bucket {
            AgingBucket::Current => self.current,
            AgingBucket::Days1To30 => self.days_1_30,
            AgingBucket::Days31To60 => self.days_31_60,
            AgingBucket::Days61To90 => self.days_61_90,
            AgingBucket::Over90 => self.over_90,
        }
    }

    pub fn total(&self) -> Money {
        self.current + self.days_1_30 + self.days_31_60 + self.days_61_90 + self.over_90
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientAging {
    pub client_id: String,
    pub buckets: AgingBuckets,
}

/// Receivables aging across all clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgingReport {
    pub as_of: NaiveDate,
    /// Sorted by client id.
    pub clients: Vec<ClientAging>,
    pub totals: AgingBuckets,
}

/// Buckets the outstanding balance of every sent invoice by days past due.
pub fn aging_report(invoices: &[Invoice], as_of: NaiveDate) -> AgingReport {
    let mut per_client: BTreeMap<&str, AgingBuckets> = BTreeMap::new();
    let mut totals = AgingBuckets::default();

    for inv in invoices {
        if inv.status != InvoiceStatus::Sent || !inv.balance().is_positive() {
            continue;
        }

        let bucket = AgingBucket::for_days_past_due(days_past_due(inv.due_date, as_of));
        let outstanding = inv.outstanding();

        per_client
            .entry(inv.client_id.as_str())
            .or_default()
            .add(bucket, outstanding);
        totals.add(bucket, outstanding);
    }

    AgingReport {
        as_of,
        clients: per_client
            .into_iter()
            .map(|(client_id, buckets)| ClientAging {
                client_id: client_id.to_string(),
                buckets,
            })
            .collect(),
        totals,
    }
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

    fn sent(number: &str, total: Money, paid: Money, due: &str) -> Invoice {
        test_invoice(number, InvoiceStatus::Sent, total, paid, date(due))
    }

    #[test]
    fn test_statement_totals() {
        let mut draft = sent("INV-0", Money::new(dec!(999)), Money::zero(), "2024-01-01");
        draft.status = InvoiceStatus::Draft;
        let mut other_client = sent("INV-9", Money::new(dec!(500)), Money::zero(), "2024-01-01");
        other_client.client_id = "client-2".to_string();

        let invoices = vec![
            sent("INV-2", Money::new(dec!(200)), Money::new(dec!(50)), "2024-03-01"),
            sent("INV-1", Money::new(dec!(100)), Money::zero(), "2024-01-31"),
            draft,
            other_client,
        ];

        let st = client_statement("client-1", &invoices, date("2024-02-15"));

        assert_eq!(st.lines.len(), 2);
        assert_eq!(st.lines[0].invoice_number, "INV-1");
        assert_eq!(st.lines[0].status, DisplayStatus::Overdue);
        assert_eq!(st.lines[1].status, DisplayStatus::Sent);
        assert_eq!(st.total_invoiced, Money::new(dec!(300)));
        assert_eq!(st.total_paid, Money::new(dec!(50)));
        assert_eq!(st.total_outstanding, Money::new(dec!(250)));
        assert_eq!(st.total_overdue, Money::new(dec!(100)));
    }

    #[test]
    fn test_statement_overpayment_shows_negative_balance() {
        let mut paid = sent("INV-1", Money::new(dec!(100)), Money::new(dec!(120)), "2024-01-31");
        paid.status = InvoiceStatus::Paid;

        let st = client_statement("client-1", &[paid], date("2024-02-15"));
        assert_eq!(st.lines[0].balance, Money::new(dec!(-20)));
        assert!(st.total_outstanding.is_zero());
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(AgingBucket::for_days_past_due(0), AgingBucket::Current);
        assert_eq!(AgingBucket::for_days_past_due(1), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::for_days_past_due(30), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::for_days_past_due(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::for_days_past_due(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::for_days_past_due(91), AgingBucket::Over90);
    }

    #[test]
    fn test_aging_report() {
        let mut other = sent("INV-4", Money::new(dec!(40)), Money::zero(), "2023-10-01");
        other.client_id = "client-2".to_string();
        let mut cancelled = sent("INV-5", Money::new(dec!(70)), Money::zero(), "2023-10-01");
        cancelled.status = InvoiceStatus::Cancelled;

        let invoices = vec![
            sent("INV-1", Money::new(dec!(100)), Money::zero(), "2024-03-15"),
            sent("INV-2", Money::new(dec!(100)), Money::new(dec!(25)), "2024-02-20"),
            sent("INV-3", Money::new(dec!(60)), Money::zero(), "2023-12-15"),
            other,
            cancelled,
        ];

        let report = aging_report(&invoices, date("2024-03-01"));

        assert_eq!(report.totals.current, Money::new(dec!(100)));
        assert_eq!(report.totals.days_1_30, Money::new(dec!(75)));
        assert_eq!(report.totals.days_61_90, Money::new(dec!(60)));
        assert_eq!(report.totals.over_90, Money::new(dec!(40)));
        assert_eq!(report.totals.total(), Money::new(dec!(275)));

        assert_eq!(report.clients.len(), 2);
        assert_eq!(report.clients[0].client_id, "client-1");
        assert_eq!(report.clients[0].buckets.get(AgingBucket::Over90), Money::zero());
        assert_eq!(report.clients[1].buckets.over_90, Money::new(dec!(40)));
    }
}
