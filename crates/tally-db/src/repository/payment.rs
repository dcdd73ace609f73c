//! # Payment Repository
//!
//! Recording client payments and allocating them to invoices.
//!
//! ## Recording Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_for_invoice / record_bulk                                      │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    load open invoices                                                  │
//! │    apply_payment / allocate_payment   (tally-core, pure)               │
//! │    INSERT payments                                                     │
//! │    INSERT payment_allocations   × each application                     │
//! │    UPDATE invoices              × amount_paid, status                  │
//! │    INSERT notifications         × payment_received / invoice_paid      │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure rolls the whole payment back.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tally_core::notification::for_payment_applications;
use tally_core::payment::{allocate_payment, apply_payment, Allocation, PaymentApplication};
use tally_core::validation::validate_payment_amount;
use tally_core::{Money, Payment, PaymentAllocation, PaymentMethod};
use tracing::{debug, info};
use uuid::Uuid;

use crate::codec;
use crate::error::{DbError, DbResult};
use crate::repository::invoice::{list_open_for_client, record_paid_amount, require_invoice};
use crate::repository::notification::insert_on;

/// Details of a payment being recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentInput {
    pub amount: Money,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
    pub notes: Option<String>,
}

impl PaymentInput {
    pub fn new(amount: Money, method: PaymentMethod, paid_on: NaiveDate) -> Self {
        PaymentInput {
            amount,
            method,
            reference: None,
            paid_on,
            notes: None,
        }
    }

    /// Cheque number, transfer id, etc.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A stored payment and how it was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub allocation: Allocation,
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn payment_from_row(row: &SqliteRow) -> DbResult<Payment> {
    Ok(Payment {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        amount: codec::money(row, "amount")?,
        method: row.try_get("method")?,
        reference: row.try_get("reference")?,
        paid_on: row.try_get("paid_on")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

fn allocation_from_row(row: &SqliteRow) -> DbResult<PaymentAllocation> {
    Ok(PaymentAllocation {
        id: row.try_get("id")?,
        payment_id: row.try_get("payment_id")?,
        invoice_id: row.try_get("invoice_id")?,
        amount: codec::money(row, "amount")?,
    })
}

async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, client_id, amount, method, reference, paid_on, notes, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.client_id)
    .bind(codec::cents(payment.amount))
    .bind(payment.method)
    .bind(&payment.reference)
    .bind(payment.paid_on)
    .bind(&payment.notes)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes allocation rows, invoice balances and notices for `applications`.
async fn apply_on(
    conn: &mut SqliteConnection,
    payment_id: &str,
    applications: &[PaymentApplication],
) -> DbResult<()> {
    for app in applications {
        debug!(
            payment_id = %payment_id,
            invoice_id = %app.invoice_id,
            amount = %app.amount,
            status = %app.status,
            "Applying payment to invoice"
        );

        sqlx::query(
            "INSERT INTO payment_allocations (id, payment_id, invoice_id, amount) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(payment_id)
        .bind(&app.invoice_id)
        .bind(codec::cents(app.amount))
        .execute(&mut *conn)
        .await?;

        record_paid_amount(conn, &app.invoice_id, app.amount_paid, app.status).await?;
    }

    for notice in for_payment_applications(applications) {
        insert_on(conn, &notice).await?;
    }

    Ok(())
}

/// Repository for payments and their allocations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    fn new_payment(client_id: &str, input: &PaymentInput) -> Payment {
        Payment {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            amount: input.amount.round_cents(),
            method: input.method,
            reference: trimmed(&input.reference),
            paid_on: input.paid_on,
            notes: trimmed(&input.notes),
            created_at: Utc::now(),
        }
    }

    /// Records a payment against one invoice.
    ///
    /// The whole amount goes to the invoice, even beyond its balance.
    ///
    /// ## Errors
    /// * `CoreError::InvoiceNotPayable` - the invoice is paid or cancelled
    /// * `Validation` - amount is not positive
    pub async fn record_for_invoice(
        &self,
        invoice_id: &str,
        input: &PaymentInput,
    ) -> DbResult<RecordedPayment> {
        validate_payment_amount(input.amount.round_cents())?;

        let mut tx = self.pool.begin().await?;

        let invoice = require_invoice(&mut tx, invoice_id).await?;
        let payment = Self::new_payment(&invoice.client_id, input);
        let application = apply_payment(&invoice, payment.amount)?;

        debug!(
            id = %payment.id,
            invoice_id = %invoice_id,
            amount = %payment.amount,
            "Recording invoice payment"
        );

        insert_payment(&mut tx, &payment).await?;
        apply_on(&mut tx, &payment.id, std::slice::from_ref(&application)).await?;

        tx.commit().await?;

        info!(
            id = %payment.id,
            invoice_number = %application.invoice_number,
            status = %application.status,
            "Payment recorded"
        );

        Ok(RecordedPayment {
            payment,
            allocation: Allocation {
                applications: vec![application],
                unallocated: Money::zero(),
            },
        })
    }

    /// Records a client payment and spreads it over their open invoices,
    /// oldest due first. Whatever is left stays with the client as credit.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - client doesn't exist
    /// * `Validation` - amount is not positive
    pub async fn record_bulk(
        &self,
        client_id: &str,
        input: &PaymentInput,
    ) -> DbResult<RecordedPayment> {
        let payment = Self::new_payment(client_id, input);
        validate_payment_amount(payment.amount)?;

        let mut tx = self.pool.begin().await?;

        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE id = ?1")
            .bind(client_id)
            .fetch_one(&mut *tx)
            .await?;
        if exists == 0 {
            return Err(DbError::not_found("Client", client_id));
        }

        let open = list_open_for_client(&mut tx, client_id).await?;
        let allocation = allocate_payment(payment.amount, &open)?;

        debug!(
            id = %payment.id,
            client_id = %client_id,
            amount = %payment.amount,
            invoices = allocation.applications.len(),
            "Recording bulk payment"
        );

        insert_payment(&mut tx, &payment).await?;
        apply_on(&mut tx, &payment.id, &allocation.applications).await?;

        tx.commit().await?;

        info!(
            id = %payment.id,
            allocated = %allocation.allocated(),
            unallocated = %allocation.unallocated,
            "Bulk payment recorded"
        );

        Ok(RecordedPayment {
            payment,
            allocation,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payment>> {
        let row = sqlx::query(
            r#"
            SELECT id, client_id, amount, method, reference, paid_on, notes, created_at
            FROM payments WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    /// How a payment was split across invoices.
    pub async fn get_allocations(&self, payment_id: &str) -> DbResult<Vec<PaymentAllocation>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.payment_id, a.invoice_id, a.amount
            FROM payment_allocations a
            JOIN invoices i ON i.id = a.invoice_id
            WHERE a.payment_id = ?1
            ORDER BY i.due_date, i.issue_date, i.invoice_number
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(allocation_from_row).collect()
    }

    /// A client's payments by payment date.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, amount, method, reference, paid_on, notes, created_at
            FROM payments
            WHERE client_id = ?1
            ORDER BY paid_on, created_at
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    /// Payments received from a client that no invoice has absorbed.
    pub async fn client_credit(&self, client_id: &str) -> DbResult<Money> {
        let paid: Money = self
            .list_for_client(client_id)
            .await?
            .iter()
            .map(|p| p.amount)
            .sum();

        let rows = sqlx::query(
            r#"
            SELECT a.amount
            FROM payment_allocations a
            JOIN payments p ON p.id = a.payment_id
            WHERE p.client_id = ?1
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        let mut allocated = Money::zero();
        for row in &rows {
            allocated += codec::money(row, "amount")?;
        }

        Ok((paid - allocated).clamp_non_negative())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
