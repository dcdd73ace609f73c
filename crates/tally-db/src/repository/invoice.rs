//! # Invoice Repository
//!
//! Database operations for invoices and invoice items.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                                 │
//! │                                                                         │
//! │  1. COMPOSE (tally-core, no I/O)                                       │
//! │     └── InvoiceDraft::new() → add_line() → set_invoice_rate() ...      │
//! │                                                                         │
//! │  2. CREATE                                                             │
//! │     └── create_from_draft() → Invoice { status: Draft }                │
//! │         (number + invoice + items in one transaction)                  │
//! │                                                                         │
//! │  3. EDIT (draft or sent only)                                          │
//! │     └── load_draft() → reducers → update_from_draft()                  │
//! │         (stored unit prices are kept, never re-resolved)               │
//! │                                                                         │
//! │  4. SEND / PAY / CANCEL                                                │
//! │     └── set_status() → transition checked, notification written        │
//! │         in the same transaction                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invoice Numbers
//! `PREFIX-YYYY-NNNNN`, sequential per issue year. The sequence row is bumped
//! inside the creating transaction, so a rolled-back create leaves no gap.

use chrono::{Datelike, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tally_core::lifecycle::{format_invoice_number, transition};
use tally_core::notification::for_status_change;
use tally_core::report::{aging_report, client_statement, AgingReport, ClientStatement};
use tally_core::{
    CoreError, Invoice, InvoiceDraft, InvoiceStatus, Money, ResolvedLineItem, ValidationError,
};
use tracing::{debug, info};

use crate::codec;
use crate::error::{DbError, DbResult};
use crate::repository::notification::insert_on;

const INVOICE_COLUMNS: &str = r#"
    id, invoice_number, client_id, issue_date, due_date, status,
    subtotal, discount_amount, tax_amount, total_amount, amount_paid,
    notes, created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, invoice_id, product_id, description, quantity, unit_price, tax_rate,
    discount, bird_count, per_bird_adjustment, line_total, position
"#;

fn invoice_from_row(row: &SqliteRow) -> DbResult<Invoice> {
    Ok(Invoice {
        id: row.try_get("id")?,
        invoice_number: row.try_get("invoice_number")?,
        client_id: row.try_get("client_id")?,
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        status: row.try_get("status")?,
        subtotal: codec::money(row, "subtotal")?,
        discount_amount: codec::money(row, "discount_amount")?,
        tax_amount: codec::money(row, "tax_amount")?,
        total_amount: codec::money(row, "total_amount")?,
        amount_paid: codec::money(row, "amount_paid")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn item_from_row(row: &SqliteRow) -> DbResult<ResolvedLineItem> {
    Ok(ResolvedLineItem {
        id: row.try_get("id")?,
        invoice_id: row.try_get("invoice_id")?,
        product_id: row.try_get("product_id")?,
        description: row.try_get("description")?,
        quantity: codec::decimal(row, "quantity")?,
        unit_price: codec::money(row, "unit_price")?,
        tax_rate: codec::percent(row, "tax_rate")?,
        discount: codec::percent(row, "discount")?,
        bird_count: row.try_get("bird_count")?,
        per_bird_adjustment: codec::opt_money(row, "per_bird_adjustment")?,
        line_total: codec::money(row, "line_total")?,
        position: row.try_get("position")?,
    })
}

// =============================================================================
// Connection-level helpers (shared with the payment repository)
// =============================================================================

pub(crate) async fn fetch_invoice(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    row.as_ref().map(invoice_from_row).transpose()
}

pub(crate) async fn require_invoice(conn: &mut SqliteConnection, id: &str) -> DbResult<Invoice> {
    fetch_invoice(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", id))
}

/// Sent invoices across all clients, oldest due first.
pub(crate) async fn list_sent_invoices(conn: &mut SqliteConnection) -> DbResult<Vec<Invoice>> {
    let sql = format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = ?1 ORDER BY due_date, invoice_number"
    );
    let rows = sqlx::query(&sql)
        .bind(InvoiceStatus::Sent)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(invoice_from_row).collect()
}

/// A client's draft and sent invoices, the ones a payment can go to.
pub(crate) async fn list_open_for_client(
    conn: &mut SqliteConnection,
    client_id: &str,
) -> DbResult<Vec<Invoice>> {
    let sql = format!(
        r#"
        SELECT {INVOICE_COLUMNS} FROM invoices
        WHERE client_id = ?1 AND status IN (?2, ?3)
        ORDER BY due_date, issue_date, invoice_number
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(client_id)
        .bind(InvoiceStatus::Draft)
        .bind(InvoiceStatus::Sent)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(invoice_from_row).collect()
}

/// Writes a new paid amount and status after a payment.
pub(crate) async fn record_paid_amount(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    amount_paid: Money,
    status: InvoiceStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE invoices SET amount_paid = ?2, status = ?3, updated_at = ?4 WHERE id = ?1")
        .bind(invoice_id)
        .bind(codec::cents(amount_paid))
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn next_number_on(conn: &mut SqliteConnection, prefix: &str, year: i32) -> DbResult<String> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO invoice_sequences (year, last_value) VALUES (?1, 1)
        ON CONFLICT(year) DO UPDATE SET last_value = last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(year)
    .fetch_one(&mut *conn)
    .await?;

    let sequence = u32::try_from(value)
        .map_err(|_| DbError::Internal(format!("invoice sequence for {year} overflowed")))?;

    Ok(format_invoice_number(prefix, year, sequence))
}

async fn insert_items(conn: &mut SqliteConnection, items: &[ResolvedLineItem]) -> DbResult<()> {
    for item in items {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, product_id, description, quantity, unit_price,
                tax_rate, discount, bird_count, per_bird_adjustment, line_total, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.invoice_id)
        .bind(&item.product_id)
        .bind(&item.description)
        .bind(codec::decimal_text(item.quantity))
        .bind(codec::exact(item.unit_price))
        .bind(codec::rate(item.tax_rate))
        .bind(codec::rate(item.discount))
        .bind(item.bird_count)
        .bind(item.per_bird_adjustment.map(codec::exact))
        .bind(codec::cents(item.line_total))
        .bind(item.position)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn ensure_has_lines(draft: &InvoiceDraft) -> DbResult<()> {
    if draft.is_empty() {
        return Err(ValidationError::Required {
            field: "line items".to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
    prefix: String,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository numbering invoices with `prefix`.
    pub fn new(pool: SqlitePool, prefix: impl Into<String>) -> Self {
        InvoiceRepository {
            pool,
            prefix: prefix.into(),
        }
    }

    /// Takes the next invoice number for `year`.
    ///
    /// The number is consumed even if no invoice is saved with it.
    pub async fn next_invoice_number(&self, year: i32) -> DbResult<String> {
        let mut conn = self.pool.acquire().await?;
        next_number_on(&mut conn, &self.prefix, year).await
    }

    /// Saves a new invoice from a draft, in status `draft`.
    ///
    /// ## What This Does
    /// 1. Freezes the draft (line totals and totals rounded to cents)
    /// 2. Allocates the next number for the issue year
    /// 3. Inserts the invoice and its items
    ///
    /// All in one transaction.
    ///
    /// ## Errors
    /// * `Validation` - the draft has no lines
    /// * `ForeignKeyViolation` - the client doesn't exist
    pub async fn create_from_draft(&self, draft: &InvoiceDraft) -> DbResult<Invoice> {
        ensure_has_lines(draft)?;
        let resolved = draft.resolve();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let invoice_number =
            next_number_on(&mut tx, &self.prefix, resolved.issue_date.year()).await?;

        let invoice = Invoice {
            id: resolved.invoice_id.clone(),
            invoice_number,
            client_id: resolved.client_id.clone(),
            issue_date: resolved.issue_date,
            due_date: resolved.due_date,
            status: InvoiceStatus::Draft,
            subtotal: resolved.totals.subtotal,
            discount_amount: resolved.totals.discount_amount,
            tax_amount: resolved.totals.tax_amount,
            total_amount: resolved.totals.total_amount,
            amount_paid: Money::zero(),
            notes: resolved.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            client_id = %invoice.client_id,
            lines = resolved.items.len(),
            total = %invoice.total_amount,
            "Creating invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, client_id, issue_date, due_date, status,
                subtotal, discount_amount, tax_amount, total_amount, amount_paid,
                notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.client_id)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.status)
        .bind(codec::cents(invoice.subtotal))
        .bind(codec::cents(invoice.discount_amount))
        .bind(codec::cents(invoice.tax_amount))
        .bind(codec::cents(invoice.total_amount))
        .bind(codec::cents(invoice.amount_paid))
        .bind(&invoice.notes)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, &resolved.items).await?;

        tx.commit().await?;

        info!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Replaces an invoice's dates, notes, items and totals with a draft's.
    ///
    /// Status and amount paid are kept.
    ///
    /// ## Errors
    /// * `CoreError::InvoiceLocked` - the invoice is paid or cancelled
    /// * `DbError::NotFound` - no invoice with the draft's id
    pub async fn update_from_draft(&self, draft: &InvoiceDraft) -> DbResult<Invoice> {
        ensure_has_lines(draft)?;
        let resolved = draft.resolve();

        let mut tx = self.pool.begin().await?;

        let existing = require_invoice(&mut tx, &resolved.invoice_id).await?;
        if existing.status.is_terminal() {
            return Err(CoreError::InvoiceLocked {
                invoice_id: existing.id,
                status: existing.status.to_string(),
            }
            .into());
        }

        let invoice = Invoice {
            issue_date: resolved.issue_date,
            due_date: resolved.due_date,
            subtotal: resolved.totals.subtotal,
            discount_amount: resolved.totals.discount_amount,
            tax_amount: resolved.totals.tax_amount,
            total_amount: resolved.totals.total_amount,
            notes: resolved.notes.clone(),
            updated_at: Utc::now(),
            ..existing
        };

        debug!(
            id = %invoice.id,
            lines = resolved.items.len(),
            total = %invoice.total_amount,
            "Updating invoice from draft"
        );

        sqlx::query(
            r#"
            UPDATE invoices SET
                issue_date = ?2,
                due_date = ?3,
                subtotal = ?4,
                discount_amount = ?5,
                tax_amount = ?6,
                total_amount = ?7,
                notes = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&invoice.id)
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(codec::cents(invoice.subtotal))
        .bind(codec::cents(invoice.discount_amount))
        .bind(codec::cents(invoice.tax_amount))
        .bind(codec::cents(invoice.total_amount))
        .bind(&invoice.notes)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(&invoice.id)
            .execute(&mut *tx)
            .await?;

        insert_items(&mut tx, &resolved.items).await?;

        tx.commit().await?;

        Ok(invoice)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice(&mut conn, id).await
    }

    /// Items of an invoice in line order.
    pub async fn get_items(&self, invoice_id: &str) -> DbResult<Vec<ResolvedLineItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ?1 ORDER BY position"
        );
        let rows = sqlx::query(&sql)
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(item_from_row).collect()
    }

    /// Rebuilds an edit draft from a saved invoice.
    ///
    /// ## Errors
    /// * `CoreError::InvoiceLocked` - the invoice is paid or cancelled
    pub async fn load_draft(&self, id: &str) -> DbResult<InvoiceDraft> {
        let invoice = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;
        let items = self.get_items(id).await?;

        Ok(InvoiceDraft::from_persisted(&invoice, &items)?)
    }

    /// A client's invoices by issue date.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE client_id = ?1 ORDER BY issue_date, invoice_number"
        );
        let rows = sqlx::query(&sql)
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(invoice_from_row).collect()
    }

    /// Every invoice, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY issue_date DESC, invoice_number DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(invoice_from_row).collect()
    }

    /// Moves an invoice to `status` and records the matching notification.
    ///
    /// ## Errors
    /// * `CoreError::InvalidStatusTransition` - e.g. leaving `paid`
    pub async fn set_status(&self, id: &str, status: InvoiceStatus) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let existing = require_invoice(&mut tx, id).await?;
        let status = transition(existing.status, status)?;

        debug!(
            id = %id,
            from = %existing.status,
            to = %status,
            "Changing invoice status"
        );

        let invoice = Invoice {
            status,
            updated_at: Utc::now(),
            ..existing
        };

        sqlx::query("UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&invoice.id)
            .bind(invoice.status)
            .bind(invoice.updated_at)
            .execute(&mut *tx)
            .await?;

        if let Some(notice) = for_status_change(&invoice, status) {
            insert_on(&mut tx, &notice).await?;
        }

        tx.commit().await?;

        Ok(invoice)
    }

    /// Statement of a client's issued invoices as of a date.
    pub async fn statement(&self, client_id: &str, as_of: NaiveDate) -> DbResult<ClientStatement> {
        let invoices = self.list_for_client(client_id).await?;
        Ok(client_statement(client_id, &invoices, as_of))
    }

    /// Outstanding balances of sent invoices bucketed by days past due.
    pub async fn aging(&self, as_of: NaiveDate) -> DbResult<AgingReport> {
        let mut conn = self.pool.acquire().await?;
        let invoices = list_sent_invoices(&mut conn).await?;
        Ok(aging_report(&invoices, as_of))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{date, seed_client, seed_product, test_db};
    use rust_decimal_macros::dec;
    use tally_core::notification::NotificationKind;
    use tally_core::{DisplayStatus, DraftLineItem, InvoiceRate, PerBirdPricing, Percent, PriceRule};

    async fn two_line_draft(db: &crate::Database) -> InvoiceDraft {
        let client = seed_client(db, "Ahmed Poultry", dec!(0.5)).await;
        let product = seed_product(db, "Broiler", dec!(200), dec!(190)).await;
        db.pricing_rules()
            .upsert(
                &client.id,
                &product.id,
                None,
                PriceRule::DiscountPercentage(Percent::new(dec!(10))),
            )
            .await
            .unwrap();

        let inputs = db.pricing_inputs(&client.id).await.unwrap();
        let issue = date("2024-03-10");
        let ctx = inputs.context(issue);

        InvoiceDraft::new(&inputs.client, issue)
            .add_line(DraftLineItem::for_product(
                &ctx,
                &product,
                dec!(3),
                PerBirdPricing::enabled(4),
            ))
            .unwrap()
            .add_line(DraftLineItem::custom(
                "Delivery",
                dec!(1),
                Money::new(dec!(25)),
                Percent::zero(),
            ))
            .unwrap()
            .set_invoice_rate(InvoiceRate::Tax, Percent::new(dec!(5)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential_per_year() {
        let db = test_db().await;
        let repo = db.invoices();

        assert_eq!(repo.next_invoice_number(2024).await.unwrap(), "INV-2024-00001");
        assert_eq!(repo.next_invoice_number(2024).await.unwrap(), "INV-2024-00002");
        assert_eq!(repo.next_invoice_number(2025).await.unwrap(), "INV-2025-00001");
    }

    #[tokio::test]
    async fn test_create_from_draft_persists_snapshot() {
        let db = test_db().await;
        let draft = two_line_draft(&db).await;
        let invoice = db.invoices().create_from_draft(&draft).await.unwrap();

        assert_eq!(invoice.invoice_number, "INV-2024-00001");
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.due_date, date("2024-04-09"));

        // paper 190 less 10% = 171, plus 4 birds at 0.5 = 173 per unit
        let items = db.invoices().get_items(&invoice.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price, Money::new(dec!(173)));
        assert_eq!(items[0].bird_count, Some(4));
        assert_eq!(items[0].per_bird_adjustment, Some(Money::new(dec!(2))));
        assert_eq!(items[0].line_total, Money::new(dec!(519)));
        assert_eq!(items[1].bird_count, None);
        assert_eq!(items[1].position, 1);

        // 519 + 25 = 544, tax 5% = 27.20
        assert_eq!(invoice.subtotal, Money::new(dec!(544)));
        assert_eq!(invoice.tax_amount, Money::new(dec!(27.20)));
        assert_eq!(invoice.total_amount, Money::new(dec!(571.20)));

        let stored = db.invoices().get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.total_amount, invoice.total_amount);
        assert_eq!(stored.invoice_number, invoice.invoice_number);
    }

    #[tokio::test]
    async fn test_empty_draft_rejected() {
        let db = test_db().await;
        let client = seed_client(&db, "Ahmed Poultry", dec!(0)).await;
        let draft = InvoiceDraft::new(&client, date("2024-03-10"));

        let err = db.invoices().create_from_draft(&draft).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_edit_keeps_stored_prices() {
        let db = test_db().await;
        let draft = two_line_draft(&db).await;
        let invoice = db.invoices().create_from_draft(&draft).await.unwrap();

        // a later rule change must not reprice the saved invoice
        let client_id = invoice.client_id.clone();
        let product_id = db.invoices().get_items(&invoice.id).await.unwrap()[0]
            .product_id
            .clone()
            .unwrap();
        db.pricing_rules()
            .upsert(&client_id, &product_id, None, PriceRule::Multiplier(dec!(2)))
            .await
            .unwrap();

        let loaded = db.invoices().load_draft(&invoice.id).await.unwrap();
        assert_eq!(loaded.rates().tax_percent, Percent::new(dec!(5)));

        let edited = loaded.remove_line(1).unwrap();
        let updated = db.invoices().update_from_draft(&edited).await.unwrap();

        assert_eq!(updated.invoice_number, invoice.invoice_number);
        assert_eq!(updated.subtotal, Money::new(dec!(519)));
        assert_eq!(updated.tax_amount, Money::new(dec!(25.95)));
        assert_eq!(updated.total_amount, Money::new(dec!(544.95)));

        let items = db.invoices().get_items(&invoice.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, Money::new(dec!(173)));
    }

    #[tokio::test]
    async fn test_switched_off_bird_count_is_stored() {
        let db = test_db().await;
        let client = seed_client(&db, "Zafar Farms", dec!(0.25)).await;
        let line = DraftLineItem {
            per_bird: PerBirdPricing {
                enabled: false,
                bird_count: 6,
            },
            ..DraftLineItem::custom("Layer", dec!(2), Money::new(dec!(300)), Percent::zero())
        };
        let draft = InvoiceDraft::new(&client, date("2024-03-10"))
            .add_line(line)
            .unwrap();
        let invoice = db.invoices().create_from_draft(&draft).await.unwrap();

        let items = db.invoices().get_items(&invoice.id).await.unwrap();
        assert_eq!(items[0].bird_count, Some(6));
        assert_eq!(items[0].per_bird_adjustment, None);

        let reloaded = db.invoices().load_draft(&invoice.id).await.unwrap();
        assert!(!reloaded.lines()[0].per_bird.enabled);
        assert_eq!(reloaded.lines()[0].per_bird.bird_count, 6);
        assert_eq!(reloaded.totals().total_amount, Money::new(dec!(600)));
    }

    #[tokio::test]
    async fn test_status_changes_and_notifications() {
        let db = test_db().await;
        let draft = two_line_draft(&db).await;
        let invoice = db.invoices().create_from_draft(&draft).await.unwrap();
        let repo = db.invoices();

        let sent = repo.set_status(&invoice.id, InvoiceStatus::Sent).await.unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);

        let notices = db.notifications().list_for_invoice(&invoice.id).await.unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NotificationKind::InvoiceSent);

        // same-state and backwards moves are rejected and write nothing
        let err = repo.set_status(&invoice.id, InvoiceStatus::Sent).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidStatusTransition { .. })));
        assert!(repo.set_status(&invoice.id, InvoiceStatus::Draft).await.is_err());

        repo.set_status(&invoice.id, InvoiceStatus::Cancelled).await.unwrap();
        assert_eq!(db.notifications().list_for_invoice(&invoice.id).await.unwrap().len(), 1);

        let err = repo.load_draft(&invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvoiceLocked { .. })));
    }

    #[tokio::test]
    async fn test_update_locked_invoice_rejected() {
        let db = test_db().await;
        let draft = two_line_draft(&db).await;
        let invoice = db.invoices().create_from_draft(&draft).await.unwrap();
        db.invoices()
            .set_status(&invoice.id, InvoiceStatus::Paid)
            .await
            .unwrap();

        let err = db.invoices().update_from_draft(&draft).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvoiceLocked { .. })));
    }

    #[tokio::test]
    async fn test_statement_and_aging() {
        let db = test_db().await;
        let draft = two_line_draft(&db).await;
        let invoice = db.invoices().create_from_draft(&draft).await.unwrap();
        db.invoices()
            .set_status(&invoice.id, InvoiceStatus::Sent)
            .await
            .unwrap();

        let as_of = date("2024-05-01");
        let statement = db.invoices().statement(&invoice.client_id, as_of).await.unwrap();
        assert_eq!(statement.lines.len(), 1);
        assert_eq!(statement.lines[0].status, DisplayStatus::Overdue);
        assert_eq!(statement.total_overdue, Money::new(dec!(571.20)));

        // due 2024-04-09, 22 days past due
        let aging = db.invoices().aging(as_of).await.unwrap();
        assert_eq!(aging.totals.days_1_30, Money::new(dec!(571.20)));
        assert_eq!(aging.clients.len(), 1);
    }
}
