//! # Notification Repository
//!
//! Persisted notices about invoice and payment events.
//!
//! Event notices are written by the invoice and payment repositories inside
//! the same transaction as the change they describe, so a notice exists if
//! and only if its event committed. Delivery (email, push) is up to whoever
//! reads the unread list.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tally_core::notification::{overdue_reminders, Notification, NotificationKind};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::invoice::list_sent_invoices;

fn notification_from_row(row: &SqliteRow) -> DbResult<Notification> {
    Ok(Notification {
        id: row.try_get("id")?,
        kind: row.try_get("kind")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        invoice_id: row.try_get("invoice_id")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Inserts one notification on an existing connection or transaction.
pub(crate) async fn insert_on(
    conn: &mut SqliteConnection,
    notification: &Notification,
) -> DbResult<()> {
    debug!(
        id = %notification.id,
        kind = ?notification.kind,
        invoice_id = ?notification.invoice_id,
        "Recording notification"
    );

    sqlx::query(
        r#"
        INSERT INTO notifications (id, kind, title, message, invoice_id, is_read, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&notification.id)
    .bind(notification.kind)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.invoice_id)
    .bind(notification.is_read)
    .bind(notification.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for notifications.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    pub async fn insert(&self, notification: &Notification) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_on(&mut conn, notification).await
    }

    /// Unread notifications, newest first.
    pub async fn list_unread(&self) -> DbResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, title, message, invoice_id, is_read, created_at
            FROM notifications
            WHERE is_read = 0
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    /// All notifications about one invoice, oldest first.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> DbResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, title, message, invoice_id, is_read, created_at
            FROM notifications
            WHERE invoice_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    pub async fn mark_read(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }

        Ok(())
    }

    /// Marks every notification read and returns how many changed.
    pub async fn mark_all_read(&self) -> DbResult<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE is_read = 0")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Records an overdue reminder for each invoice overdue on `today` that
    /// has no unread reminder yet. Returns the reminders written.
    pub async fn remind_overdue(&self, today: NaiveDate) -> DbResult<Vec<Notification>> {
        let mut tx = self.pool.begin().await?;

        let invoices = list_sent_invoices(&mut tx).await?;
        let mut written = Vec::new();

        for reminder in overdue_reminders(&invoices, today) {
            let pending: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM notifications
                WHERE invoice_id = ?1 AND kind = ?2 AND is_read = 0
                "#,
            )
            .bind(&reminder.invoice_id)
            .bind(NotificationKind::InvoiceOverdue)
            .fetch_one(&mut *tx)
            .await?;

            if pending > 0 {
                continue;
            }

            insert_on(&mut tx, &reminder).await?;
            written.push(reminder);
        }

        tx.commit().await?;

        info!(count = written.len(), today = %today, "Overdue reminders recorded");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{date, seed_sent_invoice, test_db};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_insert_list_mark_read() {
        let db = test_db().await;
        let repo = db.notifications();

        let first = Notification::new(NotificationKind::InvoiceSent, "Invoice sent", "one", None);
        let second = Notification::new(NotificationKind::InvoicePaid, "Invoice paid", "two", None);
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        let unread = repo.list_unread().await.unwrap();
        assert_eq!(unread.len(), 2);
        assert_eq!(unread[0].id, second.id);
        assert_eq!(unread[1].kind, NotificationKind::InvoiceSent);

        repo.mark_read(&first.id).await.unwrap();
        assert_eq!(repo.list_unread().await.unwrap().len(), 1);

        assert_eq!(repo.mark_all_read().await.unwrap(), 1);
        assert!(repo.list_unread().await.unwrap().is_empty());

        let err = repo.mark_read("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_remind_overdue_once_per_unread_reminder() {
        let db = test_db().await;
        let invoice = seed_sent_invoice(&db, date("2024-01-01"), dec!(100)).await;
        let repo = db.notifications();

        // due 2024-01-31 with the default 30 day terms
        assert!(repo.remind_overdue(date("2024-01-31")).await.unwrap().is_empty());

        let written = repo.remind_overdue(date("2024-02-10")).await.unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].invoice_id.as_deref(), Some(invoice.id.as_str()));
        assert!(written[0].message.contains("10 days overdue"));

        assert!(repo.remind_overdue(date("2024-02-11")).await.unwrap().is_empty());

        repo.mark_all_read().await.unwrap();
        assert_eq!(repo.remind_overdue(date("2024-02-12")).await.unwrap().len(), 1);
    }
}
