//! # Client Repository
//!
//! Billable parties with their payment terms and per-bird value.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tally_core::validation::{validate_due_days, validate_name, validate_value_per_bird};
use tally_core::Client;
use tracing::debug;

use crate::codec;
use crate::error::{DbError, DbResult};

const CLIENT_COLUMNS: &str = r#"
    id, name, email, phone, address, due_days, value_per_bird, created_at, updated_at
"#;

fn client_from_row(row: &SqliteRow) -> DbResult<Client> {
    Ok(Client {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        due_days: row.try_get("due_days")?,
        value_per_bird: codec::money(row, "value_per_bird")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Trims and checks the editable fields. `value_per_bird` may be negative.
fn normalized(client: &Client) -> DbResult<Client> {
    let name = validate_name("name", &client.name)?;
    validate_due_days(i64::from(client.due_days))?;
    validate_value_per_bird(client.value_per_bird)?;

    Ok(Client {
        name,
        email: blank_to_none(&client.email),
        phone: blank_to_none(&client.phone),
        address: blank_to_none(&client.address),
        ..client.clone()
    })
}

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Inserts a new client and returns it as stored.
    pub async fn insert(&self, client: &Client) -> DbResult<Client> {
        let client = normalized(client)?;

        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, name, email, phone, address, due_days, value_per_bird,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.due_days)
        .bind(codec::exact(client.value_per_bird))
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(client_from_row).transpose()
    }

    /// Lists all clients by name.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name COLLATE NOCASE");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(client_from_row).collect()
    }

    /// Updates a client's details.
    ///
    /// Changing `due_days` or `value_per_bird` only affects invoices
    /// created afterwards.
    pub async fn update(&self, client: &Client) -> DbResult<()> {
        let client = normalized(client)?;

        debug!(id = %client.id, "Updating client");

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = ?2,
                email = ?3,
                phone = ?4,
                address = ?5,
                due_days = ?6,
                value_per_bird = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.due_days)
        .bind(codec::exact(client.value_per_bird))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", &client.id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
