//! # Price Category Repository
//!
//! Price categories and their dated price history.
//!
//! ## Price History
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  price_history for "Broiler live"                                      │
//! │                                                                         │
//! │  effective_date │ price                                                 │
//! │  ───────────────┼───────                                                │
//! │  2024-03-01     │ 180.00                                                │
//! │  2024-03-04     │ 185.50   ◄── price_on(2024-03-06) resolves here       │
//! │  2024-03-07     │ 179.00                                                │
//! │                                                                         │
//! │  One row per (category, date). Writing the same date again replaces    │
//! │  the price instead of adding a second row.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tally_core::pricing::resolve_category_price;
use tally_core::validation::{validate_name, validate_unit_price};
use tally_core::{Money, PriceCategory, PriceHistoryEntry};
use tracing::debug;
use uuid::Uuid;

use crate::codec;
use crate::error::{DbError, DbResult};

/// Repository for price categories and price history.
#[derive(Debug, Clone)]
pub struct PriceCategoryRepository {
    pool: SqlitePool,
}

fn category_from_row(row: &SqliteRow) -> DbResult<PriceCategory> {
    Ok(PriceCategory {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(row: &SqliteRow) -> DbResult<PriceHistoryEntry> {
    Ok(PriceHistoryEntry {
        id: row.try_get("id")?,
        price_category_id: row.try_get("price_category_id")?,
        price: codec::money(row, "price")?,
        effective_date: row.try_get("effective_date")?,
    })
}

impl PriceCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PriceCategoryRepository { pool }
    }

    /// Creates a category.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - a category with this name exists
    pub async fn create(&self, name: &str, description: Option<&str>) -> DbResult<PriceCategory> {
        let name = validate_name("name", name)?;
        let category = PriceCategory {
            id: Uuid::new_v4().to_string(),
            name,
            description: description.map(str::trim).filter(|d| !d.is_empty()).map(String::from),
            created_at: Utc::now(),
        };

        debug!(id = %category.id, name = %category.name, "Creating price category");

        sqlx::query(
            "INSERT INTO price_categories (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("price category", &category.name),
            other => other,
        })?;

        Ok(category)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PriceCategory>> {
        let row = sqlx::query(
            "SELECT id, name, description, created_at FROM price_categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(category_from_row).transpose()
    }

    /// Lists all categories by name.
    pub async fn list(&self) -> DbResult<Vec<PriceCategory>> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at FROM price_categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(category_from_row).collect()
    }

    /// Deletes a category and, by cascade, its price history.
    ///
    /// Pricing rules anchored to it fall back to the product's paper price.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting price category");

        let result = sqlx::query("DELETE FROM price_categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PriceCategory", id));
        }

        Ok(())
    }

    /// Records the category price for a date, replacing any price already
    /// recorded for that date.
    pub async fn upsert_price(
        &self,
        category_id: &str,
        effective_date: NaiveDate,
        price: Money,
    ) -> DbResult<PriceHistoryEntry> {
        validate_unit_price("price", price)?;

        debug!(
            category_id = %category_id,
            effective_date = %effective_date,
            price = %price,
            "Upserting category price"
        );

        let now = Utc::now();
        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO price_history (
                id, price_category_id, price, effective_date, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(price_category_id, effective_date) DO UPDATE SET
                price = excluded.price,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(category_id)
        .bind(codec::exact(price))
        .bind(effective_date)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(PriceHistoryEntry {
            id,
            price_category_id: category_id.to_string(),
            price,
            effective_date,
        })
    }

    /// Full history of one category, oldest first.
    pub async fn history(&self, category_id: &str) -> DbResult<Vec<PriceHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, price_category_id, price, effective_date
            FROM price_history
            WHERE price_category_id = ?1
            ORDER BY effective_date
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    /// History of several categories at once, for building a pricing context.
    pub async fn history_for(&self, category_ids: &[String]) -> DbResult<Vec<PriceHistoryEntry>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, price_category_id, price, effective_date FROM price_history WHERE price_category_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in category_ids {
            ids.push_bind(id);
        }
        ids.push_unseparated(") ORDER BY price_category_id, effective_date");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// The category price in effect on `on_date`: the latest entry dated on
    /// or before it. `None` if the category has no price yet.
    pub async fn price_on(&self, category_id: &str, on_date: NaiveDate) -> DbResult<Option<Money>> {
        let rows = sqlx::query(
            r#"
            SELECT id, price_category_id, price, effective_date
            FROM price_history
            WHERE price_category_id = ?1 AND effective_date <= ?2
            ORDER BY effective_date DESC
            LIMIT 1
            "#,
        )
        .bind(category_id)
        .bind(on_date)
        .fetch_all(&self.pool)
        .await?;

        let history = rows
            .iter()
            .map(entry_from_row)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(resolve_category_price(category_id, on_date, &history))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
