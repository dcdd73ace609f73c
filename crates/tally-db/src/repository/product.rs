//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - CRUD operations
//! - Listing in display order (`position`, then name)
//! - Soft delete: invoice items keep pointing at retired products

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tally_core::validation::{validate_name, validate_percent, validate_unit_price};
use tally_core::Product;
use tracing::debug;
use uuid::Uuid;

use crate::codec;
use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = r#"
    id, name, description, unit_price, paper_price, tax_rate,
    is_active, position, created_at, updated_at
"#;

fn product_from_row(row: &SqliteRow) -> DbResult<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        unit_price: codec::money(row, "unit_price")?,
        paper_price: codec::money(row, "paper_price")?,
        tax_rate: codec::percent(row, "tax_rate")?,
        is_active: row.try_get("is_active")?,
        position: row.try_get("position")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn validate_product(product: &Product) -> DbResult<String> {
    let name = validate_name("name", &product.name)?;
    validate_unit_price("unit_price", product.unit_price)?;
    validate_unit_price("paper_price", product.paper_price)?;
    validate_percent("tax_rate", product.tax_rate)?;
    Ok(name)
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.insert(&product).await?;
/// let catalog = repo.list_active().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists active products in display order.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY position, name"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Listed active products");
        rows.iter().map(product_from_row).collect()
    }

    /// Gets a product by its ID, active or not.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `product` - Product to insert (id should be generated beforehand)
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product, name trimmed
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        let name = validate_product(product)?;

        debug!(id = %product.id, name = %name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, unit_price, paper_price, tax_rate,
                is_active, position, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&name)
        .bind(&product.description)
        .bind(codec::exact(product.unit_price))
        .bind(codec::exact(product.paper_price))
        .bind(codec::rate(product.tax_rate))
        .bind(product.is_active)
        .bind(product.position)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(Product {
            name,
            ..product.clone()
        })
    }

    /// Updates an existing product.
    ///
    /// Invoices already issued keep their snapshot prices.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let name = validate_product(product)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                unit_price = ?4,
                paper_price = ?5,
                tax_rate = ?6,
                is_active = ?7,
                position = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&name)
        .bind(&product.description)
        .bind(codec::exact(product.unit_price))
        .bind(codec::exact(product.paper_price))
        .bind(codec::rate(product.tax_rate))
        .bind(product.is_active)
        .bind(product.position)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Existing invoice items still reference the product.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_product, test_db};
    use rust_decimal_macros::dec;
    use tally_core::Money;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let product = seed_product(&db, "Broiler", dec!(200.125), dec!(190)).await;

        let fetched = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, product.name);
        assert_eq!(fetched.paper_price, Money::new(dec!(190)));
        assert!(fetched.is_active);
        // full precision is kept for catalog prices
        assert_eq!(fetched.unit_price, Money::new(dec!(200.125)));
    }

    #[tokio::test]
    async fn test_list_active_in_display_order() {
        let db = test_db().await;
        let repo = db.products();

        let mut eggs = seed_product(&db, "Eggs", dec!(10), dec!(9)).await;
        let feed = seed_product(&db, "Feed", dec!(50), dec!(45)).await;
        let broiler = seed_product(&db, "Broiler", dec!(200), dec!(190)).await;

        eggs.position = -1;
        repo.update(&eggs).await.unwrap();
        repo.soft_delete(&feed.id).await.unwrap();

        let names: Vec<String> = repo
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Eggs".to_string(), broiler.name]);
        assert_eq!(repo.count().await.unwrap(), 2);

        // soft-deleted rows are still readable by id
        let feed = repo.get_by_id(&feed.id).await.unwrap().unwrap();
        assert!(!feed.is_active);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = test_db().await;
        let mut product = seed_product(&db, "Broiler", dec!(200), dec!(190)).await;
        product.id = generate_product_id();

        let err = db.products().update(&product).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let db = test_db().await;
        let mut product = seed_product(&db, "Broiler", dec!(200), dec!(190)).await;
        product.paper_price = Money::new(dec!(-1));

        let err = db.products().update(&product).await.unwrap_err();
        assert!(matches!(err, DbError::Core(_)));
    }
}
