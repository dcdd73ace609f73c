//! # Pricing Rule Repository
//!
//! Client-specific pricing rules, one per `(client, product)` pair.
//!
//! Rules are stored as a `(price_rule_type, price_rule_value)` pair so the
//! value column stays a plain decimal for every kind.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tally_core::validation::validate_price_rule;
use tally_core::{ClientPricingRule, PriceRule};
use tracing::debug;
use uuid::Uuid;

use crate::codec;
use crate::error::{DbError, DbResult};

fn rule_from_row(row: &SqliteRow) -> DbResult<ClientPricingRule> {
    let kind: String = row.try_get("price_rule_type")?;
    let value = codec::decimal(row, "price_rule_value")?;
    let rule = PriceRule::from_parts(&kind, value)
        .ok_or_else(|| DbError::invalid_data("price_rule_type", format!("unknown rule type '{kind}'")))?;

    Ok(ClientPricingRule {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        product_id: row.try_get("product_id")?,
        price_category_id: row.try_get("price_category_id")?,
        rule,
    })
}

/// Repository for client pricing rules.
#[derive(Debug, Clone)]
pub struct PricingRuleRepository {
    pool: SqlitePool,
}

impl PricingRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PricingRuleRepository { pool }
    }

    /// Sets the rule for a client and product, replacing any existing one.
    ///
    /// ## Arguments
    /// * `price_category_id` - anchor the rule to a category's daily price;
    ///   `None` applies it to the product's paper price
    pub async fn upsert(
        &self,
        client_id: &str,
        product_id: &str,
        price_category_id: Option<&str>,
        rule: PriceRule,
    ) -> DbResult<ClientPricingRule> {
        validate_price_rule(&rule)?;

        debug!(
            client_id = %client_id,
            product_id = %product_id,
            kind = rule.kind(),
            value = %rule.value(),
            "Upserting pricing rule"
        );

        let now = Utc::now();
        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO client_product_pricing_rules (
                id, client_id, product_id, price_category_id,
                price_rule_type, price_rule_value, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(client_id, product_id) DO UPDATE SET
                price_category_id = excluded.price_category_id,
                price_rule_type = excluded.price_rule_type,
                price_rule_value = excluded.price_rule_value,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(client_id)
        .bind(product_id)
        .bind(price_category_id)
        .bind(rule.kind())
        .bind(codec::decimal_text(rule.value()))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(ClientPricingRule {
            id,
            client_id: client_id.to_string(),
            product_id: product_id.to_string(),
            price_category_id: price_category_id.map(String::from),
            rule,
        })
    }

    /// All rules for one client.
    pub async fn list_for_client(&self, client_id: &str) -> DbResult<Vec<ClientPricingRule>> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_id, product_id, price_category_id, price_rule_type, price_rule_value
            FROM client_product_pricing_rules
            WHERE client_id = ?1
            ORDER BY product_id
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(rule_from_row).collect()
    }

    pub async fn get_for(
        &self,
        client_id: &str,
        product_id: &str,
    ) -> DbResult<Option<ClientPricingRule>> {
        let row = sqlx::query(
            r#"
            SELECT id, client_id, product_id, price_category_id, price_rule_type, price_rule_value
            FROM client_product_pricing_rules
            WHERE client_id = ?1 AND product_id = ?2
            "#,
        )
        .bind(client_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(rule_from_row).transpose()
    }

    /// Removes the rule; the client goes back to the product's default price.
    pub async fn delete(&self, client_id: &str, product_id: &str) -> DbResult<()> {
        debug!(client_id = %client_id, product_id = %product_id, "Deleting pricing rule");

        let result = sqlx::query(
            "DELETE FROM client_product_pricing_rules WHERE client_id = ?1 AND product_id = ?2",
        )
        .bind(client_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "PricingRule",
                format!("{client_id}/{product_id}"),
            ));
        }

        Ok(())
    }
}
