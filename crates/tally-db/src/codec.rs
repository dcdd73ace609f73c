//! # Decimal Column Codec
//!
//! SQLite has no exact decimal type and sqlx cannot bind `rust_decimal` for
//! it, so amounts, quantities and rates are stored as TEXT and parsed back
//! here.
//!
//! ```text
//!   Money(189.00) ──encode──► '189.00' ──decode──► Money(189.00)
//!   Percent(8.25) ──encode──► '8.25'   ──decode──► Percent(8.25)
//! ```
//!
//! Totals are rounded to cents before encoding (`cents`); unit prices and
//! rates keep their full precision (`exact`).

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tally_core::money::Money;
use tally_core::types::Percent;

use crate::error::{DbError, DbResult};

// =============================================================================
// Encode
// =============================================================================

/// Money rounded to cents, for stored totals and payments.
pub(crate) fn cents(amount: Money) -> String {
    // Display rounds and pads to two places
    amount.to_string()
}

/// Money at full precision, for snapshot unit prices.
pub(crate) fn exact(amount: Money) -> String {
    amount.amount().normalize().to_string()
}

pub(crate) fn rate(pct: Percent) -> String {
    pct.value().normalize().to_string()
}

pub(crate) fn decimal_text(value: Decimal) -> String {
    value.normalize().to_string()
}

// =============================================================================
// Decode
// =============================================================================

pub(crate) fn parse_decimal(column: &str, text: &str) -> DbResult<Decimal> {
    Decimal::from_str(text.trim())
        .map_err(|e| DbError::invalid_data(column, format!("'{text}' is not a decimal: {e}")))
}

pub(crate) fn decimal(row: &SqliteRow, column: &str) -> DbResult<Decimal> {
    let text: String = row.try_get(column)?;
    parse_decimal(column, &text)
}

pub(crate) fn money(row: &SqliteRow, column: &str) -> DbResult<Money> {
    decimal(row, column).map(Money::new)
}

pub(crate) fn opt_money(row: &SqliteRow, column: &str) -> DbResult<Option<Money>> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|t| parse_decimal(column, &t).map(Money::new))
        .transpose()
}

pub(crate) fn percent(row: &SqliteRow, column: &str) -> DbResult<Percent> {
    decimal(row, column).map(Percent::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_encode() {
        assert_eq!(cents(Money::new(dec!(170.1))), "170.10");
        assert_eq!(cents(Money::new(dec!(0.825))), "0.83");
        assert_eq!(exact(Money::new(dec!(3.3330))), "3.333");
        assert_eq!(rate(Percent::new(dec!(8.250))), "8.25");
        assert_eq!(decimal_text(dec!(2.50)), "2.5");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("price", "12.50").unwrap(), dec!(12.5));
        assert_eq!(parse_decimal("price", " 7 ").unwrap(), dec!(7));

        let err = parse_decimal("price", "twelve").unwrap_err();
        assert!(matches!(err, DbError::InvalidData { ref column, .. } if column == "price"));
    }
}
