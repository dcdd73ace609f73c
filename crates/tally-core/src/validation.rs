//! # Validation Module
//!
//! Input validation for values entering Tally from forms and imports.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Web form (TypeScript, ts-rs bindings)                         │
//! │  └── Basic format checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Ranges and formats checked before pricing/totals run               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── UNIQUE (price_category_id, effective_date)                         │
//! │  ├── UNIQUE (client_id, product_id) on pricing rules                    │
//! │  └── Foreign keys with cascades                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pricing resolver still clamps negative results to zero, so a value
//! that slips past this layer produces a zero price rather than a panic.
//!
//! ## Usage
//! ```rust
//! use rust_decimal::Decimal;
//! use tally_core::validation::{parse_date, validate_quantity};
//!
//! let issued = parse_date("2024-02-01").unwrap();
//! assert_eq!(issued.to_string(), "2024-02-01");
//! assert!(validate_quantity(Decimal::new(25, 1)).is_ok());
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Percent, PriceRule};
use crate::{
    MAX_BIRD_COUNT, MAX_INVOICE_LINES, MAX_LINE_QUANTITY, MAX_RULE_MULTIPLIER, MAX_UNIT_PRICE,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of names and descriptions.
pub const MAX_NAME_LEN: usize = 200;

/// Upper bound for a client's payment terms (ten years).
pub const MAX_DUE_DAYS: i64 = 3650;

/// Date format used in storage and on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (client, product, category).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ## Returns
/// The trimmed name.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Eggs ").unwrap(), "Eggs");
/// assert!(validate_name("name", "").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: format!("expected YYYY-MM-DD ({e})"),
        }
    })
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that a price or amount is not negative. Zero is allowed.
pub fn validate_money_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage in `0..=100`.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::types::Percent;
/// use tally_core::validation::validate_percent;
///
/// assert!(validate_percent("tax_rate", Percent::new(Decimal::new(825, 2))).is_ok());
/// assert!(validate_percent("discount", Percent::new(Decimal::from(101))).is_err());
/// ```
pub fn validate_percent(field: &str, rate: Percent) -> ValidationResult<()> {
    if rate.value() < Decimal::ZERO || rate.value() > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }

    Ok(())
}

/// Validates a price: not negative and at most [`MAX_UNIT_PRICE`].
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use tally_core::money::Money;
/// use tally_core::validation::validate_unit_price;
///
/// assert!(validate_unit_price("unit_price", Money::new(Decimal::from(480))).is_ok());
/// assert!(validate_unit_price("unit_price", Money::new(Decimal::from(-1))).is_err());
/// ```
pub fn validate_unit_price(field: &str, price: Money) -> ValidationResult<()> {
    validate_money_non_negative(field, price)?;

    if price.amount() > Decimal::from(MAX_UNIT_PRICE) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: MAX_UNIT_PRICE.to_string(),
        });
    }

    Ok(())
}

/// Validates a client's per-bird value. Negative values are deductions, so
/// only the magnitude is bounded.
pub fn validate_value_per_bird(value: Money) -> ValidationResult<()> {
    if value.abs().amount() > Decimal::from(MAX_UNIT_PRICE) {
        return Err(ValidationError::OutOfRange {
            field: "value_per_bird".to_string(),
            min: format!("-{MAX_UNIT_PRICE}"),
            max: MAX_UNIT_PRICE.to_string(),
        });
    }

    Ok(())
}

/// Validates a line quantity.
///
/// Quantities may be fractional (2.5 kg) and zero, but never negative or
/// above [`MAX_LINE_QUANTITY`].
pub fn validate_quantity(quantity: Decimal) -> ValidationResult<()> {
    if quantity < Decimal::ZERO {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    if quantity > Decimal::from(MAX_LINE_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: "0".to_string(),
            max: MAX_LINE_QUANTITY.to_string(),
        });
    }

    Ok(())
}

/// Validates a per-bird count. A line with per-bird pricing covers at least one bird.
pub fn validate_bird_count(count: u32) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::MustBePositive {
            field: "bird_count".to_string(),
        });
    }

    if count > MAX_BIRD_COUNT {
        return Err(ValidationError::OutOfRange {
            field: "bird_count".to_string(),
            min: "1".to_string(),
            max: MAX_BIRD_COUNT.to_string(),
        });
    }

    Ok(())
}

/// Validates a client's payment terms in days.
///
/// Takes `i64` because form input may be negative before validation.
pub fn validate_due_days(days: i64) -> ValidationResult<u32> {
    if !(0..=MAX_DUE_DAYS).contains(&days) {
        return Err(ValidationError::OutOfRange {
            field: "due_days".to_string(),
            min: "0".to_string(),
            max: MAX_DUE_DAYS.to_string(),
        });
    }

    Ok(days as u32)
}

/// Validates a pricing rule's value for its kind.
///
/// ## Rules
/// - `discount_percentage`: 0 to 100
/// - `discount_flat`: 0 to `MAX_UNIT_PRICE` (larger than the base price clamps to 0)
/// - `multiplier`: 0 to `MAX_RULE_MULTIPLIER`
pub fn validate_price_rule(rule: &PriceRule) -> ValidationResult<()> {
    match rule {
        PriceRule::DiscountPercentage(pct) => validate_percent("price_rule_value", *pct),
        PriceRule::DiscountFlat(amount) => validate_unit_price("price_rule_value", *amount),
        PriceRule::Multiplier(factor) => {
            if *factor < Decimal::ZERO {
                return Err(ValidationError::MustNotBeNegative {
                    field: "price_rule_value".to_string(),
                });
            }
            if *factor > Decimal::from(MAX_RULE_MULTIPLIER) {
                return Err(ValidationError::OutOfRange {
                    field: "price_rule_value".to_string(),
                    min: "0".to_string(),
                    max: MAX_RULE_MULTIPLIER.to_string(),
                });
            }
            Ok(())
        }
    }
}

/// Builds a [`PriceRule`] from its stored `(type, value)` pair.
pub fn parse_price_rule(kind: &str, value: Decimal) -> ValidationResult<PriceRule> {
    let rule = PriceRule::from_parts(kind, value).ok_or_else(|| ValidationError::NotAllowed {
        field: "price_rule_type".to_string(),
        allowed: PriceRule::KINDS.iter().map(|k| k.to_string()).collect(),
    })?;
    validate_price_rule(&rule)?;
    Ok(rule)
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that another line fits on an invoice holding `current_lines`.
pub fn validate_line_count(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_INVOICE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "invoice lines".to_string(),
            min: "0".to_string(),
            max: MAX_INVOICE_LINES.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
