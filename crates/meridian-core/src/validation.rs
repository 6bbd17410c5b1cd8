//! # Validation Module
//!
//! Input validation and numeric coercion utilities for Meridian.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend (TypeScript)                                        │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Host command (Rust)                                          │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The coercion helpers at the bottom handle the one "failure" mode the
//! calculators themselves tolerate: malformed numeric input collapses to
//! zero instead of propagating an error.

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an article (manufacturer part number).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Punctuation and spacing are tolerated; stock matching normalizes
///   them away anyway
///
/// ## Example
/// ```rust
/// use meridian_core::validation::validate_article;
///
/// assert!(validate_article("ABC-123").is_ok());
/// assert!(validate_article("0 986 452 041").is_ok());
/// assert!(validate_article("").is_err());
/// ```
pub fn validate_article(article: &str) -> ValidationResult<()> {
    let article = article.trim();

    if article.is_empty() {
        return Err(ValidationError::Required {
            field: "article".to_string(),
        });
    }

    if article.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "article".to_string(),
            max: 50,
        });
    }

    Ok(())
}

/// Validates an item display name.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 200 characters
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity for a manually added line item.
///
/// ## Rules
/// - Must be positive (> 0); a hand-entered item always has units
/// - Must not exceed MAX_ITEM_QUANTITY
///
/// Stock reconciliation bypasses this check on purpose: an import may
/// legitimately set a position's quantity to zero.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (gifts, warranty replacements)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Cannot pay zero or negative amounts
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates order size (number of line items).
///
/// ## Rules
/// - Must not exceed MAX_ORDER_ITEMS
pub fn validate_order_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_ORDER_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "order items".to_string(),
            min: 0,
            max: MAX_ORDER_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use meridian_core::validation::validate_uuid;
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

    // Try to parse as UUID
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Coercion
// =============================================================================

/// Coerces a raw major-unit amount (as it arrives from a spreadsheet cell
/// or a loosely typed import) into Money.
///
/// NaN and infinities collapse to zero; everything else is rounded to the
/// nearest cent. Calculators never see a non-finite number.
///
/// ## Example
/// ```rust
/// use meridian_core::validation::coerce_amount;
///
/// assert_eq!(coerce_amount(10.99).cents(), 1099);
/// assert_eq!(coerce_amount(f64::NAN).cents(), 0);
/// assert_eq!(coerce_amount(f64::INFINITY).cents(), 0);
/// ```
pub fn coerce_amount(raw: f64) -> Money {
    if !raw.is_finite() {
        return Money::zero();
    }

    Money::from_cents((raw * 100.0).round() as i64)
}

/// Coerces a raw quantity into an i64, collapsing malformed input to zero.
///
/// Negative quantities are clamped to zero as well: a stock import cannot
/// drive a position below empty.
pub fn coerce_quantity(raw: f64) -> i64 {
    if !raw.is_finite() {
        return 0;
    }

    (raw.round() as i64).max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================
