//! # Validation Module
//!
//! Input validation for the local write paths and for the generic
//! table-replace code, which interpolates table and column names into SQL.
//!
//! ## Where Validation Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI form                                                      │
//! │  └── Basic format checks (empty, length)                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository write (Rust)                                      │
//! │  └── THIS MODULE: names, prices, quantities, order prefixes            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── NOT NULL / UNIQUE / CHECK constraints                             │
//! │                                                                         │
//! │  Pull path: remote column names → validate_identifier → SQL text       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use recicla_core::validation::{validate_identifier, validate_material_name};
//!
//! validate_identifier("preco_compra").unwrap();
//! assert!(validate_identifier("nome; DROP TABLE material").is_err());
//! validate_material_name("Papelão").unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted for a table or column name.
const MAX_IDENTIFIER_LEN: usize = 63;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a SQL identifier (table or column name).
///
/// ## Rules
/// - Must not be empty
/// - At most 63 characters
/// - ASCII letters, digits and underscores only, not starting with a digit
///
/// Column names coming back from the remote are checked with this before
/// they are spliced into an `INSERT` statement.
pub fn validate_identifier(name: &str) -> ValidationResult<()> {
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "identifier".to_string(),
        });
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: "identifier".to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "identifier".to_string(),
            reason: format!("'{name}' is not a plain SQL identifier"),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a material name (the material's natural key).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 100 characters
pub fn validate_material_name(name: &str) -> ValidationResult<()> {
    validate_required_text("nome", name, 100)
}

/// Validates a person or client name on vouchers and orders.
pub fn validate_person_name(name: &str) -> ValidationResult<()> {
    validate_required_text("nome", name, 120)
}

/// Validates an order-code prefix.
///
/// ## Rules
/// - 1 to 8 characters
/// - ASCII letters and digits only (the dash is the code separator)
///
/// ## Example
/// ```rust
/// use recicla_core::validation::validate_order_prefix;
///
/// assert!(validate_order_prefix("TR").is_ok());
/// assert!(validate_order_prefix("T-R").is_err());
/// ```
pub fn validate_order_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "order_prefix".to_string(),
        });
    }

    if prefix.len() > 8 {
        return Err(ValidationError::TooLong {
            field: "order_prefix".to_string(),
            max: 8,
        });
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "order_prefix".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a unit price. Zero is allowed (donated material).
pub fn validate_price(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a line quantity (kg or units).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: f64) -> ValidationResult<()> {
    if !qty.is_finite() || qty <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantidade".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::TooLarge {
            field: "quantidade".to_string(),
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a voucher amount. Must be positive.
pub fn validate_amount(value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "valor".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
