//! # Validation Module
//!
//! Input checks that run before any ledger read.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Invocation decoding                                          │
//! │  ├── Argument count                                                    │
//! │  └── JSON shape (serde)                       → ParseError             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Key components non-empty, no separator   → Validation             │
//! │  └── Page params, quantities, settlement id   → Validation             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Contract state checks                                        │
//! │  └── NotFound / PermissionDenied / InvalidState / AlreadyExists        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::ledger::KEY_SEPARATOR;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted key component (ID, manufacturer, package code, owner).
pub const MAX_KEY_COMPONENT_LEN: usize = 256;

/// Longest accepted search keyword.
pub const MAX_KEYWORD_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates one component of a composite key.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most [`MAX_KEY_COMPONENT_LEN`] characters
/// - Must not contain the key separator (`U+0000`)
///
/// ## Example
/// ```rust
/// use trace_core::validation::validate_key_component;
///
/// assert!(validate_key_component("ID", "P-001").is_ok());
/// assert!(validate_key_component("ID", "").is_err());
/// ```
pub fn validate_key_component(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_KEY_COMPONENT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_KEY_COMPONENT_LEN,
        });
    }

    if value.contains(KEY_SEPARATOR) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain NUL characters".to_string(),
        });
    }

    Ok(())
}

/// Validates the `(Manufacturer, ID)` pair that addresses a product.
pub fn validate_product_key(manufacturer: &str, id: &str) -> ValidationResult<()> {
    validate_key_component("Manufacturer", manufacturer)?;
    validate_key_component("ID", id)
}

/// Validates a packaging batch's code list.
///
/// Duplicates are not checked here; they are reported together with codes
/// already on the ledger.
pub fn validate_package_codes(codes: &[String]) -> ValidationResult<()> {
    if codes.is_empty() {
        return Err(ValidationError::Required {
            field: "PackageCodeList".to_string(),
        });
    }
    codes
        .iter()
        .try_for_each(|code| validate_key_component("PackageCode", code))
}

/// Validates the name handed to Transfer.
pub fn validate_custodian_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "new custodian name".to_string(),
        });
    }
    Ok(())
}

/// Validates the id stamped onto revenue records by Settle.
pub fn validate_settlement_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "settlement id".to_string(),
        });
    }
    Ok(())
}

/// Validates a search keyword.
///
/// ## Returns
/// The trimmed keyword.
pub fn validate_search_keyword(keyword: &str) -> ValidationResult<String> {
    let keyword = keyword.trim();

    if keyword.chars().count() > MAX_KEYWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "Keyword".to_string(),
            max: MAX_KEYWORD_LEN,
        });
    }

    Ok(keyword.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates one settlement line's quantity. Zero is allowed.
pub fn validate_settlement_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::OutOfRange {
            field: "Quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates 1-based pagination parameters.
pub fn validate_page(page_index: i64, page_size: i64) -> ValidationResult<()> {
    if page_index < 1 {
        return Err(ValidationError::MustBePositive {
            field: "PageIndex".to_string(),
        });
    }
    if page_size < 1 {
        return Err(ValidationError::MustBePositive {
            field: "PageSize".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Invocation Validators
// =============================================================================

/// Validates the positional argument count of an invocation.
pub fn validate_argument_count(
    function: &str,
    expected: usize,
    actual: usize,
) -> ValidationResult<()> {
    if expected != actual {
        return Err(ValidationError::ArgumentCount {
            function: function.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_component() {
        assert!(validate_key_component("ID", "P1").is_ok());
        assert!(validate_key_component("ID", "Điện thoại 01").is_ok());

        assert!(validate_key_component("ID", "").is_err());
        assert!(validate_key_component("ID", "   ").is_err());
        assert!(validate_key_component("ID", "a\u{0}b").is_err());
        assert!(validate_key_component("ID", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_package_codes() {
        assert!(validate_package_codes(&["C1".to_string()]).is_ok());
        assert!(matches!(
            validate_package_codes(&[]),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_package_codes(&["C1".to_string(), String::new()]).is_err());
    }

    #[test]
    fn test_validate_settlement_quantity() {
        assert!(validate_settlement_quantity(0).is_ok());
        assert!(validate_settlement_quantity(5).is_ok());
        assert!(validate_settlement_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(1, 3).is_ok());
        assert!(validate_page(0, 3).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(-1, -1).is_err());
    }

    #[test]
    fn test_validate_argument_count() {
        assert!(validate_argument_count("Transfer", 2, 2).is_ok());
        let err = validate_argument_count("Transfer", 2, 1).unwrap_err();
        assert_eq!(err.to_string(), "Transfer expects 2 argument(s), got 1");
    }

    #[test]
    fn test_validate_search_keyword() {
        assert_eq!(validate_search_keyword("  dien thoai ").unwrap(), "dien thoai");
        assert!(validate_search_keyword(&"x".repeat(201)).is_err());
    }
}
