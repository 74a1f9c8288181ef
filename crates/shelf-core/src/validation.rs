//! # Validation Module
//!
//! Input validation for tags, products, shelf contents and store identifiers.
//!
//! ## Where Validation Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Points                                  │
//! │                                                                         │
//! │  Scanner / update feed                                                 │
//! │  └── validate_tag, validate_product   (before touching the shelf)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Snapshot load                                                         │
//! │  └── validate_shelf_products          (tag binding + uniqueness)       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Store configuration                                                   │
//! │  └── validate_identifier              (table names spliced into SQL)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shelf_core::validation::{validate_identifier, validate_tag};
//! use shelf_core::ProductTag;
//!
//! validate_identifier("table", "products").unwrap();
//! validate_tag(&ProductTag::new("04:a1", "SKU1", 100)).unwrap();
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{Product, ProductTag};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted tag id, code or identifier.
const MAX_ID_LEN: usize = 64;

// =============================================================================
// String Validators
// =============================================================================

fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a SQL identifier such as a configured table name.
///
/// ## Rules
/// - Must not be empty, at most 64 characters
/// - ASCII letters, digits and underscores only
/// - Must not start with a digit
///
/// ## Example
/// ```rust
/// use shelf_core::validation::validate_identifier;
///
/// assert!(validate_identifier("table", "shelf_inventory").is_ok());
/// assert!(validate_identifier("table", "products; DROP TABLE x").is_err());
/// assert!(validate_identifier("table", "1products").is_err());
/// ```
pub fn validate_identifier(field: &str, ident: &str) -> ValidationResult<()> {
    validate_required(field, ident)?;

    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not start with a digit".to_string(),
        });
    }

    if !ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "only letters, digits and underscores allowed".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Domain Validators
// =============================================================================

/// Validates a scanned tag.
pub fn validate_tag(tag: &ProductTag) -> ValidationResult<()> {
    validate_required("tagId", &tag.tag_id)?;
    validate_required("code", &tag.code)?;
    Ok(())
}

/// Validates an incoming product record.
///
/// Prices must be non-negative; a promo price, when present, too.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_required("productId", &product.product_id)?;
    validate_required("code", &product.code)?;

    if product.price.is_nan() || product.price < 0.0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    if let Some(promo) = product.promo_price {
        if promo.is_nan() || promo < 0.0 {
            return Err(ValidationError::Negative {
                field: "promoPrice".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates the contents of a shelf.
///
/// Every entry must be bound to a tag and no tag may appear twice.
pub fn validate_shelf_products(products: &[Product]) -> ValidationResult<()> {
    let mut seen = HashSet::with_capacity(products.len());

    for product in products {
        let tag_id = product
            .tag_id
            .as_deref()
            .ok_or_else(|| ValidationError::Required {
                field: "tagId".to_string(),
            })?;

        if !seen.insert(tag_id) {
            return Err(ValidationError::Duplicate {
                field: "tagId".to_string(),
                value: tag_id.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("t", "products").is_ok());
        assert!(validate_identifier("t", "_private2").is_ok());
        assert!(validate_identifier("t", "").is_err());
        assert!(validate_identifier("t", "with space").is_err());
        assert!(validate_identifier("t", "quote\"d").is_err());
        assert!(validate_identifier("t", "9lives").is_err());
        assert!(validate_identifier("t", &"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag(&ProductTag::new("04:a1", "SKU1", 1)).is_ok());
        assert!(validate_tag(&ProductTag::new("  ", "SKU1", 1)).is_err());
        assert!(validate_tag(&ProductTag::new("04:a1", "", 1)).is_err());
    }

    #[test]
    fn test_validate_product() {
        let ok = Product::new("p-1", "SKU1", 1, "Widget", 9.99, "2030-01-01");
        assert!(validate_product(&ok).is_ok());

        let mut negative = ok.clone();
        negative.price = -1.0;
        assert!(validate_product(&negative).is_err());

        let bad_promo = ok.clone().with_promo(-0.5);
        assert!(validate_product(&bad_promo).is_err());

        let mut no_id = ok;
        no_id.product_id.clear();
        assert!(validate_product(&no_id).is_err());
    }

    #[test]
    fn test_validate_shelf_products() {
        let a = Product::new("p-1", "SKU1", 1, "Widget", 1.0, "x").with_tag("a");
        let b = Product::new("p-1", "SKU1", 1, "Widget", 1.0, "x").with_tag("b");
        assert!(validate_shelf_products(&[a.clone(), b]).is_ok());

        assert!(matches!(
            validate_shelf_products(&[a.clone(), a.clone()]),
            Err(ValidationError::Duplicate { .. })
        ));

        let mut unbound = a;
        unbound.tag_id = None;
        assert!(matches!(
            validate_shelf_products(&[unbound]),
            Err(ValidationError::Required { .. })
        ));
    }
}
