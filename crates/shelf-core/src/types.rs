//! # Domain Types
//!
//! Core domain types used throughout the smart shelf.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │   ProductTag    │   │     Product     │   │  InventoryRecord    │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  tagId          │──▶│  productId      │   │  recordId           │   │
//! │  │  code           │   │  tagId (bound)  │   │  shelfId            │   │
//! │  │  lot            │   │  code, lot      │   │  productId          │   │
//! │  │                 │   │  name, price    │   │  quantity (>= 1)    │   │
//! │  │  (ephemeral)    │   │  expirationDate │   │                     │   │
//! │  └─────────────────┘   │  inPromo        │   │  (remote counter)   │   │
//! │                        │  promoPrice     │   └─────────────────────┘   │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Names
//! Every type serializes with camelCase field names so the snapshot file and
//! bus payloads read `expirationDate`, `inPromo`, `promoPrice`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Expiration date formats seen in catalog data, tried in order.
const EXPIRATION_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

// =============================================================================
// Product Tag
// =============================================================================

/// A tag read by the scanner.
///
/// Produced once per scan and consumed by a single event handler; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTag {
    /// Opaque hardware identifier, unique per physical tag.
    pub tag_id: String,

    /// Catalog SKU embedded in the tag.
    pub code: String,

    /// Batch identifier embedded in the tag.
    pub lot: i64,
}

impl ProductTag {
    /// Creates a new tag.
    pub fn new(tag_id: impl Into<String>, code: impl Into<String>, lot: i64) -> Self {
        ProductTag {
            tag_id: tag_id.into(),
            code: code.into(),
            lot,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product, optionally bound to the physical tag carrying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog primary key.
    pub product_id: String,

    /// Physical tag currently bound to this instance.
    /// Set only after a scan has been resolved.
    #[serde(default)]
    pub tag_id: Option<String>,

    /// Catalog SKU.
    pub code: String,

    /// Batch identifier.
    pub lot: i64,

    /// Display name.
    pub name: String,

    /// Unit price.
    pub price: f64,

    /// Expiration date as stored in the catalog.
    pub expiration_date: String,

    /// Whether the product is currently on promotion.
    #[serde(default)]
    pub in_promo: bool,

    /// Promotional price, when one exists.
    #[serde(default)]
    pub promo_price: Option<f64>,
}

impl Product {
    /// Creates an unbound product with no promotion.
    pub fn new(
        product_id: impl Into<String>,
        code: impl Into<String>,
        lot: i64,
        name: impl Into<String>,
        price: f64,
        expiration_date: impl Into<String>,
    ) -> Self {
        Product {
            product_id: product_id.into(),
            tag_id: None,
            code: code.into(),
            lot,
            name: name.into(),
            price,
            expiration_date: expiration_date.into(),
            in_promo: false,
            promo_price: None,
        }
    }

    /// Binds this product to a physical tag.
    pub fn with_tag(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_id = Some(tag_id.into());
        self
    }

    /// Marks this product as on promotion at the given price.
    pub fn with_promo(mut self, promo_price: f64) -> Self {
        self.in_promo = true;
        self.promo_price = Some(promo_price);
        self
    }

    /// Returns true if this product is bound to the given tag.
    #[inline]
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tag_id.as_deref() == Some(tag_id)
    }

    /// Returns true if this product belongs to the given code and lot.
    #[inline]
    pub fn matches_batch(&self, code: &str, lot: i64) -> bool {
        self.code == code && self.lot == lot
    }

    /// The price a customer pays right now.
    ///
    /// A promotion without a promo price falls back to the list price.
    pub fn effective_price(&self) -> f64 {
        match (self.in_promo, self.promo_price) {
            (true, Some(promo)) => promo,
            _ => self.price,
        }
    }

    /// Parses the expiration date, if it is in a known format.
    pub fn expiration(&self) -> Option<NaiveDate> {
        let raw = self.expiration_date.trim();
        EXPIRATION_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    }
}

// =============================================================================
// Inventory Aggregate Record
// =============================================================================

/// The remote per-shelf, per-product quantity counter.
///
/// A record never holds quantity zero: the last removal deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    /// Remote primary key.
    pub record_id: String,

    /// Shelf this counter belongs to.
    pub shelf_id: i64,

    /// Catalog product being counted.
    pub product_id: String,

    /// Units of the product currently on the shelf.
    pub quantity: u32,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        Product::new("p-1", "SKU1", 100, "Widget", 9.99, "2022-02-26")
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let json = serde_json::to_value(widget().with_tag("tag-a")).unwrap();
        assert_eq!(json["productId"], "p-1");
        assert_eq!(json["tagId"], "tag-a");
        assert_eq!(json["expirationDate"], "2022-02-26");
        assert_eq!(json["inPromo"], false);
        assert!(json["promoPrice"].is_null());
    }

    #[test]
    fn test_missing_promo_fields_default() {
        let json = r#"{
            "productId": "p-9",
            "code": "SKU9",
            "lot": 7,
            "name": "Milk",
            "price": 1.2,
            "expirationDate": "2022-03-01"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(!product.in_promo);
        assert_eq!(product.promo_price, None);
        assert_eq!(product.tag_id, None);
    }

    #[test]
    fn test_effective_price() {
        assert_eq!(widget().effective_price(), 9.99);
        assert_eq!(widget().with_promo(7.5).effective_price(), 7.5);

        let mut promo_without_price = widget();
        promo_without_price.in_promo = true;
        assert_eq!(promo_without_price.effective_price(), 9.99);
    }

    #[test]
    fn test_expiration_formats() {
        let iso = widget();
        assert_eq!(iso.expiration(), NaiveDate::from_ymd_opt(2022, 2, 26));

        let mut european = widget();
        european.expiration_date = "26/02/2022".to_string();
        assert_eq!(european.expiration(), NaiveDate::from_ymd_opt(2022, 2, 26));

        let mut garbage = widget();
        garbage.expiration_date = "soon".to_string();
        assert_eq!(garbage.expiration(), None);
    }

    #[test]
    fn test_tag_and_batch_matching() {
        let product = widget().with_tag("tag-a");
        assert!(product.has_tag("tag-a"));
        assert!(!product.has_tag("tag-b"));
        assert!(product.matches_batch("SKU1", 100));
        assert!(!product.matches_batch("SKU1", 101));
    }
}
