//! # Shelf State
//!
//! The ordered working set of tagged products physically on one shelf.
//!
//! ## Toggle Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ShelfState                                     │
//! │                                                                         │
//! │   index:   0 (HEAD)      1             2                                │
//! │          ┌───────────┐ ┌───────────┐ ┌───────────┐                      │
//! │          │ tag-a     │ │ tag-b     │ │ tag-c     │  ◀── place() appends │
//! │          │ Widget    │ │ Milk      │ │ Widget    │                      │
//! │          └───────────┘ └───────────┘ └───────────┘                      │
//! │                                                                         │
//! │   scan(tag-b):  tag-b present  → remove_tag  → [tag-a, tag-c]           │
//! │   scan(tag-d):  tag-d absent   → place       → [.., tag-d]              │
//! │                                                                         │
//! │   Head = first element (oldest placement still on the shelf).           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Each tag id appears at most once.
//! - Every entry carries a tag binding.
//! - Order is preserved across snapshot round trips.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::validation;

/// Ordered collection of tagged products.
///
/// Serializes as `{"products": [...]}`, the snapshot file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelfState {
    #[serde(default)]
    products: Vec<Product>,
}

impl ShelfState {
    /// Creates an empty shelf.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a shelf from an ordered product list, checking invariants.
    pub fn from_products(products: Vec<Product>) -> CoreResult<Self> {
        let state = ShelfState { products };
        state.validate()?;
        Ok(state)
    }

    /// Checks the tag-binding and tag-uniqueness invariants.
    ///
    /// Used after deserializing a snapshot, since serde cannot enforce them.
    pub fn validate(&self) -> CoreResult<()> {
        validation::validate_shelf_products(&self.products)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The product the display should show, if any.
    pub fn head(&self) -> Option<&Product> {
        self.products.first()
    }

    /// Position of the product bound to `tag_id`.
    pub fn position_of_tag(&self, tag_id: &str) -> Option<usize> {
        self.products.iter().position(|p| p.has_tag(tag_id))
    }

    /// Returns true if `tag_id` is on the shelf.
    pub fn contains_tag(&self, tag_id: &str) -> bool {
        self.position_of_tag(tag_id).is_some()
    }

    /// Position of the first product from the given batch.
    pub fn position_of_batch(&self, code: &str, lot: i64) -> Option<usize> {
        self.products.iter().position(|p| p.matches_batch(code, lot))
    }

    pub fn get(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Appends a tagged product to the end of the shelf.
    ///
    /// Returns the index it landed at.
    ///
    /// ## Errors
    /// - `UnboundProduct` if the product has no tag
    /// - `DuplicateTag` if the tag is already on the shelf
    pub fn place(&mut self, product: Product) -> CoreResult<usize> {
        let tag_id = match product.tag_id.as_deref() {
            Some(tag_id) => tag_id,
            None => {
                return Err(CoreError::UnboundProduct {
                    product_id: product.product_id,
                })
            }
        };

        if self.contains_tag(tag_id) {
            return Err(CoreError::DuplicateTag {
                tag_id: tag_id.to_string(),
            });
        }

        self.products.push(product);
        Ok(self.products.len() - 1)
    }

    /// Removes the product bound to `tag_id`, returning it with its index.
    pub fn remove_tag(&mut self, tag_id: &str) -> Option<(usize, Product)> {
        let index = self.position_of_tag(tag_id)?;
        Some((index, self.products.remove(index)))
    }

    /// Replaces the entry at `index` with `product`, keeping its position.
    ///
    /// The slot keeps its tag binding whatever the incoming product carries:
    /// a replacement patches catalog data, never physical presence. Returns
    /// the entry that was replaced.
    ///
    /// ## Errors
    /// - `PositionOutOfRange` if `index` is past the end
    pub fn replace_at(&mut self, index: usize, mut product: Product) -> CoreResult<Product> {
        let len = self.products.len();
        let slot = self
            .products
            .get_mut(index)
            .ok_or(CoreError::PositionOutOfRange { index, len })?;

        product.tag_id = slot.tag_id.clone();
        Ok(std::mem::replace(slot, product))
    }
}

impl<'a> IntoIterator for &'a ShelfState {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.iter()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: &str, code: &str, lot: i64) -> Product {
        Product::new(format!("p-{code}"), code, lot, code, 1.0, "2030-01-01").with_tag(tag)
    }

    #[test]
    fn test_place_appends_and_head_is_first() {
        let mut shelf = ShelfState::new();
        assert!(shelf.head().is_none());

        assert_eq!(shelf.place(tagged("a", "SKU1", 1)).unwrap(), 0);
        assert_eq!(shelf.place(tagged("b", "SKU2", 1)).unwrap(), 1);

        assert_eq!(shelf.len(), 2);
        assert_eq!(shelf.head().unwrap().tag_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_place_rejects_duplicate_tag() {
        let mut shelf = ShelfState::new();
        shelf.place(tagged("a", "SKU1", 1)).unwrap();

        let err = shelf.place(tagged("a", "SKU2", 1)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTag { .. }));
        assert_eq!(shelf.len(), 1);
    }

    #[test]
    fn test_place_rejects_unbound_product() {
        let mut shelf = ShelfState::new();
        let unbound = Product::new("p-1", "SKU1", 1, "Widget", 1.0, "2030-01-01");

        assert!(matches!(
            shelf.place(unbound),
            Err(CoreError::UnboundProduct { .. })
        ));
    }

    #[test]
    fn test_remove_tag_promotes_next_to_head() {
        let mut shelf = ShelfState::new();
        shelf.place(tagged("a", "SKU1", 1)).unwrap();
        shelf.place(tagged("b", "SKU2", 1)).unwrap();

        let (index, removed) = shelf.remove_tag("a").unwrap();
        assert_eq!(index, 0);
        assert_eq!(removed.code, "SKU1");
        assert_eq!(shelf.head().unwrap().tag_id.as_deref(), Some("b"));

        assert!(shelf.remove_tag("a").is_none());
    }

    #[test]
    fn test_position_of_batch_returns_first_match() {
        let mut shelf = ShelfState::new();
        shelf.place(tagged("a", "SKU1", 1)).unwrap();
        shelf.place(tagged("b", "SKU2", 5)).unwrap();
        shelf.place(tagged("c", "SKU2", 5)).unwrap();

        assert_eq!(shelf.position_of_batch("SKU2", 5), Some(1));
        assert_eq!(shelf.position_of_batch("SKU2", 6), None);
    }

    #[test]
    fn test_replace_at_keeps_tag_binding() {
        let mut shelf = ShelfState::new();
        shelf.place(tagged("a", "SKU1", 1)).unwrap();

        let mut patched = Product::new("p-SKU1", "SKU1", 1, "Renamed", 2.5, "2030-01-01");
        patched.tag_id = None;

        let old = shelf.replace_at(0, patched).unwrap();
        assert_eq!(old.name, "SKU1");

        let head = shelf.head().unwrap();
        assert_eq!(head.name, "Renamed");
        assert_eq!(head.tag_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_replace_at_ignores_incoming_tag() {
        let mut shelf = ShelfState::new();
        shelf.place(tagged("a", "SKU1", 1)).unwrap();
        shelf.place(tagged("b", "SKU2", 1)).unwrap();

        // Neither a foreign tag nor another entry's tag moves the binding
        shelf.replace_at(0, tagged("z", "SKU1", 1)).unwrap();
        shelf.replace_at(1, tagged("a", "SKU2", 1)).unwrap();

        let tags: Vec<_> = shelf.iter().map(|p| p.tag_id.as_deref()).collect();
        assert_eq!(tags, vec![Some("a"), Some("b")]);
        assert!(shelf.validate().is_ok());
    }

    #[test]
    fn test_replace_at_out_of_range() {
        let mut shelf = ShelfState::new();
        let err = shelf.replace_at(3, tagged("a", "SKU1", 1)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::PositionOutOfRange { index: 3, len: 0 }
        ));
    }

    #[test]
    fn test_snapshot_shape_round_trips_in_order() {
        let mut shelf = ShelfState::new();
        shelf.place(tagged("b", "SKU2", 1)).unwrap();
        shelf.place(tagged("a", "SKU1", 1)).unwrap();

        let json = serde_json::to_string(&shelf).unwrap();
        assert!(json.starts_with(r#"{"products":["#));

        let restored: ShelfState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, shelf);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn test_validate_catches_duplicate_tags_from_json() {
        let product = serde_json::to_value(tagged("a", "SKU1", 1)).unwrap();
        let json = serde_json::json!({ "products": [product.clone(), product] });

        let state: ShelfState = serde_json::from_value(json).unwrap();
        assert!(state.validate().is_err());
    }
}
