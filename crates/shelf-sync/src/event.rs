//! Bus payloads exchanged between the engine and its collaborators.

use serde::{Deserialize, Serialize};
use shelf_core::{Product, ProductTag};

/// A message on the shelf bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ShelfEvent {
    /// A tag was seen by a scanner. Published under `<producer>.tag.<subtype>`.
    Tag(ProductTag),

    /// Catalog data for a product changed remotely.
    /// Published under `<producer>.update.<subtype>`.
    Update(Product),

    /// The shelf's head product, or `None` for an empty shelf.
    /// Published by the engine under `shelf.product.current`.
    CurrentProduct(Option<Product>),
}

impl ShelfEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ShelfEvent::Tag(_) => "tag",
            ShelfEvent::Update(_) => "update",
            ShelfEvent::CurrentProduct(_) => "current_product",
        }
    }
}
