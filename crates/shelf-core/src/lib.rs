//! # shelf-core: Pure Domain Logic for the Smart Shelf
//!
//! This crate holds the domain types and state transitions of a smart shelf
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Smart Shelf Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Tag scanner  /  Remote update feed                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ pub/sub bus                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                shelf-sync (ShelfEngine)                         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shelf-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌───────────┐                │   │
//! │  │   │   types   │  │    shelf    │  │ validation│                │   │
//! │  │   │  Product  │  │ ShelfState  │  │   rules   │                │   │
//! │  │   │ ProductTag│  │  toggle/head│  │  checks   │                │   │
//! │  │   └───────────┘  └─────────────┘  └───────────┘                │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ProductTag, Product, InventoryRecord, ...)
//! - [`shelf`] - The `ShelfState` working set and its invariants
//! - [`error`] - Domain error types
//! - [`validation`] - Input and identifier validation
//!
//! ## Example Usage
//!
//! ```rust
//! use shelf_core::{Product, ShelfState};
//!
//! let mut shelf = ShelfState::new();
//! let widget = Product::new("p-1", "SKU1", 100, "Widget", 9.99, "2030-01-01")
//!     .with_tag("tag-a");
//!
//! shelf.place(widget).unwrap();
//! assert_eq!(shelf.head().map(|p| p.name.as_str()), Some("Widget"));
//! ```

pub mod error;
pub mod shelf;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use shelf::ShelfState;
pub use types::*;
