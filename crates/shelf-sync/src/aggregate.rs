//! # Inventory Aggregate Helpers
//!
//! Read-modify-write on the remote per-shelf, per-product counter.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Aggregate Record Lifecycle                          │
//! │                                                                         │
//! │   placement          placement          removal           removal       │
//! │  (no record)  ──►  qty 1  ──────►  qty 2  ──────►  qty 1  ──────►  ∅    │
//! │    Created                Incremented(2)   Decremented(1)   Deleted     │
//! │                                                                         │
//! │   removal with no record  ──►  Missing (logged, nothing written)       │
//! │                                                                         │
//! │   A record never sits at quantity 0.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The find and the write are separate remote calls with no transaction
//! between them. Serializing handlers inside one engine keeps a single shelf
//! consistent; two engines sharing a shelf id can still race.

use shelf_store::{InventoryStore, StoreResult};
use tracing::{debug, warn};

/// What a helper did to the remote counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// A new record was created with quantity 1.
    Created,
    /// An existing record was raised to this quantity.
    Incremented(u32),
    /// An existing record was lowered to this quantity.
    Decremented(u32),
    /// The record held the last unit and was deleted.
    Deleted,
    /// Removal found no record to decrement.
    Missing,
}

/// Counts one more unit of `product_id` on `shelf_id`.
pub async fn record_placement(
    store: &dyn InventoryStore,
    shelf_id: i64,
    product_id: &str,
) -> StoreResult<QuantityChange> {
    match store.find_record(shelf_id, product_id).await? {
        None => {
            store.create_record(shelf_id, product_id, 1).await?;
            debug!(shelf_id, %product_id, "Aggregate record created");
            Ok(QuantityChange::Created)
        }
        Some(record) => {
            let quantity = record.quantity.saturating_add(1);
            store.set_quantity(&record.record_id, quantity).await?;
            debug!(shelf_id, %product_id, quantity, "Aggregate incremented");
            Ok(QuantityChange::Incremented(quantity))
        }
    }
}

/// Counts one unit of `product_id` fewer on `shelf_id`.
pub async fn record_removal(
    store: &dyn InventoryStore,
    shelf_id: i64,
    product_id: &str,
) -> StoreResult<QuantityChange> {
    match store.find_record(shelf_id, product_id).await? {
        None => {
            warn!(shelf_id, %product_id, "No aggregate record to decrement");
            Ok(QuantityChange::Missing)
        }
        Some(record) if record.quantity <= 1 => {
            store.delete_record(&record.record_id).await?;
            debug!(shelf_id, %product_id, "Aggregate record deleted");
            Ok(QuantityChange::Deleted)
        }
        Some(record) => {
            let quantity = record.quantity - 1;
            store.set_quantity(&record.record_id, quantity).await?;
            debug!(shelf_id, %product_id, quantity, "Aggregate decremented");
            Ok(QuantityChange::Decremented(quantity))
        }
    }
}
