//! # shelf-store: Collaborator Stores for the Smart Shelf
//!
//! Everything the shelf engine reads from or writes to outside its own
//! memory: the product catalog, the remote inventory aggregate and the
//! durable shelf snapshot.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Smart Shelf Data Flow                            │
//! │                                                                         │
//! │  ShelfEngine (shelf-sync)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  shelf-store (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌─────────────────┐  │   │
//! │  │   │ CatalogClient │  │ InventoryStore │  │  SnapshotStore  │  │   │
//! │  │   │               │  │                │  │                 │  │   │
//! │  │   │ SqliteCatalog │  │ SqliteInventory│  │ JsonSnapshot    │  │   │
//! │  │   │ MemoryCatalog │  │ MemoryInventory│  │ MemorySnapshot  │  │   │
//! │  │   └───────┬───────┘  └───────┬────────┘  └────────┬────────┘  │   │
//! │  │           └──────────┬───────┘                     │           │   │
//! │  │                      ▼                             ▼           │   │
//! │  │              Database (pool.rs)            ~/.products.json    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, table names, schema bootstrap
//! - [`catalog`] - Product lookup by code and lot
//! - [`inventory`] - Per-shelf quantity counters
//! - [`snapshot`] - Durable shelf file
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelf_store::{CatalogClient, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("sqlite://shelf.db")).await?;
//! let matches = db.catalog().find_by_code_lot("SKU1", 100).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod inventory;
pub mod pool;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::{CatalogClient, MemoryCatalog, SqliteCatalog};
pub use error::{StoreError, StoreResult};
pub use inventory::{InventoryStore, MemoryInventory, SqliteInventory};
pub use pool::{Database, DbConfig, TableNames};
pub use snapshot::{JsonSnapshotStore, MemorySnapshotStore, SnapshotStore, SNAPSHOT_FILE_NAME};
