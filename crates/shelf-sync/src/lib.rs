//! # shelf-sync: Shelf State Synchronization
//!
//! Keeps a smart shelf's in-memory product list, its on-disk snapshot and
//! the remote per-shelf inventory counts consistent as tags are scanned
//! and catalog data changes.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelf Sync Architecture                          │
//! │                                                                         │
//! │   tag reader            remote catalog             display             │
//! │  "reader.tag.*"        "cloud.update.*"     "*.product.current"        │
//! │        │                      │                      ▲                  │
//! │        ▼                      ▼                      │                  │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                       Hub<ShelfEvent> (bus)                      │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ *.tag.*, *.update.*                    │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         ShelfEngine                              │  │
//! │  │                                                                  │  │
//! │  │  waits on ReadyGate → publishes head → handles events in order   │  │
//! │  └──────┬───────────────────────┬──────────────────────┬────────────┘  │
//! │         ▼                       ▼                      ▼                │
//! │  ┌──────────────┐     ┌──────────────────┐    ┌──────────────────┐     │
//! │  │CatalogClient │     │ InventoryStore   │    │ SnapshotStore    │     │
//! │  │(code, lot)   │     │ +1 / -1 per shelf│    │ .products.json   │     │
//! │  └──────────────┘     └──────────────────┘    └──────────────────┘     │
//! │                                                                         │
//! │  Remote calls and file I/O run through a bounded WorkerPool.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`aggregate`] - Inventory counter read-modify-write helpers
//! - [`bus`] - Dotted topic keys with wildcards and the pub/sub hub
//! - [`config`] - TOML configuration with environment overrides
//! - [`engine`] - The shelf state owner and its event handlers
//! - [`error`] - Sync error types
//! - [`event`] - Bus payloads
//! - [`gate`] - Display readiness latch
//! - [`worker`] - Bounded pool for remote calls and blocking I/O
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelf_sync::{Hub, ReadyGate, ShelfEngine, WorkerPool};
//!
//! let hub = Hub::new(64);
//! let engine = ShelfEngine::builder(config.shelf_id())
//!     .with_hub(hub.clone())
//!     .with_catalog(catalog)
//!     .with_inventory(inventory)
//!     .with_snapshots(snapshots)
//!     .with_workers(WorkerPool::new(4))
//!     .build()?;
//!
//! let gate = ReadyGate::new();
//! let handle = engine.start(gate.clone()).await;
//! gate.open();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod gate;
pub mod worker;

// =============================================================================
// Re-exports
// =============================================================================

pub use aggregate::{record_placement, record_removal, QuantityChange};
pub use bus::{Hub, Key, Publisher, Subscription};
pub use config::{RemoteMode, ShelfConfig};
pub use engine::{EngineBuilder, EngineHandle, ShelfEngine, TagOutcome, UpdateOutcome};
pub use error::{SyncError, SyncResult};
pub use event::ShelfEvent;
pub use gate::ReadyGate;
pub use worker::WorkerPool;
