//! # Shelf State Synchronization Engine
//!
//! Owns the in-memory shelf and keeps the durable snapshot and the remote
//! inventory aggregate in line with it.
//!
//! ## Event Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ShelfEngine                                      │
//! │                                                                         │
//! │  *.tag.*  ──┐                                                           │
//! │             ├──► one Subscription ──► consumer task (one at a time)    │
//! │  *.update.* ┘                                                           │
//! │                                                                         │
//! │  on_tag(tag)                                                           │
//! │   1. catalog lookup (code, lot)        ── miss ──► warn, stop          │
//! │   ┌──── state write lock ───────────────────────────────────────────┐  │
//! │   │ 2. toggle: tag present → remove, absent → place                 │  │
//! │   │ 3. persist snapshot                (blocking pool)              │  │
//! │   │ 4. aggregate +1 / -1               (worker pool)                │  │
//! │   │ 5. publish head → shelf.product.current                         │  │
//! │   └─────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  on_update(product)                                                    │
//! │   ┌──── state write lock ───────────────────────────────────────────┐  │
//! │   │ 1. first entry with same (code, lot) → replace in place         │  │
//! │   │ 2. persist snapshot                                             │  │
//! │   │ 3. republish head only if index 0 changed                       │  │
//! │   └─────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Policy
//! Remote and snapshot failures are logged and absorbed. A failed catalog
//! lookup reads as "no match"; a failed aggregate write leaves the shelf
//! mutated; a failed snapshot write leaves memory authoritative until the
//! next successful write. Handlers never return errors.

use std::sync::Arc;

use shelf_core::validation::{validate_product, validate_tag};
use shelf_core::{Product, ProductTag, ShelfState};
use shelf_store::{CatalogClient, InventoryStore, SnapshotStore, StoreResult};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::aggregate::{record_placement, record_removal, QuantityChange};
use crate::bus::{self, Hub, Key, Subscription};
use crate::error::{SyncError, SyncResult};
use crate::event::ShelfEvent;
use crate::gate::ReadyGate;
use crate::worker::WorkerPool;

// =============================================================================
// Outcomes
// =============================================================================

/// Result of handling one tag-presence event.
#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    /// The tag was new; its product was appended at `index`.
    Placed { index: usize, product: Product },
    /// The tag was on the shelf at `index` and has been taken off.
    Removed { index: usize, product: Product },
    /// No catalog product for the tag's code and lot (or the lookup failed).
    UnknownTag,
    /// The tag was malformed and ignored.
    Rejected { reason: String },
}

/// Result of handling one remote product-update event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The entry at `index` was replaced; `republished` if it was the head.
    Patched { index: usize, republished: bool },
    /// No entry with the product's code and lot.
    NotOnShelf,
    /// The product was malformed or would break the shelf's invariants.
    Rejected { reason: String },
}

// =============================================================================
// Engine
// =============================================================================

/// The shelf state owner.
///
/// Every mutation goes through `on_tag` or `on_update`, which hold the state
/// write lock from the toggle test through publication. Calls made directly
/// and calls made by the consumer task are therefore serialized.
pub struct ShelfEngine {
    shelf_id: i64,
    hub: Hub<ShelfEvent>,
    catalog: Arc<dyn CatalogClient>,
    inventory: Arc<dyn InventoryStore>,
    snapshots: Arc<dyn SnapshotStore>,
    workers: WorkerPool,
    state: RwLock<ShelfState>,
}

impl std::fmt::Debug for ShelfEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShelfEngine")
            .field("shelf_id", &self.shelf_id)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl ShelfEngine {
    /// Starts building an engine for `shelf_id`.
    pub fn builder(shelf_id: i64) -> EngineBuilder {
        EngineBuilder::new(shelf_id)
    }

    /// The shelf this engine counts inventory for.
    pub fn shelf_id(&self) -> i64 {
        self.shelf_id
    }

    /// Copy of the shelf contents, in order.
    pub async fn products(&self) -> Vec<Product> {
        self.state.read().await.products().to_vec()
    }

    /// The product currently shown to consumers.
    pub async fn head(&self) -> Option<Product> {
        self.state.read().await.head().cloned()
    }

    /// Copy of the whole shelf state.
    pub async fn state(&self) -> ShelfState {
        self.state.read().await.clone()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Replaces the in-memory shelf with the stored snapshot.
    ///
    /// Returns false and keeps the current shelf if the snapshot can't be
    /// read.
    pub async fn load_snapshot(&self) -> bool {
        let snapshots = Arc::clone(&self.snapshots);

        match self.workers.run_blocking(move || snapshots.load()).await {
            Ok(Ok(loaded)) => {
                info!(products = loaded.len(), "Shelf restored from snapshot");
                *self.state.write().await = loaded;
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Snapshot unreadable, keeping current shelf");
                false
            }
            Err(e) => {
                warn!(error = %e, "Snapshot load did not run, keeping current shelf");
                false
            }
        }
    }

    /// Loads the snapshot, subscribes to tag and update events, and spawns
    /// the consumer task.
    ///
    /// The task waits for `gate` before publishing the head product and
    /// handling events. Events published in the meantime are buffered.
    pub async fn start(self, gate: ReadyGate) -> EngineHandle {
        self.load_snapshot().await;

        let engine = Arc::new(self);
        let subscription = engine
            .hub
            .subscribe([bus::tag_events(), bus::update_events()]);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(Self::run(
            Arc::clone(&engine),
            subscription,
            gate,
            shutdown_rx,
        ));

        info!(shelf_id = engine.shelf_id, "Shelf engine started");

        EngineHandle {
            engine,
            shutdown_tx,
            task,
        }
    }

    /// Consumer loop: one event at a time until shutdown.
    async fn run(
        engine: Arc<Self>,
        mut subscription: Subscription<ShelfEvent>,
        gate: ReadyGate,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tokio::select! {
            _ = gate.wait() => debug!("Systems ready"),
            _ = shutdown_rx.recv() => {
                info!("Shelf engine stopped before systems were ready");
                return;
            }
        }

        engine.publish_current().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Shelf engine received shutdown");
                    break;
                }

                next = subscription.recv() => match next {
                    Some((key, event)) => engine.handle(&key, event).await,
                    None => {
                        warn!("Bus closed");
                        break;
                    }
                }
            }
        }

        info!("Shelf engine stopped");
    }

    /// Routes a bus event to its handler.
    pub async fn handle(&self, key: &Key, event: ShelfEvent) {
        match event {
            ShelfEvent::Tag(tag) => {
                let outcome = self.on_tag(tag).await;
                debug!(%key, ?outcome, "Tag event handled");
            }
            ShelfEvent::Update(product) => {
                let outcome = self.on_update(product).await;
                debug!(%key, ?outcome, "Update event handled");
            }
            ShelfEvent::CurrentProduct(_) => {
                debug!(%key, "Ignoring current-product event on an inbound key");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    /// Handles a tag-presence event: first sighting places, second removes.
    pub async fn on_tag(&self, tag: ProductTag) -> TagOutcome {
        if let Err(e) = validate_tag(&tag) {
            warn!(error = %e, "Ignoring malformed tag");
            return TagOutcome::Rejected {
                reason: e.to_string(),
            };
        }

        let Some(resolved) = self.resolve(&tag).await else {
            warn!(tag_id = %tag.tag_id, code = %tag.code, lot = tag.lot, "Unknown tag");
            return TagOutcome::UnknownTag;
        };

        let mut state = self.state.write().await;

        let outcome = match state.remove_tag(&tag.tag_id) {
            Some((index, product)) => {
                info!(tag_id = %tag.tag_id, index, name = %product.name, "Product removed");
                TagOutcome::Removed { index, product }
            }
            None => match state.place(resolved.clone()) {
                Ok(index) => {
                    info!(tag_id = %tag.tag_id, index, name = %resolved.name, "Product placed");
                    TagOutcome::Placed {
                        index,
                        product: resolved,
                    }
                }
                Err(e) => {
                    error!(tag_id = %tag.tag_id, error = %e, "Could not place product");
                    return TagOutcome::Rejected {
                        reason: e.to_string(),
                    };
                }
            },
        };

        self.persist(&state).await;

        match &outcome {
            TagOutcome::Placed { product, .. } => {
                let result = self
                    .workers
                    .run(record_placement(
                        self.inventory.as_ref(),
                        self.shelf_id,
                        &product.product_id,
                    ))
                    .await;
                self.log_aggregate("placement", &product.product_id, result);
            }
            TagOutcome::Removed { product, .. } => {
                let result = self
                    .workers
                    .run(record_removal(
                        self.inventory.as_ref(),
                        self.shelf_id,
                        &product.product_id,
                    ))
                    .await;
                self.log_aggregate("removal", &product.product_id, result);
            }
            TagOutcome::UnknownTag | TagOutcome::Rejected { .. } => {}
        }

        self.publish_head(&state).await;
        outcome
    }

    /// Handles a remote product-update event.
    ///
    /// Replaces the first entry with the same code and lot, keeping its
    /// position and its tag binding. Any `tagId` on the update is ignored.
    /// Never touches the inventory aggregate.
    pub async fn on_update(&self, product: Product) -> UpdateOutcome {
        if let Err(e) = validate_product(&product) {
            warn!(error = %e, "Ignoring malformed product update");
            return UpdateOutcome::Rejected {
                reason: e.to_string(),
            };
        }

        let mut state = self.state.write().await;

        let Some(index) = state.position_of_batch(&product.code, product.lot) else {
            debug!(code = %product.code, lot = product.lot, "Update is not for this shelf");
            return UpdateOutcome::NotOnShelf;
        };

        if let Err(e) = state.replace_at(index, product) {
            warn!(index, error = %e, "Rejected product update");
            return UpdateOutcome::Rejected {
                reason: e.to_string(),
            };
        }

        self.persist(&state).await;

        let republished = index == 0;
        if republished {
            self.publish_head(&state).await;
        }

        info!(index, republished, "Shelf entry updated");
        UpdateOutcome::Patched { index, republished }
    }

    /// Publishes the current head product.
    pub async fn publish_current(&self) {
        let state = self.state.read().await;
        self.publish_head(&state).await;
    }

    // -------------------------------------------------------------------------
    // Collaborator calls
    // -------------------------------------------------------------------------

    /// Catalog lookup; first match wins, failures read as no match.
    async fn resolve(&self, tag: &ProductTag) -> Option<Product> {
        let lookup = self.catalog.find_by_code_lot(&tag.code, tag.lot);

        let matches = match self.workers.run(lookup).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                error!(code = %tag.code, lot = tag.lot, error = %e, "Catalog lookup failed");
                return None;
            }
            Err(e) => {
                error!(code = %tag.code, lot = tag.lot, error = %e, "Catalog lookup did not run");
                return None;
            }
        };

        if matches.len() > 1 {
            debug!(code = %tag.code, lot = tag.lot, count = matches.len(), "Several catalog matches, using the first");
        }

        matches
            .into_iter()
            .next()
            .map(|product| product.with_tag(tag.tag_id.clone()))
    }

    async fn persist(&self, state: &ShelfState) {
        let snapshots = Arc::clone(&self.snapshots);
        let snapshot = state.clone();

        match self.workers.run_blocking(move || snapshots.save(&snapshot)).await {
            Ok(Ok(())) => debug!(products = state.len(), "Snapshot written"),
            Ok(Err(e)) => error!(error = %e, "Snapshot write failed"),
            Err(e) => error!(error = %e, "Snapshot write did not run"),
        }
    }

    fn log_aggregate(
        &self,
        op: &str,
        product_id: &str,
        result: SyncResult<StoreResult<QuantityChange>>,
    ) {
        match result {
            Ok(Ok(change)) => {
                debug!(op, shelf_id = self.shelf_id, %product_id, ?change, "Aggregate updated")
            }
            Ok(Err(e)) => {
                error!(op, shelf_id = self.shelf_id, %product_id, error = %e, "Aggregate update failed")
            }
            Err(e) => {
                error!(op, shelf_id = self.shelf_id, %product_id, error = %e, "Aggregate update did not run")
            }
        }
    }

    async fn publish_head(&self, state: &ShelfState) {
        let head = state.head().cloned();
        let name = head.as_ref().map(|p| p.name.clone());

        let delivered = self
            .hub
            .publish(bus::current_product(), ShelfEvent::CurrentProduct(head))
            .await;

        debug!(head = ?name, delivered, "Head product published");
    }
}

// =============================================================================
// Engine Handle
// =============================================================================

/// Handle to a started engine.
///
/// Dropping the handle without calling `shutdown` also stops the consumer
/// task.
#[derive(Debug)]
pub struct EngineHandle {
    engine: Arc<ShelfEngine>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// The running engine, for direct calls and queries.
    pub fn engine(&self) -> &Arc<ShelfEngine> {
        &self.engine
    }

    /// Copy of the shelf contents, in order.
    pub async fn products(&self) -> Vec<Product> {
        self.engine.products().await
    }

    /// The product currently shown to consumers.
    pub async fn head(&self) -> Option<Product> {
        self.engine.head().await
    }

    /// Stops the consumer task and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!(error = %e, "Shelf engine task failed");
        }
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for `ShelfEngine`.
pub struct EngineBuilder {
    shelf_id: i64,
    hub: Option<Hub<ShelfEvent>>,
    catalog: Option<Arc<dyn CatalogClient>>,
    inventory: Option<Arc<dyn InventoryStore>>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    workers: Option<WorkerPool>,
}

impl EngineBuilder {
    pub fn new(shelf_id: i64) -> Self {
        EngineBuilder {
            shelf_id,
            hub: None,
            catalog: None,
            inventory: None,
            snapshots: None,
            workers: None,
        }
    }

    pub fn with_hub(mut self, hub: Hub<ShelfEvent>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogClient>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_inventory(mut self, inventory: Arc<dyn InventoryStore>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Sets the worker pool. Default: `WorkerPool::default()`.
    pub fn with_workers(mut self, workers: WorkerPool) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Builds the engine with an empty shelf.
    pub fn build(self) -> SyncResult<ShelfEngine> {
        let missing = |what: &str| SyncError::InvalidConfig(format!("{what} required"));

        Ok(ShelfEngine {
            shelf_id: self.shelf_id,
            hub: self.hub.ok_or_else(|| missing("Bus hub"))?,
            catalog: self.catalog.ok_or_else(|| missing("Catalog client"))?,
            inventory: self.inventory.ok_or_else(|| missing("Inventory store"))?,
            snapshots: self.snapshots.ok_or_else(|| missing("Snapshot store"))?,
            workers: self.workers.unwrap_or_default(),
            state: RwLock::new(ShelfState::new()),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
