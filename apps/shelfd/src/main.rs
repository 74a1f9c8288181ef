//! # shelfd
//!
//! Smart shelf daemon: wires the shelf engine to its catalog, inventory and
//! snapshot collaborators and runs until Ctrl+C or SIGTERM.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. tracing (RUST_LOG, default info)                                   │
//! │  2. ShelfConfig: defaults → shelf.toml → SHELF_* env                   │
//! │  3. collaborators: SQLite pool or in-memory dry run                    │
//! │  4. engine.start(gate)   (restores .products.json)                     │
//! │  5. display opens the gate, console feeds stdin into the bus           │
//! │  6. wait for signal → engine shutdown → pool close                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod console;
mod display;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shelf_core::Product;
use shelf_store::{
    CatalogClient, Database, DbConfig, InventoryStore, JsonSnapshotStore, MemoryCatalog,
    MemoryInventory,
};
use shelf_sync::{Hub, Key, ReadyGate, ShelfConfig, ShelfEngine, ShelfEvent, WorkerPool};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Remote collaborators plus the pool backing them, if any.
struct Remote {
    catalog: Arc<dyn CatalogClient>,
    inventory: Arc<dyn InventoryStore>,
    db: Option<Database>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting smart shelf daemon...");

    let config = ShelfConfig::load_or_default(None);
    info!(
        shelf_id = config.shelf_id(),
        name = %config.shelf.name,
        mode = %config.remote.mode,
        snapshot = %config.snapshot_path().display(),
        "Configuration loaded"
    );

    let remote = connect_remote(&config).await?;
    let workers = WorkerPool::new(config.workers.size);
    let hub: Hub<ShelfEvent> = Hub::new(config.bus.channel_capacity);

    let engine = ShelfEngine::builder(config.shelf_id())
        .with_hub(hub.clone())
        .with_catalog(remote.catalog)
        .with_inventory(remote.inventory)
        .with_snapshots(Arc::new(JsonSnapshotStore::new(config.snapshot_path())))
        .with_workers(workers.clone())
        .build()
        .context("Failed to build shelf engine")?;

    let gate = ReadyGate::new();
    let handle = engine.start(gate.clone()).await;

    let display = tokio::spawn(display::run(hub.clone(), gate));
    let console = tokio::spawn(console::run(
        BufReader::new(tokio::io::stdin()),
        hub.publisher(Key::parse("console").context("Invalid console key")?),
    ));

    shutdown_signal().await;

    handle.shutdown().await;
    workers.close();
    console.abort();
    display.abort();

    if let Some(db) = remote.db {
        db.close().await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Builds the catalog and inventory collaborators for the configured mode.
async fn connect_remote(config: &ShelfConfig) -> anyhow::Result<Remote> {
    let seed = config.remote.catalog_seed.as_deref();

    if config.is_dry_run() {
        let catalog = match seed {
            Some(path) => MemoryCatalog::from_json_file(path)
                .with_context(|| format!("Failed to load catalog seed {}", path.display()))?,
            None => {
                warn!("Dry run without a catalog seed: every tag will be unknown");
                MemoryCatalog::new()
            }
        };
        info!(products = catalog.len(), "Using in-memory catalog and inventory");

        return Ok(Remote {
            catalog: Arc::new(catalog),
            inventory: Arc::new(MemoryInventory::new()),
            db: None,
        });
    }

    let db_config = DbConfig::new(config.remote.database_url.as_str())
        .tables(
            config.remote.catalog_table.as_str(),
            config.remote.inventory_table.as_str(),
        )
        .max_connections(config.remote.max_connections)
        .connect_timeout(Duration::from_secs(config.remote.connect_timeout_secs))
        .create_schema(config.remote.create_schema);

    let db = Database::new(db_config)
        .await
        .context("Failed to open catalog database")?;

    if !db.health_check().await {
        anyhow::bail!(
            "Catalog database at {} is not answering queries",
            config.remote.database_url
        );
    }
    info!("Connected to catalog database");

    if let Some(path) = seed {
        seed_catalog(&db, path).await?;
    }

    Ok(Remote {
        catalog: Arc::new(db.catalog()),
        inventory: Arc::new(db.inventory()),
        db: Some(db),
    })
}

/// Upserts a JSON array of products into the SQLite catalog.
async fn seed_catalog(db: &Database, path: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog seed {}", path.display()))?;
    let products: Vec<Product> =
        serde_json::from_str(&raw).context("Catalog seed is not a JSON product array")?;

    let catalog = db.catalog();
    for product in &products {
        catalog.upsert(product).await?;
    }

    info!(count = products.len(), "Catalog seeded");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
