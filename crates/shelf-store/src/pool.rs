//! # Database Pool Management
//!
//! Connection pool creation, table naming and schema bootstrap for the
//! SQLite-backed remote stores.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Daemon startup                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(url).tables(catalog, inventory)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Validate names + pool + schema          │
//! │       │                                                                 │
//! │       ├──► db.catalog()    → SqliteCatalog    (CatalogClient)          │
//! │       └──► db.inventory()  → SqliteInventory  (InventoryStore)         │
//! │                                                                         │
//! │  Both handles share one SqlitePool.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Table Names
//! Table names are spliced into SQL text, so they are validated as plain
//! identifiers before the pool is created. Values are always bound.

use std::str::FromStr;
use std::time::Duration;

use shelf_core::validation::validate_identifier;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::catalog::SqliteCatalog;
use crate::error::{StoreError, StoreResult};
use crate::inventory::SqliteInventory;

/// URL of a private in-memory database.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

pub const DEFAULT_CATALOG_TABLE: &str = "products";
pub const DEFAULT_INVENTORY_TABLE: &str = "shelf_inventory";

// =============================================================================
// Configuration
// =============================================================================

/// Names of the tables backing the catalog and the inventory aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub catalog: String,
    pub inventory: String,
}

impl TableNames {
    pub fn new(catalog: impl Into<String>, inventory: impl Into<String>) -> Self {
        TableNames {
            catalog: catalog.into(),
            inventory: inventory.into(),
        }
    }

    /// Checks that both names are safe to splice into SQL.
    pub fn validate(&self) -> StoreResult<()> {
        validate_identifier("catalog_table", &self.catalog)
            .and_then(|_| validate_identifier("inventory_table", &self.inventory))
            .map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames::new(DEFAULT_CATALOG_TABLE, DEFAULT_INVENTORY_TABLE)
    }
}

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("sqlite://shelf.db")
///     .tables("products", "shelf_inventory")
///     .max_connections(5);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// sqlx SQLite URL (`sqlite://path/to/file.db` or `sqlite::memory:`).
    pub database_url: String,

    /// Catalog and inventory table names.
    pub tables: TableNames,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Whether to create missing tables on connect.
    /// Default: true
    pub create_schema: bool,
}

impl DbConfig {
    /// Creates a configuration for the given database URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        DbConfig {
            database_url: database_url.into(),
            tables: TableNames::default(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(30),
            create_schema: true,
        }
    }

    /// Creates an in-memory database configuration (for tests and dry runs).
    ///
    /// An in-memory database lives as long as its single connection, so the
    /// pool is pinned to one connection that never idles out.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY_URL)
        }
    }

    /// Sets the catalog and inventory table names.
    pub fn tables(mut self, catalog: impl Into<String>, inventory: impl Into<String>) -> Self {
        self.tables = TableNames::new(catalog, inventory);
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to create missing tables on connect.
    pub fn create_schema(mut self, create: bool) -> Self {
        self.create_schema = create;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the SQLite pool and the configured table names.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    tables: TableNames,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Validates the configured table names
    /// 2. Configures SQLite (WAL + NORMAL sync for file databases)
    /// 3. Creates the connection pool
    /// 4. Creates missing tables (if enabled)
    pub async fn new(config: DbConfig) -> StoreResult<Self> {
        config.tables.validate()?;

        info!(url = %config.database_url, "Initializing database connection");

        let mut connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout);

        if config.is_in_memory() {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            connect_options = connect_options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true);
        }

        debug!("Connection options configured");

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            tables: config.tables,
        };

        if config.create_schema {
            db.ensure_schema().await?;
        }

        Ok(db)
    }

    /// Creates the catalog and inventory tables if they don't exist.
    ///
    /// Idempotent: safe to run on every start.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        let catalog = &self.tables.catalog;
        let inventory = &self.tables.inventory;

        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {catalog} (
                    product_id      TEXT PRIMARY KEY,
                    code            TEXT NOT NULL,
                    lot             INTEGER NOT NULL,
                    name            TEXT NOT NULL,
                    price           REAL NOT NULL,
                    expiration_date TEXT NOT NULL,
                    in_promo        INTEGER,
                    promo_price     REAL
                )"
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{catalog}_code_lot ON {catalog} (code, lot)"),
            format!(
                "CREATE TABLE IF NOT EXISTS {inventory} (
                    record_id  TEXT PRIMARY KEY,
                    shelf_id   INTEGER NOT NULL,
                    product_id TEXT NOT NULL,
                    quantity   INTEGER NOT NULL CHECK (quantity > 0)
                )"
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{inventory}_shelf_product \
                 ON {inventory} (shelf_id, product_id)"
            ),
        ];

        for sql in &statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::SchemaFailed(e.to_string()))?;
        }

        info!(%catalog, %inventory, "Schema ready");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    /// Returns the catalog client backed by this pool.
    pub fn catalog(&self) -> SqliteCatalog {
        SqliteCatalog::new(self.pool.clone(), self.tables.catalog.clone())
    }

    /// Returns the inventory aggregate client backed by this pool.
    pub fn inventory(&self) -> SqliteInventory {
        SqliteInventory::new(self.pool.clone(), self.tables.inventory.clone())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        // Schema bootstrap is idempotent
        db.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_unsafe_table_name() {
        let config = DbConfig::in_memory().tables("products; DROP TABLE x", "inv");
        let err = Database::new(config).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");
        let url = format!("sqlite://{}", path.display());

        let db = Database::new(DbConfig::new(url)).await.unwrap();
        assert!(db.health_check().await);
        db.close().await;

        assert!(path.exists());
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("sqlite://shelf.db")
            .tables("catalog", "counts")
            .max_connections(10)
            .connect_timeout(Duration::from_secs(2))
            .create_schema(false);

        assert_eq!(config.tables, TableNames::new("catalog", "counts"));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert!(!config.create_schema);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
