//! # Shelf Configuration
//!
//! Configuration management for the shelf daemon and engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHELF_ID=7                                                         │
//! │     SHELF_REMOTE_MODE=memory                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/shelf/shelf.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.smartshelf.shelf/shelf.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     shelf 1, ~/.products.json, SQLite remote                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [shelf]
//! id = 1
//! name = "Aisle 3, top"
//!
//! [snapshot]
//! path = "/home/pi/.products.json"
//!
//! [remote]
//! mode = "sqlite"             # sqlite | memory
//! database_url = "sqlite://shelf.db"
//! catalog_table = "products"
//! inventory_table = "shelf_inventory"
//! create_schema = true
//! max_connections = 5
//! connect_timeout_secs = 30
//! # catalog_seed = "catalog.json"   # JSON product array loaded at startup
//!
//! [workers]
//! size = 4
//!
//! [bus]
//! channel_capacity = 64
//! ```

use serde::{Deserialize, Serialize};
use shelf_core::validation::validate_identifier;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bus::DEFAULT_CHANNEL_CAPACITY;
use crate::error::{SyncError, SyncResult};
use crate::worker::DEFAULT_WORKERS;

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "shelf.toml";

// =============================================================================
// Remote Mode
// =============================================================================

/// Which backend serves the catalog and inventory aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteMode {
    /// SQLite database reached through a connection pool.
    #[default]
    Sqlite,

    /// In-process stores, nothing leaves the machine (dry run).
    Memory,
}

impl RemoteMode {
    /// Returns true if no remote connection is made.
    pub fn is_dry_run(&self) -> bool {
        matches!(self, RemoteMode::Memory)
    }
}

impl std::fmt::Display for RemoteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteMode::Sqlite => write!(f, "sqlite"),
            RemoteMode::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for RemoteMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "remote" => Ok(RemoteMode::Sqlite),
            "memory" | "dryrun" | "dry_run" | "dry-run" => Ok(RemoteMode::Memory),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown remote mode: '{}'. Valid options: sqlite, memory",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Identity of the shelf this process drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfSection {
    /// Shelf id used as the inventory aggregate key.
    #[serde(default = "default_shelf_id")]
    pub id: i64,

    /// Human-readable shelf name.
    #[serde(default = "default_shelf_name")]
    pub name: String,
}

fn default_shelf_id() -> i64 {
    1
}

fn default_shelf_name() -> String {
    "Smart Shelf".to_string()
}

impl Default for ShelfSection {
    fn default() -> Self {
        ShelfSection {
            id: default_shelf_id(),
            name: default_shelf_name(),
        }
    }
}

/// Where the durable snapshot lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSection {
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,
}

fn default_snapshot_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(shelf_store::SNAPSHOT_FILE_NAME)
}

impl Default for SnapshotSection {
    fn default() -> Self {
        SnapshotSection {
            path: default_snapshot_path(),
        }
    }
}

/// Catalog and inventory backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSection {
    #[serde(default)]
    pub mode: RemoteMode,

    /// sqlx SQLite URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_catalog_table")]
    pub catalog_table: String,

    #[serde(default = "default_inventory_table")]
    pub inventory_table: String,

    /// Create missing tables on start.
    #[serde(default = "default_true")]
    pub create_schema: bool,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// JSON array of products loaded into the catalog at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_seed: Option<PathBuf>,
}

fn default_database_url() -> String {
    "sqlite://shelf.db".to_string()
}

fn default_catalog_table() -> String {
    shelf_store::pool::DEFAULT_CATALOG_TABLE.to_string()
}

fn default_inventory_table() -> String {
    shelf_store::pool::DEFAULT_INVENTORY_TABLE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for RemoteSection {
    fn default() -> Self {
        RemoteSection {
            mode: RemoteMode::default(),
            database_url: default_database_url(),
            catalog_table: default_catalog_table(),
            inventory_table: default_inventory_table(),
            create_schema: true,
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            catalog_seed: None,
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSection {
    #[serde(default = "default_workers")]
    pub size: usize,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Default for WorkerSection {
    fn default() -> Self {
        WorkerSection {
            size: default_workers(),
        }
    }
}

/// Bus sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSection {
    /// Messages buffered per subscription before publishers wait.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for BusSection {
    fn default() -> Self {
        BusSection {
            channel_capacity: default_channel_capacity(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete shelf configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShelfConfig {
    #[serde(default)]
    pub shelf: ShelfSection,

    #[serde(default)]
    pub snapshot: SnapshotSection,

    #[serde(default)]
    pub remote: RemoteSection,

    #[serde(default)]
    pub workers: WorkerSection,

    #[serde(default)]
    pub bus: BusSection,
}

impl ShelfConfig {
    /// Creates a configuration with every section at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (shelf.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading shelf config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load shelf config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> SyncResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.snapshot.path.as_os_str().is_empty() {
            return Err(SyncError::InvalidConfig("snapshot.path must be set".into()));
        }

        validate_identifier("remote.catalog_table", &self.remote.catalog_table)
            .and_then(|_| validate_identifier("remote.inventory_table", &self.remote.inventory_table))
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        if self.remote.mode == RemoteMode::Sqlite && !self.remote.database_url.starts_with("sqlite:") {
            return Err(SyncError::InvalidConfig(format!(
                "remote.database_url must start with sqlite:, got: {}",
                self.remote.database_url
            )));
        }

        if self.remote.max_connections == 0 {
            return Err(SyncError::InvalidConfig(
                "remote.max_connections must be greater than 0".into(),
            ));
        }

        if self.remote.connect_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "remote.connect_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.workers.size == 0 {
            return Err(SyncError::InvalidConfig(
                "workers.size must be greater than 0".into(),
            ));
        }

        if self.bus.channel_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "bus.channel_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `SHELF_*` overrides looked up through `lookup`.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("SHELF_ID") {
            match id.parse() {
                Ok(id) => {
                    debug!(shelf_id = id, "Overriding shelf id from environment");
                    self.shelf.id = id;
                }
                Err(_) => warn!(value = %id, "Ignoring non-numeric SHELF_ID"),
            }
        }

        if let Some(name) = lookup("SHELF_NAME") {
            self.shelf.name = name;
        }

        if let Some(path) = lookup("SHELF_SNAPSHOT_PATH") {
            debug!(path = %path, "Overriding snapshot path from environment");
            self.snapshot.path = PathBuf::from(path);
        }

        if let Some(mode) = lookup("SHELF_REMOTE_MODE") {
            match mode.parse() {
                Ok(parsed) => self.remote.mode = parsed,
                Err(_) => warn!(mode = %mode, "Unknown remote mode in environment"),
            }
        }

        if let Some(url) = lookup("SHELF_DATABASE_URL") {
            self.remote.database_url = url;
        }

        if let Some(table) = lookup("SHELF_CATALOG_TABLE") {
            self.remote.catalog_table = table;
        }

        if let Some(table) = lookup("SHELF_INVENTORY_TABLE") {
            self.remote.inventory_table = table;
        }

        if let Some(size) = lookup("SHELF_WORKERS") {
            match size.parse() {
                Ok(size) => self.workers.size = size,
                Err(_) => warn!(value = %size, "Ignoring non-numeric SHELF_WORKERS"),
            }
        }

        if let Some(capacity) = lookup("SHELF_BUS_CAPACITY") {
            match capacity.parse() {
                Ok(capacity) => self.bus.channel_capacity = capacity,
                Err(_) => warn!(value = %capacity, "Ignoring non-numeric SHELF_BUS_CAPACITY"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "smartshelf", "shelf")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn shelf_id(&self) -> i64 {
        self.shelf.id
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot.path
    }

    pub fn is_dry_run(&self) -> bool {
        self.remote.mode.is_dry_run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_remote_mode_parsing() {
        assert_eq!("sqlite".parse::<RemoteMode>().unwrap(), RemoteMode::Sqlite);
        assert_eq!("memory".parse::<RemoteMode>().unwrap(), RemoteMode::Memory);
        assert_eq!("dryrun".parse::<RemoteMode>().unwrap(), RemoteMode::Memory);
        assert!("mongo".parse::<RemoteMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ShelfConfig::default();
        assert_eq!(config.shelf.id, 1);
        assert_eq!(config.remote.mode, RemoteMode::Sqlite);
        assert!(config.snapshot.path.ends_with(".products.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ShelfConfig::default();

        config.remote.catalog_table = "products; --".to_string();
        assert!(config.validate().is_err());

        config.remote.catalog_table = "products".to_string();
        config.remote.database_url = "postgres://nope".to_string();
        assert!(config.validate().is_err());

        // Dry run ignores the URL
        config.remote.mode = RemoteMode::Memory;
        assert!(config.validate().is_ok());

        config.workers.size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SHELF_ID", "7"),
            ("SHELF_REMOTE_MODE", "memory"),
            ("SHELF_SNAPSHOT_PATH", "/tmp/shelf.json"),
            ("SHELF_WORKERS", "not-a-number"),
            ("SHELF_BUS_CAPACITY", "16"),
        ]
        .into_iter()
        .collect();

        let mut config = ShelfConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.shelf_id(), 7);
        assert!(config.is_dry_run());
        assert_eq!(config.snapshot_path(), Path::new("/tmp/shelf.json"));
        assert_eq!(config.workers.size, DEFAULT_WORKERS);
        assert_eq!(config.bus.channel_capacity, 16);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ShelfConfig = toml::from_str(
            r#"
            [shelf]
            id = 3

            [remote]
            mode = "memory"
            catalog_seed = "catalog.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.shelf.id, 3);
        assert_eq!(config.shelf.name, "Smart Shelf");
        assert_eq!(config.remote.mode, RemoteMode::Memory);
        assert_eq!(config.remote.catalog_table, "products");
        assert_eq!(config.workers.size, DEFAULT_WORKERS);
    }

    #[test]
    fn test_load_reads_file_then_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.toml");
        std::fs::write(&path, "[shelf]\nid = 42\n\n[workers]\nsize = 2\n").unwrap();

        let loaded = ShelfConfig::from_file(&path).unwrap();
        assert_eq!(loaded.shelf.id, 42);
        assert_eq!(loaded.workers.size, 2);
        assert_eq!(loaded.remote.inventory_table, "shelf_inventory");

        std::fs::write(&path, "[workers]\nsize = 0\n").unwrap();
        let err = ShelfConfig::load(Some(path)).unwrap_err();
        assert!(err.is_config_error());
    }
}
