//! # Sync Error Types
//!
//! Error types for the engine, bus, worker pool and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Bus           │  │     Workers             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  InvalidKey     │  │  WorkerFailed           │ │
//! │  │  ConfigLoad     │  │                 │  │  ShuttingDown           │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Store        │  │     Domain      │                              │
//! │  │                 │  │                 │                              │
//! │  │  StoreError     │  │  CoreError      │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine's event handlers never return these; they log and degrade.
//! `SyncError` surfaces from construction, configuration and the worker pool.

use shelf_core::CoreError;
use shelf_store::StoreError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration or missing collaborator.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Bus Errors
    // =========================================================================
    /// Malformed topic key or pattern.
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    // =========================================================================
    // Worker Errors
    // =========================================================================
    /// Offloaded task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    WorkerFailed(String),

    /// Worker pool closed.
    #[error("Shelf engine is shutting down")]
    ShuttingDown,

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// Catalog, inventory or snapshot failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Shelf invariant violation.
    #[error("Shelf error: {0}")]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(err: tokio::task::JoinError) -> Self {
        SyncError::WorkerFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::InvalidKey { .. }
        )
    }
}
