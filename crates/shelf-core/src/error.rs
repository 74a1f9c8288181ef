//! # Error Types
//!
//! Domain-specific error types for shelf-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shelf-core errors (this file)                                         │
//! │  ├── CoreError        - Shelf invariant violations                     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shelf-store errors (separate crate)                                   │
//! │  └── StoreError       - Remote store / snapshot failures               │
//! │                                                                         │
//! │  shelf-sync errors (separate crate)                                    │
//! │  └── SyncError        - Config, worker pool, bus failures              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Shelf domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A product was placed without a tag binding.
    #[error("Product {product_id} has no tag binding")]
    UnboundProduct { product_id: String },

    /// A second product was placed for a tag already on the shelf.
    ///
    /// ## When This Occurs
    /// - Calling `place` without checking `contains_tag` first
    /// - Loading a snapshot written by a buggy producer
    #[error("Tag {tag_id} is already on the shelf")]
    DuplicateTag { tag_id: String },

    /// Position is outside the shelf.
    #[error("Shelf position {index} out of range (len {len})")]
    PositionOutOfRange { index: usize, len: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., SQL identifier with spaces).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two shelf entries with the same tag).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
