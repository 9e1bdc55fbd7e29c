//! Error types for grid mutation and synchronization.

use thiserror::Error;

/// Grid errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Cell ({row}, {col}) is outside the {size}x{size} grid")]
    OutOfBounds { row: usize, col: usize, size: usize },
    #[error("Grid size mismatch: expected {expected}x{expected}, got {actual}x{actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Synchronization errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),
    #[error("Transport lost: {0}")]
    TransportLost(String),
    #[error("Room rejected join: {0}")]
    RoomFull(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
