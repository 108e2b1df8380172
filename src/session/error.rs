//! Session-level error aggregation.

use thiserror::Error;

use super::config::ConfigError;
use super::engine::ReplicationError;
use crate::core::{DecodeError, StoreError, SyncError};
use crate::transport::TransportError;

/// Top-level DGR errors.
#[derive(Debug, Error)]
pub enum DgrError {
    /// Record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed datagram.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Bad or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Socket error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Master timed out or went silent.
    #[error("replication error: {0}")]
    Replication(#[from] ReplicationError),
}

impl From<SyncError> for DgrError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Store(err) => DgrError::Store(err),
            SyncError::Decode(err) => DgrError::Decode(err),
        }
    }
}

impl DgrError {
    /// Check if this error must abort the session.
    ///
    /// Only read-side store errors are recoverable.
    pub fn is_fatal(&self) -> bool {
        match self {
            DgrError::Store(err) => err.is_fatal(),
            _ => true,
        }
    }
}

/// Result type for DGR operations.
pub type DgrResult<T> = Result<T, DgrError>;
