//! Error types for DGR.

use thiserror::Error;

/// Errors raised by the record store and by façade reads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record with this name has been written or received.
    #[error("no record named '{name}'")]
    NotFound {
        /// Requested record name.
        name: String,
    },

    /// Destination buffer cannot hold the whole record.
    #[error("buffer too small for '{name}': record is {required} bytes, buffer is {available}")]
    BufferTooSmall {
        /// Requested record name.
        name: String,
        /// Size of the stored record.
        required: usize,
        /// Capacity of the caller's buffer.
        available: usize,
    },

    /// Caller's buffer is larger than the stored record.
    #[error("size mismatch for '{name}': buffer is {expected} bytes but record is {actual} bytes")]
    SizeMismatch {
        /// Requested record name.
        name: String,
        /// Size of the caller's buffer.
        expected: usize,
        /// Size of the stored record.
        actual: usize,
    },

    /// The store already holds its maximum number of records.
    #[error("record store is full ({capacity} records)")]
    CapacityExceeded {
        /// Configured record cap.
        capacity: usize,
    },

    /// Name is too long or contains a NUL byte.
    #[error("invalid record name: {reason}")]
    InvalidName {
        /// What is wrong with the name.
        reason: String,
    },

    /// Payload does not fit in the wire size field.
    #[error("payload for '{name}' is {size} bytes, larger than the wire format allows")]
    PayloadTooLarge {
        /// Record name.
        name: String,
        /// Payload size.
        size: usize,
    },
}

impl StoreError {
    /// Check if this error must abort the session.
    ///
    /// Read-side failures only affect the caller's buffer, everything else is
    /// a configuration error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StoreError::NotFound { .. }
                | StoreError::BufferTooSmall { .. }
                | StoreError::SizeMismatch { .. }
        )
    }
}

/// Errors that can occur when decoding a datagram.
///
/// The protocol trusts its peer, so every variant is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Name at `offset` runs to the end of the buffer without a terminator.
    #[error("unterminated record name at offset {offset}")]
    UnterminatedName {
        /// Offset of the first name byte.
        offset: usize,
    },

    /// Name at `offset` is not valid UTF-8 or exceeds the name limit.
    #[error("invalid record name at offset {offset}")]
    InvalidName {
        /// Offset of the first name byte.
        offset: usize,
    },

    /// Buffer ends before a size field or payload is complete.
    #[error("truncated datagram at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Offset where the missing field starts.
        offset: usize,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Size field holds a negative value.
    #[error("negative size {size} for record '{name}'")]
    NegativeSize {
        /// Record name.
        name: String,
        /// Decoded size field.
        size: i32,
    },
}

/// Errors in the sync layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Decode error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl SyncError {
    /// Check if this error must abort the session.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Store(err) => err.is_fatal(),
            SyncError::Decode(_) => true,
        }
    }
}
