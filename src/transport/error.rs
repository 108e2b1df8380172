//! Transport layer error types.
//!
//! Every transport failure is fatal: there is no reconnection, and a broken
//! socket means the cluster run is over.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Host/port could not be resolved.
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        /// `host:port` being resolved.
        target: String,
        /// Resolver error.
        #[source]
        source: io::Error,
    },

    /// Resolution succeeded but no candidate address could be used.
    #[error("no usable address for {target}")]
    NoUsableAddress {
        /// `host:port` or bind target.
        target: String,
        /// Error from the last candidate tried.
        #[source]
        source: Option<io::Error>,
    },

    /// Sending a datagram failed.
    #[error("send to {dest} failed: {source}")]
    Send {
        /// Destination endpoint.
        dest: SocketAddr,
        /// Socket error.
        #[source]
        source: io::Error,
    },

    /// The socket accepted fewer bytes than the datagram holds.
    #[error("short send: {sent} of {expected} bytes transmitted")]
    ShortSend {
        /// Bytes transmitted.
        sent: usize,
        /// Bytes in the datagram.
        expected: usize,
    },

    /// Datagram exceeds the largest UDP payload.
    #[error("datagram of {size} bytes exceeds the {limit} byte UDP limit")]
    Oversized {
        /// Encoded size.
        size: usize,
        /// Largest allowed datagram.
        limit: usize,
    },

    /// A received datagram filled the whole receive buffer and may have been
    /// cut short.
    #[error("datagram filled the {capacity} byte receive buffer and may be truncated")]
    Truncated {
        /// Receive buffer size.
        capacity: usize,
    },

    /// Waiting for or receiving a datagram failed.
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
