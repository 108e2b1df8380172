//! # DGR
//!
//! **D**istributed **G**raphics **R**eplication
//!
//! DGR keeps a named set of binary variables identical across a cluster of
//! rendering processes. One process (the *master*) computes the state and
//! broadcasts its whole variable table over UDP once per frame; every other
//! process (a *slave*) drains its socket each frame and applies only the
//! newest datagram.
//!
//! - **Last-value semantics**: stale datagrams are superseded, never replayed
//! - **Single call site**: the same `set_or_get` line publishes on the master
//!   and consumes on the slave
//! - **Fail fast**: a silent master aborts the slave instead of freezing it
//!
//! ## Feature Flags
//!
//! - `sync` (default): Record store, wire codec and liveness clock
//! - `transport` (default): UDP endpoints on tokio
//! - `session` (default): Replication engine and [`Session`] façade
//!
//! ## Modules
//!
//! - [`core`]: Constants and error types (always included)
//! - [`sync`]: Runtime-free building blocks (requires `sync` feature)
//! - [`transport`]: Sockets (requires `transport` feature)
//! - [`session`]: Public façade (requires `session` feature)
//!
//! ## Configuration
//!
//! | Variable                | Meaning                                         |
//! |-------------------------|-------------------------------------------------|
//! | `DGR_MODE`              | `master`, `slave`, anything else disables       |
//! | `DGR_MASTER_DEST_IP`    | Master destination host; `0.0.0.0` sends nothing |
//! | `DGR_MASTER_DEST_PORT`  | Master destination port                         |
//! | `DGR_SLAVE_LISTEN_PORT` | Slave listening port                            |
//!
//! ## Example Usage
//!
//! ```rust
//! use dgr::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), DgrError> {
//! // Disabled sessions accept every call and do nothing
//! let mut session = Session::new(SessionConfig::default()).await?;
//!
//! let mut camera = [0.0f32, 1.5, -3.0].map(f32::to_ne_bytes).concat();
//! session.set_or_get("camera", &mut camera)?;
//! assert_eq!(session.update().await?, CycleOutcome::Idle);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Sync layer (feature-gated)
#[cfg(feature = "sync")]
#[cfg_attr(docsrs, doc(cfg(feature = "sync")))]
pub mod sync;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Session façade (feature-gated)
#[cfg(feature = "session")]
#[cfg_attr(docsrs, doc(cfg(feature = "session")))]
pub mod session;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core error types
    pub use crate::core::*;

    #[cfg(feature = "sync")]
    pub use crate::sync::{LivenessClock, Record, RecordStore};

    #[cfg(feature = "transport")]
    pub use crate::transport::{MasterEndpoint, SlaveEndpoint, TransportError, TransportResult};

    #[cfg(feature = "session")]
    pub use crate::session::{
        ConfigError, CycleOutcome, DgrError, DgrResult, EngineState, Mode, ReplicationEngine,
        ReplicationError, Session, SessionConfig, SessionConfigBuilder,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{DecodeError, StoreError, SyncError};

#[cfg(feature = "sync")]
pub use crate::sync::RecordStore;

#[cfg(feature = "session")]
pub use crate::session::{DgrError, DgrResult, Mode, Session, SessionConfig};
