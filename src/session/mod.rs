//! DGR - Session Layer
//!
//! Public façade and replication engine:
//! - [`SessionConfig`]: role and endpoints, read once from the environment
//! - [`ReplicationEngine`]: per-frame send (master) or drain-and-merge (slave)
//! - [`Session`]: role-dispatched `set_or_get` plus the per-frame `update`

mod config;
mod engine;
mod error;
#[allow(clippy::module_inception)]
mod session;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use session::*;
