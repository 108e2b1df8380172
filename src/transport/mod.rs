//! DGR - Transport Layer
//!
//! Role-specific UDP endpoints on top of tokio:
//!
//! - **Master**: [`MasterEndpoint`] resolves the destination and sends one
//!   datagram per frame
//! - **Slave**: [`SlaveEndpoint`] binds a wildcard address and drains its
//!   receive queue down to the newest datagram
//!
//! ```text
//! ┌──────────────┐   one datagram per frame   ┌──────────────┐
//! │    Master    │ ─────────────────────────▶ │    Slave     │
//! │ RecordStore  │         UDP (lossy)        │ RecordStore  │
//! └──────────────┘                            └──────────────┘
//! ```

mod error;
mod socket;

pub use error::*;
pub use socket::*;
