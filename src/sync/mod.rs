//! DGR - Sync Layer
//!
//! Runtime-free building blocks shared by both roles:
//! - Record store with first-write ordering and a hard record cap
//! - Wire codec (encode the whole store, decode and merge a datagram)
//! - Liveness clock for slave-side timeouts

pub mod codec;
mod liveness;
mod store;

pub use codec::{decode, encode, encoded_len, merge, DecodedRecord};
pub use liveness::*;
pub use store::*;
