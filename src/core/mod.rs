//! Core constants and error types for DGR.

pub mod constants;
mod error;

pub use error::*;
