//! Core data types and structures
//!
//! Domain records supplied by the external data layer, separated from the
//! graph model they are turned into.

pub mod types;

pub use types::*;
