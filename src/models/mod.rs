//! Data shapes exchanged with endpoint handlers

pub mod artifacts;
pub mod payloads;

pub use artifacts::*;
pub use payloads::*;
