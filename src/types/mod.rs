//! Shared types for Idea Bank

pub mod error;

pub use error::{IdeaBankError, Result};
