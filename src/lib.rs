//! Idea Bank - request-processing core
//!
//! Endpoint handlers with a one-shot lifecycle, an authorization gate for
//! token-protected endpoints, transactional query scopes over SQLite and the
//! lineage builder that arranges concept links into a rooted tree.

pub mod auth;
pub mod config;
pub mod db;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{IdeaBankError, Result};
