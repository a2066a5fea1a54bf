//! HTTP server for Idea Bank

pub mod http;

pub use http::{run, AppState};
