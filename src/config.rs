//! Configuration for Idea Bank
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::jwt::DEFAULT_EXPIRY_SECONDS;
use crate::services::LINK_TTL_SECONDS;

/// Idea Bank - share concepts and trace how they build on each other
#[derive(Parser, Debug, Clone)]
#[command(name = "ideabank")]
#[command(about = "Request-processing service for the Idea Bank")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "ideabank.db")]
    pub database_path: PathBuf,

    /// Maximum pooled database connections
    #[arg(long, env = "DB_POOL_SIZE", default_value = "8")]
    pub db_pool_size: u32,

    /// Enable development mode (insecure default secrets)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value_t = DEFAULT_EXPIRY_SECONDS)]
    pub jwt_expiry_seconds: u64,

    /// Base URL objects (thumbnails, avatars) are served from
    #[arg(long, env = "LINK_BASE_URL", default_value = "http://localhost:9000/ideabank")]
    pub link_base_url: String,

    /// Secret used to sign object links
    #[arg(long, env = "LINK_SECRET")]
    pub link_secret: Option<String>,

    /// Lifetime of signed object links in seconds
    #[arg(long, env = "LINK_TTL_SECONDS", default_value_t = LINK_TTL_SECONDS)]
    pub link_ttl_seconds: i64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Secret for object links; falls back to the JWT secret
    pub fn link_secret(&self) -> String {
        self.link_secret
            .clone()
            .or_else(|| self.jwt_secret.clone())
            .unwrap_or_else(|| "dev-only-insecure-link-secret".to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.db_pool_size == 0 {
            return Err("DB_POOL_SIZE must be at least 1".to_string());
        }

        if self.link_ttl_seconds <= 0 {
            return Err("LINK_TTL_SECONDS must be positive".to_string());
        }

        Ok(())
    }
}
