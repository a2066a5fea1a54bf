//! Time-limited object links
//!
//! Avatars and thumbnails live in an object store. Handlers never talk to it
//! directly; they hand out links that expire after a fixed TTL.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::types::{IdeaBankError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Default lifetime of a generated link
pub const LINK_TTL_SECONDS: i64 = 300;

/// Produces upload and share links for storage keys
pub trait ObjectLinkProvider: Send + Sync {
    /// Link that accepts an upload for `key`
    fn put_link(&self, key: &str) -> Result<String>;

    /// Link that reads the object at `key`
    fn share_link(&self, key: &str) -> Result<String>;
}

/// Signs links with a shared secret the object store also knows
#[derive(Clone)]
pub struct SignedLinkProvider {
    base_url: String,
    mac: HmacSha256,
    ttl_seconds: i64,
}

impl SignedLinkProvider {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>, ttl_seconds: i64) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(IdeaBankError::Config("Link base URL must not be empty".into()));
        }
        if ttl_seconds <= 0 {
            return Err(IdeaBankError::Config("Link TTL must be positive".into()));
        }
        let mac = HmacSha256::new_from_slice(secret.into().as_bytes())
            .map_err(|e| IdeaBankError::Config(format!("Unusable link secret: {}", e)))?;
        Ok(Self {
            base_url,
            mac,
            ttl_seconds,
        })
    }

    fn link(&self, method: &str, key: &str, now: i64) -> String {
        let expires = now + self.ttl_seconds;
        let signature = self.signature(method, key, expires);
        format!(
            "{}/{}?method={}&expires={}&signature={}",
            self.base_url, key, method, expires, signature
        )
    }

    fn keyed(&self, method: &str, key: &str, expires: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(format!("{}\n{}\n{}", method, key, expires).as_bytes());
        mac
    }

    /// Hex HMAC-SHA256 over method, key and expiry
    fn signature(&self, method: &str, key: &str, expires: i64) -> String {
        hex::encode(self.keyed(method, key, expires).finalize().into_bytes())
    }
}

impl ObjectLinkProvider for SignedLinkProvider {
    fn put_link(&self, key: &str) -> Result<String> {
        debug!("Generating upload link for {}", key);
        Ok(self.link("PUT", key, Utc::now().timestamp()))
    }

    fn share_link(&self, key: &str) -> Result<String> {
        debug!("Generating share link for object at {}", key);
        Ok(self.link("GET", key, Utc::now().timestamp()))
    }
}
