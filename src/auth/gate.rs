//! Token check that runs ahead of a gated handler's data operation

use std::sync::Arc;

use tracing::debug;

use super::jwt::JwtValidator;
use crate::models::AuthorizationToken;
use crate::types::{IdeaBankError, Result};

const INVALID_TOKEN: &str = "Invalid token presented.";
const NOT_OWNER: &str = "Cannot verify ownership of token.";

/// Verifies that a request carries a valid token issued to its presenter
#[derive(Clone)]
pub struct AuthorizationGate {
    validator: Arc<JwtValidator>,
}

impl AuthorizationGate {
    pub fn new(validator: Arc<JwtValidator>) -> Self {
        Self { validator }
    }

    /// Fails with `NotAuthorized` unless `token` is well formed, correctly
    /// signed, inside its validity window and issued to its presenter
    pub fn check(&self, token: Option<&AuthorizationToken>) -> Result<()> {
        let Some(token) = token else {
            debug!("Request carried no token");
            return Err(IdeaBankError::NotAuthorized(INVALID_TOKEN.into()));
        };

        let verdict = self.validator.verify_token(&token.token);
        let claims = match verdict.claims {
            Some(claims) if verdict.valid => claims,
            _ => {
                debug!(
                    presenter = %token.presenter,
                    reason = verdict.error.as_deref().unwrap_or("unknown"),
                    "Token rejected"
                );
                return Err(IdeaBankError::NotAuthorized(INVALID_TOKEN.into()));
            }
        };

        if claims.username != token.presenter {
            debug!(
                presenter = %token.presenter,
                holder = %claims.username,
                "Token presented by someone other than its holder"
            );
            return Err(IdeaBankError::NotAuthorized(NOT_OWNER.into()));
        }

        Ok(())
    }
}
