//! Payloads accepted by endpoint handlers
//!
//! Requests that need authorization carry an explicit, optional token field.
//! The authorization gate reads it through [`EndpointPayload::auth_token`].

use serde::Deserialize;

use super::artifacts::{
    AccountFollowingRecord, AuthorizationToken, ConceptLikingRecord, ConceptLinkRecord,
    ConceptSearchQuery, CredentialSet,
};
use crate::types::IdeaBankError;

/// Anything a handler can receive
pub trait EndpointPayload {
    /// Token presented with the request, if any
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        None
    }
}

impl EndpointPayload for CredentialSet {}
impl EndpointPayload for ConceptSearchQuery {}
impl EndpointPayload for AccountFollowingRecord {}
impl EndpointPayload for ConceptLikingRecord {}

/// Display name of the profile being looked up
impl EndpointPayload for String {}

/// Concept fields submitted for creation
#[derive(Debug, Clone, Deserialize)]
pub struct ConceptDataPayload {
    pub author: String,
    pub title: String,
    pub description: String,
    pub diagram: serde_json::Value,
}

impl ConceptDataPayload {
    /// Titles are 3 to 128 letters, digits, underscores or hyphens
    pub fn validate(&self) -> Result<(), IdeaBankError> {
        let length = self.title.chars().count();
        let well_formed = self
            .title
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if !(3..=128).contains(&length) || !well_formed {
            return Err(IdeaBankError::InvalidInput(
                "Title must consist of letters, numbers, underscores, and hyphens. \
                 It must also be between 3 and 128 characters"
                    .into(),
            ));
        }
        if !self.diagram.is_object() {
            return Err(IdeaBankError::InvalidInput(
                "Diagram must be a JSON object".into(),
            ));
        }
        Ok(())
    }
}

/// Request for one concept, in full or simple form
#[derive(Debug, Clone)]
pub struct ConceptRequest {
    pub author: String,
    pub title: String,
    pub simple: bool,
}

impl ConceptRequest {
    pub fn identifier(&self) -> String {
        format!("{}/{}", self.author, self.title)
    }
}

impl EndpointPayload for ConceptRequest {}

#[derive(Debug, Clone)]
pub struct CreateConcept {
    pub auth_token: Option<AuthorizationToken>,
    pub concept: ConceptDataPayload,
}

#[derive(Debug, Clone)]
pub struct EstablishLink {
    pub auth_token: Option<AuthorizationToken>,
    pub link: ConceptLinkRecord,
}

#[derive(Debug, Clone)]
pub struct FollowRequest {
    pub auth_token: Option<AuthorizationToken>,
    pub follower: String,
    pub followee: String,
}

#[derive(Debug, Clone)]
pub struct UnfollowRequest {
    pub auth_token: Option<AuthorizationToken>,
    pub follower: String,
    pub followee: String,
}

#[derive(Debug, Clone)]
pub struct LikeRequest {
    pub auth_token: Option<AuthorizationToken>,
    pub user_liking: String,
    pub concept_liked: String,
}

#[derive(Debug, Clone)]
pub struct UnlikeRequest {
    pub auth_token: Option<AuthorizationToken>,
    pub user_liking: String,
    pub concept_liked: String,
}

#[derive(Debug, Clone)]
pub struct CommentRequest {
    pub auth_token: Option<AuthorizationToken>,
    pub concept_id: String,
    pub comment_by: String,
    pub free_text: String,
    pub response_to: Option<i64>,
}

impl EndpointPayload for CreateConcept {
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        self.auth_token.as_ref()
    }
}

impl EndpointPayload for EstablishLink {
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        self.auth_token.as_ref()
    }
}

impl EndpointPayload for FollowRequest {
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        self.auth_token.as_ref()
    }
}

impl EndpointPayload for UnfollowRequest {
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        self.auth_token.as_ref()
    }
}

impl EndpointPayload for LikeRequest {
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        self.auth_token.as_ref()
    }
}

impl EndpointPayload for UnlikeRequest {
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        self.auth_token.as_ref()
    }
}

impl EndpointPayload for CommentRequest {
    fn auth_token(&self) -> Option<&AuthorizationToken> {
        self.auth_token.as_ref()
    }
}
