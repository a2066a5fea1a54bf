//! Artifacts produced by handlers and records shared between requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof of authentication handed to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationToken {
    pub token: String,
    pub presenter: String,
}

/// Display name and password pair
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSet {
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    pub preferred_name: String,
    pub biography: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptSimpleView {
    pub identifier: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptFullView {
    pub author: String,
    pub title: String,
    pub description: String,
    pub diagram: serde_json::Value,
    pub thumbnail_url: String,
}

/// Either concept view, depending on what the caller asked for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConceptView {
    Full(ConceptFullView),
    Simple(ConceptSimpleView),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptLinkRecord {
    pub ancestor: String,
    pub descendant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFollowingRecord {
    pub follower: String,
    pub followee: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptLikingRecord {
    pub user_liking: String,
    pub concept_liked: String,
}

/// A comment and every reply beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptComment {
    pub comment_id: i64,
    pub comment_author: String,
    pub comment_text: String,
    #[serde(default)]
    pub responses: Vec<ConceptComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConceptCommentThreads {
    pub threads: Vec<ConceptComment>,
}

/// Serialized lineage tree and its size
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptLineage {
    pub nodes: usize,
    pub lineage: serde_json::Value,
}

/// Which search fields use pattern matching instead of exact matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuzzyOption {
    #[default]
    None,
    Author,
    Title,
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptSearchQuery {
    pub author: String,
    pub title: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub fuzzy: FuzzyOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointErrorMessage {
    pub err_msg: String,
}

impl EndpointErrorMessage {
    pub fn new(err_msg: impl Into<String>) -> Self {
        Self {
            err_msg: err_msg.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInformationalMessage {
    pub msg: String,
}

impl EndpointInformationalMessage {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_option_wire_names() {
        let parsed: FuzzyOption = serde_json::from_str("\"title\"").unwrap();
        assert_eq!(parsed, FuzzyOption::Title);
        assert_eq!(serde_json::to_string(&FuzzyOption::All).unwrap(), "\"all\"");
        assert_eq!(FuzzyOption::default(), FuzzyOption::None);
    }

    #[test]
    fn test_concept_view_is_untagged() {
        let view = ConceptView::Simple(ConceptSimpleView {
            identifier: "alice/idea".into(),
            thumbnail_url: "http://x".into(),
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["identifier"], "alice/idea");
    }

    #[test]
    fn test_full_view_keeps_diagram_structure() {
        let view = ConceptView::Full(ConceptFullView {
            author: "alice".into(),
            title: "jetpack".into(),
            description: "Flies".into(),
            diagram: serde_json::json!({"nodes": [{"id": 1}]}),
            thumbnail_url: "http://x".into(),
        });
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["diagram"].is_object());
        assert_eq!(json["diagram"]["nodes"][0]["id"], 1);
    }
}
