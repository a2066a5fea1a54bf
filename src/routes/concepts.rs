//! Concept routes
//!
//! - POST /concepts                           - publish a concept (token required)
//! - GET  /concepts                           - search
//! - GET  /concepts/{author}/{title}          - one concept, `?simple=true` for the short form
//! - GET  /concepts/{author}/{title}/lineage  - ancestors and descendants
//! - GET  /concepts/{author}/{title}/comments - comment threads
//! - POST /concepts/{author}/{title}/comments - comment (token required)
//! - POST /links                              - link two concepts (token required)

use chrono::{DateTime, Utc};
use hyper::body::Incoming;
use hyper::{Request, Response};
use serde::Deserialize;
use std::sync::Arc;

use super::{authorization, bearer_token, dispatch, error_response, read_json, read_query, Access, BoxBody};
use crate::handlers::{
    ConceptCommentingHandler, ConceptCommentsSectionHandler, ConceptCreationHandler,
    ConceptLineageHandler, ConceptLinkingHandler, ConceptSearchResultHandler,
    SpecificConceptRetrievalHandler,
};
use crate::models::{
    CommentRequest, ConceptDataPayload, ConceptLinkRecord, ConceptRequest,
    ConceptSearchQuery, CreateConcept, EstablishLink, FuzzyOption,
};
use crate::server::AppState;
use crate::services::RegisteredService;
use crate::types::IdeaBankError;

const CONCEPTS: &[RegisteredService] = &[RegisteredService::ConceptsDs];
const ENGAGEMENT: &[RegisteredService] = &[RegisteredService::EngageDs];

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    author: Option<String>,
    title: Option<String>,
    notbefore: Option<DateTime<Utc>>,
    notafter: Option<DateTime<Utc>>,
    fuzzy: Option<FuzzyOption>,
}

#[derive(Debug, Default, Deserialize)]
struct ViewParams {
    simple: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    comment_by: String,
    free_text: String,
    response_to: Option<i64>,
}

/// Search window defaults to everything from the epoch up to `now`
pub fn search_query(query: Option<&str>, now: DateTime<Utc>) -> Result<ConceptSearchQuery, IdeaBankError> {
    let params: SearchParams = read_query(query)?;
    Ok(ConceptSearchQuery {
        author: params.author.unwrap_or_default(),
        title: params.title.unwrap_or_default(),
        not_before: params.notbefore.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        not_after: params.notafter.unwrap_or(now),
        fuzzy: params.fuzzy.unwrap_or_default(),
    })
}

pub async fn create_concept(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let token = bearer_token(&req);
    let concept: ConceptDataPayload = match read_json(req).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let request = CreateConcept {
        auth_token: authorization(token, &concept.author),
        concept,
    };
    dispatch(state, ConceptCreationHandler, Access::Gated, CONCEPTS, request).await
}

pub async fn create_link(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let token = bearer_token(&req);
    let link: ConceptLinkRecord = match read_json(req).await {
        Ok(l) => l,
        Err(e) => return error_response(&e),
    };
    let presenter = link.descendant.split('/').next().unwrap_or_default().to_string();
    let request = EstablishLink {
        auth_token: authorization(token, &presenter),
        link,
    };
    dispatch(state, ConceptLinkingHandler, Access::Gated, CONCEPTS, request).await
}

pub async fn search(state: Arc<AppState>, query: Option<&str>) -> Response<BoxBody> {
    let request = match search_query(query, Utc::now()) {
        Ok(q) => q,
        Err(e) => return error_response(&e),
    };
    dispatch(state, ConceptSearchResultHandler, Access::Open, CONCEPTS, request).await
}

pub async fn fetch_concept(
    state: Arc<AppState>,
    author: &str,
    title: &str,
    query: Option<&str>,
) -> Response<BoxBody> {
    let params: ViewParams = match read_query(query) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    let request = ConceptRequest {
        author: author.to_string(),
        title: title.to_string(),
        simple: params.simple.unwrap_or(false),
    };
    dispatch(state, SpecificConceptRetrievalHandler, Access::Open, CONCEPTS, request).await
}

pub async fn lineage(state: Arc<AppState>, author: &str, title: &str) -> Response<BoxBody> {
    let request = ConceptRequest {
        author: author.to_string(),
        title: title.to_string(),
        simple: true,
    };
    dispatch(state, ConceptLineageHandler, Access::Open, CONCEPTS, request).await
}

pub async fn comments(state: Arc<AppState>, author: &str, title: &str) -> Response<BoxBody> {
    let request = ConceptRequest {
        author: author.to_string(),
        title: title.to_string(),
        simple: true,
    };
    dispatch(state, ConceptCommentsSectionHandler, Access::Open, ENGAGEMENT, request).await
}

pub async fn comment(
    state: Arc<AppState>,
    req: Request<Incoming>,
    author: &str,
    title: &str,
) -> Response<BoxBody> {
    let token = bearer_token(&req);
    let body: CommentBody = match read_json(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };
    let request = CommentRequest {
        auth_token: authorization(token, &body.comment_by),
        concept_id: format!("{author}/{title}"),
        comment_by: body.comment_by,
        free_text: body.free_text,
        response_to: body.response_to,
    };
    dispatch(state, ConceptCommentingHandler, Access::Gated, ENGAGEMENT, request).await
}
