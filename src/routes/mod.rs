//! HTTP routes for Idea Bank
//!
//! Each route parses its request, builds a fresh handler on the blocking
//! pool, registers the providers it needs and renders the handler's result.

pub mod accounts;
pub mod concepts;
pub mod engagement;
pub mod health;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::auth::extract_token_from_header;
use crate::handlers::{Endpoint, EndpointHandler, EndpointResponse};
use crate::models::{AuthorizationToken, EndpointErrorMessage};
use crate::server::AppState;
use crate::services::RegisteredService;
use crate::types::IdeaBankError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest request body accepted (diagrams included)
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Whether a route's handler checks the caller's token first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Open,
    Gated,
}

fn full_body(content: impl Into<Bytes>) -> BoxBody {
    Full::new(content.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
    response
}

/// Render an error raised outside a handler.
/// Infrastructure faults are reported without detail.
pub fn error_response(err: &IdeaBankError) -> Response<BoxBody> {
    if !err.is_domain() {
        error!("Request failed: {}", err);
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &EndpointErrorMessage::new("Internal server error"),
        );
    }
    json_response(err.status_code(), &EndpointErrorMessage::new(err.to_string()))
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &EndpointErrorMessage::new(format!("No route for {}", path)),
    )
}

pub fn preflight_response() -> Response<BoxBody> {
    let mut response = Response::new(full_body(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

/// Read and parse a JSON request body
pub async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, IdeaBankError> {
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| IdeaBankError::InvalidInput(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(IdeaBankError::InvalidInput("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| IdeaBankError::InvalidInput(format!("Invalid JSON: {}", e)))
}

/// Parse a query string into `T`; a missing query parses as empty
pub fn read_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T, IdeaBankError> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| IdeaBankError::InvalidInput(format!("Invalid query: {}", e)))
}

/// Token from the Authorization header, raw or Bearer
pub fn bearer_token(req: &Request<Incoming>) -> Option<String> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    extract_token_from_header(header).map(str::to_string)
}

/// Pair a header token with the identity the request claims to act as
pub fn authorization(token: Option<String>, presenter: &str) -> Option<AuthorizationToken> {
    token.map(|token| AuthorizationToken {
        token,
        presenter: presenter.to_string(),
    })
}

/// Run `endpoint` against `request` on the blocking pool and render its result
pub async fn dispatch<E>(
    state: Arc<AppState>,
    endpoint: E,
    access: Access,
    services: &'static [RegisteredService],
    request: E::Request,
) -> Response<BoxBody>
where
    E: Endpoint + Send + 'static,
    E::Request: Send + 'static,
    E::Body: Serialize + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || -> Result<EndpointResponse<E::Body>, IdeaBankError> {
        let mut handler = match access {
            Access::Open => EndpointHandler::new(endpoint),
            Access::Gated => EndpointHandler::gated(endpoint, state.gate()),
        };
        for name in services {
            handler.use_service(*name, state.provider());
        }
        handler.receive(request)?;
        handler.into_result()
    })
    .await;

    match outcome {
        Ok(Ok(result)) => {
            if !result.is_success() {
                warn!("Responding {} with {:?}", result.code, result.err_msg());
            }
            json_response(result.code, &result.body)
        }
        Ok(Err(err)) => error_response(&err),
        Err(join_err) => {
            error!("Handler task failed: {}", join_err);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &EndpointErrorMessage::new("Internal server error"),
            )
        }
    }
}
