//! Account routes
//!
//! - POST /accounts/create          - register a display name and password
//! - POST /accounts/authenticate    - exchange credentials for a token
//! - GET  /accounts/{name}/profile  - public profile

use hyper::body::Incoming;
use hyper::{Request, Response};
use std::sync::Arc;

use super::{dispatch, error_response, read_json, Access, BoxBody};
use crate::handlers::{AccountCreationHandler, AuthenticationHandler, ProfileRetrievalHandler};
use crate::models::CredentialSet;
use crate::server::AppState;
use crate::services::RegisteredService;

const ACCOUNTS: &[RegisteredService] = &[RegisteredService::AccountsDs];

pub async fn create_account(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let credentials: CredentialSet = match read_json(req).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    dispatch(state, AccountCreationHandler, Access::Open, ACCOUNTS, credentials).await
}

pub async fn authenticate(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let credentials: CredentialSet = match read_json(req).await {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };
    let handler = AuthenticationHandler::new(Arc::clone(&state.signer));
    dispatch(state, handler, Access::Open, ACCOUNTS, credentials).await
}

pub async fn fetch_profile(state: Arc<AppState>, display_name: &str) -> Response<BoxBody> {
    dispatch(
        state,
        ProfileRetrievalHandler,
        Access::Open,
        ACCOUNTS,
        display_name.to_string(),
    )
    .await
}
