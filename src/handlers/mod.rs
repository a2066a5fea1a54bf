//! Endpoint handlers
//!
//! Every endpoint is an [`Endpoint`] implementation driven by the shared
//! [`EndpointHandler`] lifecycle:
//!
//! ```text
//! IDLE --receive--> PROCESSING --ok--> COMPLETE
//!                              \--domain error--> ERROR
//! ```
//!
//! A handler instance serves exactly one request and is never reset.
//! Gated handlers run an [`AuthorizationGate`] check first; a rejected token
//! ends the request with 401 before the data operation is invoked.

pub mod creators;
pub mod erasers;
pub mod lineage;
pub mod registry;
pub mod retrievers;

pub use creators::{
    AccountCreationHandler, ConceptCommentingHandler, ConceptCreationHandler,
    ConceptLinkingHandler, FollowAccountHandler, LikeConceptHandler,
};
pub use erasers::{StopFollowingAccountHandler, StopLikingConceptHandler};
pub use lineage::{LineageBuilder, LineageTree, LINEAGE_MAX_DEPTH};
pub use registry::ServiceRegistry;
pub use retrievers::{
    AuthenticationHandler, CheckFollowingStatusHandler, CheckLikingStatusHandler,
    ConceptCommentsSectionHandler, ConceptLineageHandler, ConceptSearchResultHandler,
    ProfileRetrievalHandler, SpecificConceptRetrievalHandler,
};

use hyper::StatusCode;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::auth::AuthorizationGate;
use crate::models::{EndpointErrorMessage, EndpointPayload};
use crate::services::{RegisteredService, ServiceProvider};
use crate::types::{IdeaBankError, Result};

/// Where a handler is in its single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Idle,
    Processing,
    Complete,
    Error,
}

/// Response body: the endpoint's payload or an error message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EndpointBody<B> {
    Success(B),
    Failure(EndpointErrorMessage),
}

/// Status code and body left behind by a finished handler
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResponse<B> {
    pub code: StatusCode,
    pub body: EndpointBody<B>,
}

impl<B> EndpointResponse<B> {
    pub fn success(code: StatusCode, body: B) -> Self {
        Self {
            code,
            body: EndpointBody::Success(body),
        }
    }

    pub fn failure(code: StatusCode, err: &IdeaBankError) -> Self {
        Self {
            code,
            body: EndpointBody::Failure(EndpointErrorMessage::new(err.to_string())),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.body, EndpointBody::Success(_))
    }

    /// Success payload, if there is one
    pub fn payload(&self) -> Option<&B> {
        match &self.body {
            EndpointBody::Success(body) => Some(body),
            EndpointBody::Failure(_) => None,
        }
    }

    /// Error message, if the handler failed
    pub fn err_msg(&self) -> Option<&str> {
        match &self.body {
            EndpointBody::Success(_) => None,
            EndpointBody::Failure(msg) => Some(&msg.err_msg),
        }
    }
}

/// Base error mapping: 500 carrying the error's message
pub fn default_error_response<B>(err: IdeaBankError) -> EndpointResponse<B> {
    error!("Exception not handled by endpoint: {}", err);
    EndpointResponse::failure(StatusCode::INTERNAL_SERVER_ERROR, &err)
}

/// Maps `err` to `code` when `matches` holds, else falls through to the base mapping
pub(crate) fn map_error<B>(
    err: IdeaBankError,
    matches: impl FnOnce(&IdeaBankError) -> bool,
    code: StatusCode,
) -> EndpointResponse<B> {
    if matches(&err) {
        EndpointResponse::failure(code, &err)
    } else {
        default_error_response(err)
    }
}

/// Replace a `NoResultFound` with the endpoint's own error
pub(crate) fn when_missing(
    replacement: impl FnOnce() -> IdeaBankError,
) -> impl FnOnce(IdeaBankError) -> IdeaBankError {
    move |err| match err {
        IdeaBankError::NoResultFound(_) => replacement(),
        other => other,
    }
}

/// Replace the store's constraint message with one fit for the caller
pub(crate) fn when_conflict(message: String) -> impl FnOnce(IdeaBankError) -> IdeaBankError {
    move |err| match err {
        IdeaBankError::AlreadyExists(cause) => {
            warn!("Constraint violation: {}", cause);
            IdeaBankError::AlreadyExists(message)
        }
        other => other,
    }
}

/// The three operations that make up one endpoint's behavior
pub trait Endpoint {
    type Request: EndpointPayload;
    type Output;
    type Body;

    /// Perform the data operation against the registered services
    fn do_data_ops(&mut self, services: &ServiceRegistry, request: Self::Request)
        -> Result<Self::Output>;

    /// Turn the data operation's output into a 2xx response
    fn build_success(&self, output: Self::Output) -> EndpointResponse<Self::Body>;

    /// Turn a domain error into a 4xx/5xx response
    fn build_error(&self, err: IdeaBankError) -> EndpointResponse<Self::Body> {
        default_error_response(err)
    }
}

/// Lifecycle engine for one request against one endpoint
pub struct EndpointHandler<E: Endpoint> {
    endpoint: E,
    state: HandlerState,
    result: Option<EndpointResponse<E::Body>>,
    services: ServiceRegistry,
    gate: Option<AuthorizationGate>,
}

impl<E: Endpoint> EndpointHandler<E> {
    pub fn new(endpoint: E) -> Self {
        Self {
            endpoint,
            state: HandlerState::Idle,
            result: None,
            services: ServiceRegistry::new(),
            gate: None,
        }
    }

    /// A handler that checks the request's token before anything else
    pub fn gated(endpoint: E, gate: AuthorizationGate) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(endpoint)
        }
    }

    pub fn status(&self) -> HandlerState {
        self.state
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    pub fn use_service(&mut self, name: RegisteredService, provider: ServiceProvider) {
        self.services.register(name, provider);
    }

    pub fn get_service(&self, name: RegisteredService) -> Result<&ServiceProvider> {
        self.services.get(name)
    }

    /// The finished response; only available once the handler is COMPLETE or ERROR
    pub fn result(&self) -> Result<&EndpointResponse<E::Body>> {
        match (self.state, &self.result) {
            (HandlerState::Complete | HandlerState::Error, Some(result)) => Ok(result),
            _ => {
                error!("Handler is not finished. Result is unavailable");
                Err(IdeaBankError::PrematureResultRetrieval(
                    "Attempted to read handler results before they were ready".into(),
                ))
            }
        }
    }

    /// Like [`result`](Self::result), but hands over ownership
    pub fn into_result(self) -> Result<EndpointResponse<E::Body>> {
        match (self.state, self.result) {
            (HandlerState::Complete | HandlerState::Error, Some(result)) => Ok(result),
            _ => Err(IdeaBankError::PrematureResultRetrieval(
                "Attempted to read handler results before they were ready".into(),
            )),
        }
    }

    /// Process one request.
    ///
    /// Domain errors become the error result. Lifecycle misuse and
    /// infrastructure faults are returned to the caller instead.
    pub fn receive(&mut self, request: E::Request) -> Result<()> {
        if self.state != HandlerState::Idle {
            error!("Handler not ready to receive");
            return Err(IdeaBankError::HandlerNotIdle(format!(
                "Expected handler to be idle, but was {:?}",
                self.state
            )));
        }
        self.state = HandlerState::Processing;
        let name = endpoint_name::<E>();

        if let Some(gate) = &self.gate {
            if let Err(err) = gate.check(request.auth_token()) {
                warn!("Authorization failed for {}: {}", name, err);
                self.result = Some(EndpointResponse::failure(StatusCode::UNAUTHORIZED, &err));
                self.state = HandlerState::Error;
                return Ok(());
            }
        }

        if self.services.is_empty() {
            warn!("{} has no registered services", name);
        }
        info!(
            "Attempting normal workflow {} with {} services",
            name,
            self.services.len()
        );
        match self.endpoint.do_data_ops(&self.services, request) {
            Ok(output) => {
                self.result = Some(self.endpoint.build_success(output));
                self.state = HandlerState::Complete;
                info!("Completed normal workflow successfully");
                Ok(())
            }
            Err(err) if err.is_domain() => {
                error!("Normal flow unsuccessful, starting error workflow: {}", err);
                self.result = Some(self.endpoint.build_error(err));
                self.state = HandlerState::Error;
                Ok(())
            }
            Err(err) => {
                error!("{} failed outside the error workflow: {}", name, err);
                self.state = HandlerState::Error;
                Err(err)
            }
        }
    }
}

fn endpoint_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtValidator;
    use crate::models::AuthorizationToken;
    use std::sync::Arc;

    struct Echo {
        calls: usize,
        fail_with: Option<IdeaBankError>,
    }

    struct EchoRequest {
        auth_token: Option<AuthorizationToken>,
        text: String,
    }

    impl EndpointPayload for EchoRequest {
        fn auth_token(&self) -> Option<&AuthorizationToken> {
            self.auth_token.as_ref()
        }
    }

    impl Endpoint for Echo {
        type Request = EchoRequest;
        type Output = String;
        type Body = String;

        fn do_data_ops(&mut self, _: &ServiceRegistry, request: EchoRequest) -> Result<String> {
            self.calls += 1;
            match self.fail_with.clone() {
                Some(err) => Err(err),
                None => Ok(request.text),
            }
        }

        fn build_success(&self, output: String) -> EndpointResponse<String> {
            EndpointResponse::success(StatusCode::OK, output)
        }

        fn build_error(&self, err: IdeaBankError) -> EndpointResponse<String> {
            map_error(
                err,
                |e| matches!(e, IdeaBankError::RequestedDataNotFound(_)),
                StatusCode::NOT_FOUND,
            )
        }
    }

    fn echo(fail_with: Option<IdeaBankError>) -> Echo {
        Echo {
            calls: 0,
            fail_with,
        }
    }

    fn request(text: &str) -> EchoRequest {
        EchoRequest {
            auth_token: None,
            text: text.into(),
        }
    }

    #[test]
    fn test_success_path() {
        let mut handler = EndpointHandler::new(echo(None));
        assert_eq!(handler.status(), HandlerState::Idle);
        handler.receive(request("hi")).unwrap();
        assert_eq!(handler.status(), HandlerState::Complete);
        let result = handler.result().unwrap();
        assert_eq!(result.code, StatusCode::OK);
        assert!(result.is_success());
        assert_eq!(result.payload().map(String::as_str), Some("hi"));
    }

    #[test]
    fn test_receive_twice() {
        let mut handler = EndpointHandler::new(echo(None));
        handler.receive(request("once")).unwrap();
        let err = handler.receive(request("twice")).unwrap_err();
        assert!(matches!(err, IdeaBankError::HandlerNotIdle(_)));
        assert_eq!(handler.endpoint().calls, 1);
    }

    #[test]
    fn test_premature_result() {
        let handler = EndpointHandler::new(echo(None));
        assert!(matches!(
            handler.result().unwrap_err(),
            IdeaBankError::PrematureResultRetrieval(_)
        ));
    }

    #[test]
    fn test_mapped_and_unmapped_domain_errors() {
        let mut handler = EndpointHandler::new(echo(Some(IdeaBankError::RequestedDataNotFound(
            "gone".into(),
        ))));
        handler.receive(request("x")).unwrap();
        assert_eq!(handler.status(), HandlerState::Error);
        assert_eq!(handler.result().unwrap().code, StatusCode::NOT_FOUND);
        assert_eq!(handler.result().unwrap().err_msg(), Some("gone"));

        let mut handler = EndpointHandler::new(echo(Some(IdeaBankError::Internal(
            "Really obscure error".into(),
        ))));
        handler.receive(request("x")).unwrap();
        let result = handler.result().unwrap();
        assert_eq!(result.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!result.is_success());
        assert_eq!(result.err_msg(), Some("Really obscure error"));
    }

    #[test]
    fn test_fatal_errors_propagate() {
        let mut handler =
            EndpointHandler::new(echo(Some(IdeaBankError::Database("disk full".into()))));
        let err = handler.receive(request("x")).unwrap_err();
        assert!(matches!(err, IdeaBankError::Database(_)));
        assert!(handler.result().is_err());
    }

    #[test]
    fn test_gate_short_circuits_data_ops() {
        let validator =
            Arc::new(JwtValidator::new("lifecycle-secret-at-least-32-characters".into(), 60).unwrap());
        let token = validator.generate_token("alice").unwrap();
        let mut handler = EndpointHandler::gated(echo(None), AuthorizationGate::new(validator));

        handler
            .receive(EchoRequest {
                auth_token: Some(AuthorizationToken {
                    token,
                    presenter: "mallory".into(),
                }),
                text: "x".into(),
            })
            .unwrap();

        assert_eq!(handler.status(), HandlerState::Error);
        assert_eq!(handler.endpoint().calls, 0);
        let result = handler.result().unwrap();
        assert_eq!(result.code, StatusCode::UNAUTHORIZED);
        assert_eq!(result.err_msg(), Some("Cannot verify ownership of token."));
    }

    #[test]
    fn test_unregistered_service_maps_to_500() {
        struct NeedsAccounts;
        impl Endpoint for NeedsAccounts {
            type Request = String;
            type Output = ();
            type Body = ();
            fn do_data_ops(&mut self, services: &ServiceRegistry, _: String) -> Result<()> {
                services.get(RegisteredService::AccountsDs).map(|_| ())
            }
            fn build_success(&self, _: ()) -> EndpointResponse<()> {
                EndpointResponse::success(StatusCode::OK, ())
            }
        }

        let mut handler = EndpointHandler::new(NeedsAccounts);
        handler.receive("alice".into()).unwrap();
        assert_eq!(handler.result().unwrap().code, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
