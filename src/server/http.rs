//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Handlers are synchronous
//! and run on tokio's blocking pool, one fresh instance per request.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{AuthorizationGate, JwtValidator};
use crate::config::Args;
use crate::db::{Database, SessionFactory};
use crate::routes::{self, BoxBody};
use crate::services::{ObjectLinkProvider, ServiceProvider, SignedLinkProvider};
use crate::types::{IdeaBankError, Result};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub db: Database,
    pub sessions: Arc<dyn SessionFactory>,
    pub links: Arc<dyn ObjectLinkProvider>,
    pub signer: Arc<JwtValidator>,
}

impl AppState {
    /// Build state from configuration and an opened database
    pub fn new(args: Args, db: Database) -> Result<Self> {
        let signer = match (&args.jwt_secret, args.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            (None, true) => JwtValidator::new_dev(),
            (None, false) => {
                return Err(IdeaBankError::Config(
                    "JWT_SECRET is required in production mode".into(),
                ))
            }
        };
        let links = SignedLinkProvider::new(
            args.link_base_url.clone(),
            args.link_secret(),
            args.link_ttl_seconds,
        )?;
        Ok(Self::with_parts(args, db, Arc::new(signer), Arc::new(links)))
    }

    /// Build state from already constructed collaborators
    pub fn with_parts(
        args: Args,
        db: Database,
        signer: Arc<JwtValidator>,
        links: Arc<dyn ObjectLinkProvider>,
    ) -> Self {
        let sessions = db.sessions().shared();
        Self {
            args,
            db,
            sessions,
            links,
            signer,
        }
    }

    /// A provider over this state's store and object links
    pub fn provider(&self) -> ServiceProvider {
        ServiceProvider::new(Arc::clone(&self.sessions), Arc::clone(&self.links))
    }

    pub fn gate(&self) -> AuthorizationGate {
        AuthorizationGate::new(Arc::clone(&self.signer))
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Idea Bank listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure default secrets in use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::OPTIONS, _) => routes::preflight_response(),
        (&Method::GET, ["health"]) => routes::health::health_check(&state),

        (&Method::POST, ["accounts", "create"]) => routes::accounts::create_account(state, req).await,
        (&Method::POST, ["accounts", "authenticate"]) => {
            routes::accounts::authenticate(state, req).await
        }
        (&Method::GET, ["accounts", name, "profile"]) => {
            routes::accounts::fetch_profile(state, name).await
        }

        (&Method::POST, ["concepts"]) => routes::concepts::create_concept(state, req).await,
        (&Method::GET, ["concepts"]) => routes::concepts::search(state, query.as_deref()).await,
        (&Method::GET, ["concepts", author, title]) => {
            routes::concepts::fetch_concept(state, author, title, query.as_deref()).await
        }
        (&Method::GET, ["concepts", author, title, "lineage"]) => {
            routes::concepts::lineage(state, author, title).await
        }
        (&Method::GET, ["concepts", author, title, "comments"]) => {
            routes::concepts::comments(state, author, title).await
        }
        (&Method::POST, ["concepts", author, title, "comments"]) => {
            routes::concepts::comment(state, req, author, title).await
        }
        (&Method::POST, ["links"]) => routes::concepts::create_link(state, req).await,

        (&Method::POST, ["follows"]) => routes::engagement::follow(state, req).await,
        (&Method::DELETE, ["follows"]) => routes::engagement::unfollow(state, req).await,
        (&Method::GET, ["follows", follower, followee]) => {
            routes::engagement::check_following(state, follower, followee).await
        }
        (&Method::POST, ["likes"]) => routes::engagement::like(state, req).await,
        (&Method::DELETE, ["likes"]) => routes::engagement::unlike(state, req).await,
        (&Method::GET, ["likes", user, author, title]) => {
            routes::engagement::check_liking(state, user, author, title).await
        }

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}
