//! Service layer for Idea Bank
//!
//! Handlers reach the backing store and the object store only through a
//! [`ServiceProvider`] registered under a [`RegisteredService`] name.
//!
//! ## Architecture
//!
//! ```text
//! Route layer (hyper)
//!     ↓
//! Endpoint handlers (lifecycle)
//!     ↓
//! Service providers (query scope + object links)
//!     ↓
//! Data services (pure statement builders)
//!     ↓
//! SQLite Database
//! ```

pub mod accounts;
pub mod concepts;
pub mod engagement;
pub mod links;

pub use accounts::AccountsDataService;
pub use concepts::ConceptsDataService;
pub use engagement::EngagementDataService;
pub use links::{ObjectLinkProvider, SignedLinkProvider, LINK_TTL_SECONDS};

use std::fmt;
use std::sync::Arc;

use crate::db::{QueryScope, SessionFactory};
use crate::types::Result;

/// Names under which providers are registered with a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisteredService {
    AccountsDs,
    ConceptsDs,
    EngageDs,
}

impl fmt::Display for RegisteredService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisteredService::AccountsDs => write!(f, "ACCOUNTS_DS"),
            RegisteredService::ConceptsDs => write!(f, "CONCEPTS_DS"),
            RegisteredService::EngageDs => write!(f, "ENGAGE_DS"),
        }
    }
}

/// A live provider: opens query scopes and produces object links
#[derive(Clone)]
pub struct ServiceProvider {
    sessions: Arc<dyn SessionFactory>,
    links: Arc<dyn ObjectLinkProvider>,
}

impl ServiceProvider {
    pub fn new(sessions: Arc<dyn SessionFactory>, links: Arc<dyn ObjectLinkProvider>) -> Self {
        Self { sessions, links }
    }

    /// A fresh, closed query scope
    pub fn scope(&self) -> QueryScope {
        QueryScope::new(Arc::clone(&self.sessions))
    }

    /// Run `body` in a fresh scope that commits on success and rolls back on error
    pub fn within_scope<T>(&self, body: impl FnOnce(&mut QueryScope) -> Result<T>) -> Result<T> {
        self.scope().run(body)
    }

    pub fn share_item(&self, key: &str) -> Result<String> {
        self.links.share_link(key)
    }

    pub fn put_item(&self, key: &str) -> Result<String> {
        self.links.put_link(key)
    }
}
