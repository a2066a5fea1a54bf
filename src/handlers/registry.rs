//! Per-handler table of named service providers

use std::collections::HashMap;

use tracing::{debug, error};

use crate::services::{RegisteredService, ServiceProvider};
use crate::types::{IdeaBankError, Result};

/// Providers a handler may use, keyed by service name.
/// Registering a name twice replaces the earlier provider.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    providers: HashMap<RegisteredService, ServiceProvider>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: RegisteredService, provider: ServiceProvider) {
        debug!("Using service provider for {}", name);
        self.providers.insert(name, provider);
    }

    pub fn get(&self, name: RegisteredService) -> Result<&ServiceProvider> {
        self.providers.get(&name).ok_or_else(|| {
            error!("No service registered under {}", name);
            IdeaBankError::NoRegisteredProvider(format!("No service registered under {}", name))
        })
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::scope::tests::{Ledger, RecordingSessions};
    use crate::services::SignedLinkProvider;
    use std::sync::Arc;

    fn provider() -> ServiceProvider {
        ServiceProvider::new(
            Arc::new(RecordingSessions(Arc::new(Ledger::default()))),
            Arc::new(SignedLinkProvider::new("http://objects.test", "secret", 300).unwrap()),
        )
    }

    #[test]
    fn test_missing_provider() {
        let registry = ServiceRegistry::new();
        let err = registry.get(RegisteredService::AccountsDs).err().unwrap();
        assert_eq!(
            err,
            IdeaBankError::NoRegisteredProvider("No service registered under ACCOUNTS_DS".into())
        );
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ServiceRegistry::new();
        registry.register(RegisteredService::ConceptsDs, provider());
        registry.register(RegisteredService::ConceptsDs, provider());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(RegisteredService::ConceptsDs).is_ok());
    }
}
