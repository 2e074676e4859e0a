use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppResult, DomainError};
use crate::payments::traits::PaymentProvider;

/// Lookup table of the payment providers enabled for an event
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, Arc<dyn PaymentProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its identifier, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
        let identifier = provider.identifier();
        if self.providers.insert(identifier, provider).is_some() {
            warn!("Payment provider '{}' registered twice, replacing", identifier);
        } else {
            info!("Registered payment provider '{}'", identifier);
        }
    }

    pub fn get(&self, identifier: &str) -> AppResult<Arc<dyn PaymentProvider>> {
        self.providers.get(identifier).cloned().ok_or_else(|| {
            DomainError::UnknownProvider {
                identifier: identifier.to_string(),
            }
            .into()
        })
    }

    /// Registered identifiers in alphabetical order
    pub fn identifiers(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.providers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
