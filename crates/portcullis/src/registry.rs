//! The closed set of supported services, each paired with its own breaker.

use std::collections::HashMap;
use std::sync::Arc;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::config::settings::Settings;

pub struct ServiceEntry {
    pub base_url: String,
    pub breaker: Arc<CircuitBreaker>,
}

/// Built once from `Settings` at startup; the set of service names never
/// changes afterward. Each [`ServiceEntry`]'s breaker is shared across every
/// request handled for that service.
pub struct Registry {
    entries: HashMap<&'static str, ServiceEntry>,
}

impl Registry {
    pub fn from_settings(settings: &Settings) -> Self {
        let mut entries = HashMap::new();
        for (name, base_url) in settings.service_urls() {
            entries.insert(
                name,
                ServiceEntry {
                    base_url: base_url.to_string(),
                    breaker: Arc::new(CircuitBreaker::new(name, CircuitBreakerConfig::gateway_default())),
                },
            );
        }
        Self { entries }
    }

    pub fn get(&self, service: &str) -> Option<&ServiceEntry> {
        self.entries.get(service)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ServiceEntry)> {
        self.entries.iter().map(|(&name, entry)| (name, entry))
    }
}
