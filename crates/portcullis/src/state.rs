//! `GatewayState`: the single value threaded through every request handler.
//!
//! The source this gateway descends from keeps a process-global breaker map
//! and a module-level HTTP client. This collapses both into one value built
//! once at startup and handed to actix as shared `web::Data`, so there is no
//! ambient module-level state anywhere in this crate.

use reqwest::Client;

use crate::config::settings::Settings;
use crate::registry::Registry;

pub struct GatewayState {
    pub registry: Registry,
    pub client: Client,
    pub settings: Settings,
}

impl GatewayState {
    pub fn new(settings: Settings) -> Self {
        // `settings.max_connection_pool_size` is validated at startup but has
        // no corresponding builder method: reqwest caps idle connections per
        // host (`pool_max_idle_per_host`) but exposes no knob for a total
        // connection ceiling across hosts. See DESIGN.md.
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .pool_idle_timeout(settings.keepalive_expiry)
            .pool_max_idle_per_host(settings.max_keepalive_connections)
            .build()
            .expect("failed to build outbound HTTP client");

        let registry = Registry::from_settings(&settings);

        Self { registry, client, settings }
    }
}
