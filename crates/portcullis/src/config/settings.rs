//! Immutable, environment-sourced gateway configuration.
//!
//! Unlike the rest of the corpus this repository descends from, there is no
//! config file here: every field is read once from the process environment at
//! startup and frozen into a `Settings` value for the remainder of the process.

use std::time::Duration;

/// The fixed roster of downstream services this gateway fronts.
///
/// Concrete names are data, not code: adding a ninth service means adding one
/// entry to [`Settings::service_urls`] and one env var, not a new handler.
pub const SERVICE_NAMES: [&str; 8] = [
    "user",
    "auth",
    "badge",
    "feed",
    "messaging",
    "notification",
    "project",
    "new",
];

/// Process-scoped configuration, immutable after [`Settings::load`] returns.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub jwt_secret_key: String,

    pub user_service_url: String,
    pub auth_service_url: String,
    pub badge_service_url: String,
    pub feed_service_url: String,
    pub messaging_service_url: String,
    pub notification_service_url: String,
    pub project_service_url: String,
    pub new_service_url: String,

    pub max_connection_pool_size: usize,
    pub max_keepalive_connections: usize,
    pub keepalive_expiry: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_request_size: u64,
    pub allowed_origins: Vec<String>,

    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Gateway Service".to_string(),
            jwt_secret_key: "your_secret_key".to_string(),

            user_service_url: "http://user-service:8001".to_string(),
            auth_service_url: "http://auth-service:8002".to_string(),
            badge_service_url: "http://badge-service:8003".to_string(),
            feed_service_url: "http://feed-service:8004".to_string(),
            messaging_service_url: "http://messaging-service:8005".to_string(),
            notification_service_url: "http://notification-service:8006".to_string(),
            project_service_url: "http://project-service:8007".to_string(),
            new_service_url: "http://new-service:8008".to_string(),

            max_connection_pool_size: 100,
            max_keepalive_connections: 20,
            keepalive_expiry: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_request_size: 10 * 1024 * 1024,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "https://tracklore.com".to_string(),
                "https://www.tracklore.com".to_string(),
            ],

            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment, falling back to defaults
    /// for anything unset. Never fails by itself; call [`Settings::validate`]
    /// to catch a malformed value before binding the listener.
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            app_name: defaults.app_name,
            jwt_secret_key: env_or("JWT_SECRET_KEY", defaults.jwt_secret_key),

            user_service_url: env_or("USER_SERVICE_URL", defaults.user_service_url),
            auth_service_url: env_or("AUTH_SERVICE_URL", defaults.auth_service_url),
            badge_service_url: env_or("BADGE_SERVICE_URL", defaults.badge_service_url),
            feed_service_url: env_or("FEED_SERVICE_URL", defaults.feed_service_url),
            messaging_service_url: env_or("MESSAGING_SERVICE_URL", defaults.messaging_service_url),
            notification_service_url: env_or(
                "NOTIFICATION_SERVICE_URL",
                defaults.notification_service_url,
            ),
            project_service_url: env_or("PROJECT_SERVICE_URL", defaults.project_service_url),
            new_service_url: env_or("NEW_SERVICE_URL", defaults.new_service_url),

            host: env_or("GATEWAY_HOST", defaults.host),
            port: std::env::var("GATEWAY_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            log_level: env_or("LOG_LEVEL", defaults.log_level),

            ..defaults
        }
    }

    /// The fixed (service name, base URL) pairs this gateway proxies to, in
    /// [`SERVICE_NAMES`] order. Used once, at startup, to build the [`crate::registry::Registry`].
    pub fn service_urls(&self) -> [(&'static str, &str); 8] {
        [
            ("user", &self.user_service_url),
            ("auth", &self.auth_service_url),
            ("badge", &self.badge_service_url),
            ("feed", &self.feed_service_url),
            ("messaging", &self.messaging_service_url),
            ("notification", &self.notification_service_url),
            ("project", &self.project_service_url),
            ("new", &self.new_service_url),
        ]
    }

    /// Validates this settings record, collecting every problem found rather
    /// than stopping at the first. An empty return means the config is safe
    /// to bind a listener with.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.jwt_secret_key.trim().is_empty() {
            errors.push("JWT_SECRET_KEY must not be empty".to_string());
        }

        for (name, url) in self.service_urls() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!(
                    "{name} service URL '{url}' must start with http:// or https://"
                ));
            }
        }

        if self.max_request_size == 0 {
            errors.push("max_request_size must be greater than zero".to_string());
        }

        if self.max_connection_pool_size == 0 {
            errors.push("max_connection_pool_size must be greater than zero".to_string());
        }

        errors
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let settings = Settings::default();
        assert!(settings.validate().is_empty());
    }

    #[test]
    fn rejects_empty_secret() {
        let mut settings = Settings::default();
        settings.jwt_secret_key = "  ".to_string();
        let errors = settings.validate();
        assert!(errors.iter().any(|e| e.contains("JWT_SECRET_KEY")));
    }

    #[test]
    fn rejects_bad_service_url() {
        let mut settings = Settings::default();
        settings.badge_service_url = "badge-service:8003".to_string();
        let errors = settings.validate();
        assert!(errors.iter().any(|e| e.contains("badge")));
    }

    #[test]
    fn collects_every_error_at_once() {
        let mut settings = Settings::default();
        settings.jwt_secret_key = String::new();
        settings.max_request_size = 0;
        settings.feed_service_url = "not-a-url".to_string();
        let errors = settings.validate();
        assert_eq!(errors.len(), 3);
    }
}
