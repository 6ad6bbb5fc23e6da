//! The gateway's error taxonomy and its mapping to HTTP responses.
//!
//! Every fallible call site in this crate returns `Result<_, GatewayError>`. The
//! `ResponseError` impl below is the single place that picks a status code and
//! body for each kind, so that mapping never has to be repeated at a handler.

use actix_web::{http::header, HttpResponse};
use serde_json::json;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// No bearer credential on a protected route.
    #[error("missing credential")]
    MissingCredential,

    /// Bad signature, expired, wrong algorithm, or missing `sub`.
    #[error("invalid credential")]
    InvalidCredential,

    /// The service's breaker refused admission.
    #[error("circuit breaker open for service {service}")]
    BreakerOpen { service: String },

    /// DNS/TCP/TLS failure reaching the backend.
    #[error("connect error reaching service {service}")]
    ConnectError { service: String },

    /// Connect-phase or total-request timeout.
    #[error("timeout reaching service {service}")]
    Timeout { service: String },

    /// A path whose first segment names no registered service.
    #[error("unknown service")]
    UnknownService,

    /// Anything else unexpected.
    #[error("internal error")]
    Internal,
}

impl actix_web::error::ResponseError for GatewayError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            GatewayError::MissingCredential => StatusCode::FORBIDDEN,
            GatewayError::InvalidCredential => StatusCode::UNAUTHORIZED,
            GatewayError::BreakerOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::ConnectError { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UnknownService => StatusCode::NOT_FOUND,
            GatewayError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            GatewayError::MissingCredential => HttpResponse::Forbidden().finish(),
            GatewayError::InvalidCredential => HttpResponse::Unauthorized()
                .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
                .json(json!({ "detail": "Could not validate credentials" })),
            GatewayError::BreakerOpen { .. } => {
                HttpResponse::ServiceUnavailable().body("Service Unavailable")
            }
            GatewayError::ConnectError { .. } => HttpResponse::BadGateway().body("Bad Gateway"),
            GatewayError::Timeout { .. } => {
                HttpResponse::GatewayTimeout().body("Gateway Timeout")
            }
            GatewayError::UnknownService => HttpResponse::NotFound().body("Service not found"),
            GatewayError::Internal => {
                HttpResponse::InternalServerError().body("Internal Server Error")
            }
        }
    }
}

impl GatewayError {
    /// Whether this failure should be reported to the originating service's
    /// circuit breaker. `BREAKER_OPEN` never counts against itself; a
    /// well-formed backend response (including a proxied 5xx) never reaches
    /// this type at all — only transport-level failures do.
    pub fn counts_as_breaker_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::ConnectError { .. } | GatewayError::Timeout { .. } | GatewayError::Internal
        )
    }
}
