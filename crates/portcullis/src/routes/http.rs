//! The catch-all HTTP handler: matches the request against the route table,
//! enforces its auth policy, and forwards it.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth;
use crate::error::GatewayError;
use crate::proxy;
use crate::routes::table::{self, AuthPolicy};
use crate::state::GatewayState;

/// Handles any method on any path not claimed by `/health` or the WebSocket
/// upgrade route. Actix registers this once, as `/{tail:.*}`.
pub async fn handle(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<GatewayState>,
) -> Result<HttpResponse, GatewayError> {
    let path = req.path();
    let entry = table::dispatch(req.method(), path).ok_or(GatewayError::UnknownService)?;

    if entry.auth_policy == AuthPolicy::Authed {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = auth::extract_bearer(header);
        match token {
            // No usable bearer token: header absent or a non-bearer scheme.
            None => return Err(GatewayError::MissingCredential),
            Some(token) => {
                auth::verify(token, &state.settings.jwt_secret_key)?;
            }
        }
    }

    let downstream_path = entry.rewrite.apply(path);
    let query = req.uri().query();

    proxy::forward(
        &state,
        entry.service,
        downstream_path,
        req.method(),
        query,
        req.headers(),
        payload,
    )
    .await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/{tail:.*}").to(handle));
}
