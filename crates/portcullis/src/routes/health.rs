//! The `/health` endpoint: overall status plus per-service breaker state.

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::circuit_breaker::CircuitState;
use crate::state::GatewayState;

fn status_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "healthy",
        CircuitState::Open => "unavailable",
        CircuitState::HalfOpen => "recovering",
    }
}

pub async fn health_check(state: web::Data<GatewayState>) -> HttpResponse {
    let mut services = serde_json::Map::new();
    for (name, entry) in state.registry.iter() {
        services.insert(
            name.to_string(),
            json!({
                "url": entry.base_url,
                "status": status_label(entry.breaker.state()),
            }),
        );
    }

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "services": services,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
