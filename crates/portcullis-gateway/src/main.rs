//! Portcullis API Gateway Server
//!
//! This binary provides the main server entry point: it loads and validates
//! configuration, builds the shared gateway state, and wires the route table
//! into an Actix Web server with CORS and request logging.

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use portcullis::logs::logger::configure_logger;
use portcullis::routes::{health, http as http_routes, websocket};
use portcullis::{GatewayState, Settings};
use tokio::signal;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let settings = Settings::load();
    info!("Starting {} v{}", settings.app_name, env!("CARGO_PKG_VERSION"));

    let errors = settings.validate();
    if !errors.is_empty() {
        error!("Configuration validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        std::process::exit(1);
    }
    info!("Configuration validated successfully");

    let host = settings.host.clone();
    let port = settings.port;
    let allowed_origins = settings.allowed_origins.clone();
    let state = web::Data::new(GatewayState::new(settings));

    info!("Starting server on {host}:{port}");

    let server = HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"])
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
            ))
            .configure(health::configure)
            .configure(websocket::configure)
            .configure(http_routes::configure)
    })
    .bind((host.as_str(), port))?
    .run();

    info!("Server started successfully");

    tokio::select! {
        result = server => {
            match result {
                Ok(_) => info!("Server stopped gracefully"),
                Err(e) => error!("Server error: {e}"),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
    }

    Ok(())
}