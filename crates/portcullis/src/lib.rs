//! Authenticating API gateway library.
//!
//! This crate implements the request-proxying pipeline fronting a fixed roster of
//! downstream HTTP services: credential verification, a per-service circuit breaker,
//! a data-driven route table, a buffering/streaming proxy engine and a WebSocket
//! bridge to the real-time messaging backend. The binary crate `portcullis-gateway`
//! wires this library into an actix-web server.
//!
//! # Module Organization
//!
//! - [`config`] - environment-sourced settings and startup validation
//! - [`error`] - the `GatewayError` taxonomy and its HTTP mapping
//! - [`auth`] - bearer credential verification (HTTP and WebSocket)
//! - [`circuit_breaker`] - the per-service closed/open/half-open state machine
//! - [`registry`] - the fixed service-name to base-url-and-breaker mapping
//! - [`proxy`] - URL assembly, header hygiene, buffer-vs-stream forwarding
//! - [`routes`] - the route table and the actix handlers built on top of it
//! - [`state`] - `GatewayState`, the single value threaded through every handler
//! - [`logs`] - structured logging setup

pub mod auth;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod logs;
pub mod proxy;
pub mod registry;
pub mod routes;
pub mod state;

pub use config::settings::Settings;
pub use error::GatewayError;
pub use state::GatewayState;
