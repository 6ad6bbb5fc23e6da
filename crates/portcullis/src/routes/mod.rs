//! HTTP and WebSocket route handlers, and the data-driven table they
//! dispatch through.
//!
//! - [`table`] - the route table and longest-prefix-match dispatcher
//! - [`http`] - the catch-all HTTP handler wiring auth + proxying together
//! - [`health`] - the `/health` endpoint
//! - [`websocket`] - the WebSocket upgrade and bridging handler

pub mod health;
pub mod http;
pub mod table;
pub mod websocket;
