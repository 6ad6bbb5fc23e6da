//! The WebSocket bridge: upgrades the inbound client connection, opens a
//! matching connection to the messaging backend, and shuttles frames between
//! the two until either side closes.

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{CloseCode, CloseReason};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use tokio_tungstenite::tungstenite::Message as BackendMessage;

use crate::auth;
use crate::error::GatewayError;
use crate::routes::table::MESSAGING_WS_PREFIX;
use crate::state::GatewayState;

/// Rewrites an `http(s)://` base URL into its `ws(s)://` equivalent and
/// appends the messaging service's own WebSocket path plus the tail of the
/// inbound path past [`MESSAGING_WS_PREFIX`].
fn backend_ws_url(base_url: &str, path: &str, query: Option<&str>) -> String {
    let scheme_rewritten = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    let tail = path.strip_prefix(MESSAGING_WS_PREFIX).unwrap_or(path);
    let mut url = format!(
        "{}/api/v1/messaging/ws/{}",
        scheme_rewritten.trim_end_matches('/'),
        tail
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

fn policy_violation(reason: &str) -> CloseReason {
    CloseReason { code: CloseCode::Policy, description: Some(reason.to_string()) }
}

/// Upgrades the inbound request to a WebSocket, verifies the caller's
/// credential (query `token` first, then the `Authorization` header), opens a
/// paired connection to the messaging backend, and bridges frames between
/// them. The first side to close tears down the other.
///
/// A missing or invalid credential closes the now-upgraded socket with code
/// 1008 (policy violation) rather than failing the HTTP upgrade itself. By
/// the time a credential can be checked the 101 response is already
/// committed, so the only way to reject the caller is over the socket.
pub async fn handle(
    req: HttpRequest,
    body: web::Payload,
    state: web::Data<GatewayState>,
) -> Result<HttpResponse, GatewayError> {
    let query_token = web::Query::<std::collections::HashMap<String, String>>::from_query(
        req.uri().query().unwrap_or(""),
    )
    .ok();
    let query_token = query_token.as_ref().and_then(|q| q.get("token")).map(String::as_str);
    let auth_header = req
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let (response, mut client_session, mut client_stream) =
        actix_ws::handle(&req, body).map_err(|_| GatewayError::Internal)?;

    let token = match auth::extract_ws_token(query_token, auth_header) {
        Some(token) => token,
        None => {
            let _ = client_session.close(Some(policy_violation("Authentication failed"))).await;
            return Ok(response);
        }
    };
    if auth::verify(token, &state.settings.jwt_secret_key).is_err() {
        let _ = client_session.close(Some(policy_violation("Authentication failed"))).await;
        return Ok(response);
    }

    let entry = match state.registry.get("messaging") {
        Some(entry) => entry,
        None => {
            let _ = client_session.close(None).await;
            return Ok(response);
        }
    };
    let backend_url = backend_ws_url(&entry.base_url, req.path(), req.uri().query());

    let (backend_stream, _response) = match tokio_tungstenite::connect_async(&backend_url).await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("failed to connect to messaging backend: {e}");
            let _ = client_session
                .close(Some(CloseReason { code: CloseCode::Error, description: Some("backend unreachable".to_string()) }))
                .await;
            return Ok(response);
        }
    };
    let (mut backend_write, mut backend_read) = backend_stream.split();

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                client_msg = client_stream.next() => {
                    match client_msg {
                        Some(Ok(actix_ws::Message::Text(text))) => {
                            if backend_write.send(BackendMessage::Text(text.to_string())).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(actix_ws::Message::Binary(bin))) => {
                            if backend_write.send(BackendMessage::Binary(bin.to_vec())).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(actix_ws::Message::Ping(bytes))) => {
                            let _ = client_session.pong(&bytes).await;
                        }
                        Some(Ok(actix_ws::Message::Close(_))) | None => {
                            let _ = backend_write.close().await;
                            break;
                        }
                        Some(Err(_)) => {
                            warn!("client websocket stream errored, tearing down bridge");
                            let _ = backend_write.close().await;
                            break;
                        }
                        _ => {}
                    }
                }
                backend_msg = backend_read.next() => {
                    match backend_msg {
                        Some(Ok(BackendMessage::Text(text))) => {
                            if client_session.text(text).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(BackendMessage::Binary(bin))) => {
                            if client_session.binary(bin).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(BackendMessage::Close(_))) | None => {
                            let _ = client_session.close(None).await;
                            break;
                        }
                        Some(Err(_)) => {
                            warn!("backend websocket stream errored, tearing down bridge");
                            let _ = client_session.close(None).await;
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
        info!("websocket bridge to messaging service closed");
    });

    Ok(response)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        &format!("{MESSAGING_WS_PREFIX}{{tail:.*}}"),
        web::get().to(handle),
    );
}
