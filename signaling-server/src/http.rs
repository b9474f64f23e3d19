use std::net::SocketAddr;

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::connection::handle_connection;
use crate::protocol::GameSnapshot;
use crate::state::AppState;

fn decode_path_segment(seg: &str) -> String {
    match urlencoding::decode(seg) {
        Ok(s) => s.into_owned(),
        Err(_) => seg.to_string(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let (status, payload) = match serde_json::to_string(body) {
        Ok(json) => (status, json),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"success":false,"error":"serialization failed"}"#.to_string(),
            )
        }
    };
    let mut resp = Response::new(Body::from(payload));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp
}

fn with_cors(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    resp
}

// ============================================
// HTTP REST API Handlers
// ============================================

async fn handle_api_request(
    req: Request<Body>,
    state: AppState,
) -> Result<Response<Body>, hyper::Error> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let path_parts: Vec<&str> = path.split('/').collect();

    match (method, path_parts.get(2).copied(), path_parts.get(3).copied()) {
        // POST /api/game-state - Snapshot pushed by the game server
        (Method::POST, Some("game-state"), None) => {
            let body_bytes = hyper::body::to_bytes(req.into_body()).await?;
            match serde_json::from_slice::<GameSnapshot>(&body_bytes) {
                Ok(snapshot) => {
                    let players = snapshot.players.len();
                    let outcome = state.ingest_snapshot(snapshot).await;
                    info!("Ingested game state with {} players", players);
                    Ok(json_response(
                        StatusCode::OK,
                        &json!({
                            "success": true,
                            "pttStates": outcome.ptt_states,
                            "voiceStates": outcome.voice_states,
                        }),
                    ))
                }
                Err(e) => {
                    warn!("Failed to parse game state: {}", e);
                    Ok(json_response(
                        StatusCode::BAD_REQUEST,
                        &json!({"success": false, "error": format!("Invalid request body: {}", e)}),
                    ))
                }
            }
        }

        // GET /api/game-state - Latest stored snapshot
        (Method::GET, Some("game-state"), None) => match state.current_snapshot().await {
            Some(snapshot) => Ok(json_response(StatusCode::OK, &snapshot)),
            None => Ok(json_response(
                StatusCode::NOT_FOUND,
                &json!({"success": false, "error": "No game state received yet"}),
            )),
        },

        // GET /api/ptt-states - Dump of the push-to-talk store
        (Method::GET, Some("ptt-states"), None) => {
            Ok(json_response(StatusCode::OK, &state.ptt_states().await))
        }

        // GET /api/voice-states - Dump of the voice-activity store
        (Method::GET, Some("voice-states"), None) => {
            Ok(json_response(StatusCode::OK, &state.voice_states().await))
        }

        // GET /api/verify-gamertag/{gamertag} - Advisory existence check
        (Method::GET, Some("verify-gamertag"), Some(raw)) if !raw.is_empty() => {
            let gamertag = decode_path_segment(raw).trim().to_string();
            match state.lookup.verify(&gamertag).await {
                Ok(result) => Ok(json_response(StatusCode::OK, &result)),
                Err(e) => {
                    warn!("Gamertag lookup for {} failed: {}", gamertag, e);
                    Ok(json_response(
                        StatusCode::BAD_GATEWAY,
                        &json!({"success": false, "error": e.to_string()}),
                    ))
                }
            }
        }

        (_, Some("game-state" | "ptt-states" | "voice-states" | "verify-gamertag"), _) => Ok(
            text_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        ),

        _ => Ok(text_response(StatusCode::NOT_FOUND, "API endpoint not found")),
    }
}

// ============================================
// Main Request Handler
// ============================================

pub async fn handle_request(
    mut req: Request<Body>,
    state: AppState,
    remote_addr: SocketAddr,
) -> Result<Response<Body>, hyper::Error> {
    let path = req.uri().path().to_string();

    // CORS preflight (the overlay fetches from a browser context)
    if *req.method() == Method::OPTIONS {
        let mut resp = with_cors(text_response(StatusCode::NO_CONTENT, ""));
        resp.headers_mut()
            .insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
        return Ok(resp);
    }

    if path == "/health" {
        let report = state.health().await;
        return Ok(with_cors(json_response(StatusCode::OK, &report)));
    }

    if path.starts_with("/api/") {
        let resp = handle_api_request(req, state).await?;
        return Ok(with_cors(resp));
    }

    // WebSocket upgrade
    if hyper_tungstenite::is_upgrade_request(&req) {
        match hyper_tungstenite::upgrade(&mut req, None) {
            Ok((response, websocket)) => {
                tokio::spawn(async move {
                    match websocket.await {
                        Ok(ws) => handle_connection(ws, remote_addr, state).await,
                        Err(e) => error!("WebSocket handshake with {} failed: {}", remote_addr, e),
                    }
                });
                return Ok(response);
            }
            Err(e) => {
                error!("WebSocket upgrade error: {}", e);
                return Ok(text_response(
                    StatusCode::BAD_REQUEST,
                    "Invalid WebSocket upgrade request",
                ));
            }
        }
    }

    Ok(text_response(
        StatusCode::NOT_FOUND,
        "Not found. Use /health for health check, /api/* for REST API, or upgrade to WebSocket.",
    ))
}
