// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dashboard push socket (§4.7, §6): a websocket that sends one
//! `initial-state` snapshot on connect, then forwards bus events live.
//! Best-effort only — a slow client is dropped from the broadcast, never
//! blocking the event loop (§5 backpressure policy).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;

use crate::state::AppState;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let sessions = match state.store.list_sessions() {
        Ok(sessions) => sessions,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load initial dashboard snapshot");
            Vec::new()
        }
    };
    let initial = json!({ "type": "initial-state", "sessions": sessions });
    if socket.send(Message::Text(initial.to_string().into())).await.is_err() {
        return;
    }

    let mut rx = state.bus.subscribe();
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(body) = serde_json::to_string(&event) else { continue };
                        if socket.send(Message::Text(body.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}
