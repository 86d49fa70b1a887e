//! Client Gateway — spec §4.6, §6.1. Auth handshake, inbound event
//! dispatch, outbound personalized snapshots, and socket bookkeeping.
//!
//! Grounded on `other_examples/.../968597fa_ShiLu1211-texas-engine__poker-ws-src-main.rs.rs`'s
//! `handle_socket` (split socket, writer task fed by an mpsc channel,
//! subscribe-then-dispatch loop) and
//! `other_examples/.../9f25a2fe_mentalcardgames-mcg__server-src-net.rs.rs`'s
//! `ws_handler`/`handle_socket` (reject the socket outright if the first
//! frame isn't the expected handshake message).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::adapters::directory::DirectoryClient;
use crate::events::{InboundEvent, OutboundEvent};
use crate::net::http::AppState;
use crate::state::client_session::ClientSession;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
    pub table_id: String,
}

pub async fn ws_handler(ws: WebSocketUpgrade, Query(query): Query<WsQuery>, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

async fn handle_socket(socket: WebSocket, query: WsQuery, state: Arc<AppState>) {
    let verified = match state.directory.verify_token(&query.token).await {
        Ok(verified) => verified,
        Err(err) => {
            let _ = send_once(socket, OutboundEvent::Error { message: err.to_string() }).await;
            return;
        }
    };
    let user_id = verified.user_id;
    let socket_id = uuid::Uuid::new_v4().to_string();
    let mut client_session = ClientSession::new(socket_id.clone(), user_id.clone(), verified.username.clone());

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundEvent>();
    state.registry.register_socket(&socket_id, out_tx.clone());
    state.registry.bind_user_socket(&user_id, &socket_id);

    let _ = out_tx.send(OutboundEvent::Connected { socket_id: socket_id.clone(), message: format!("welcome, {}", verified.username) });

    let writer = tokio::spawn(async move {
        let mut keepalive = interval(Duration::from_secs(20));
        loop {
            tokio::select! {
                maybe_event = out_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    let Ok(json) = serde_json::to_string(&event) else { continue };
                    if ws_tx.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                _ = keepalive.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let config = crate::net::resolve_table_config(&state, &query.table_id, 1000, None, None, None).await;
    let handle = state.registry.get_or_create_table(&query.table_id, config).await;

    while let Some(Ok(message)) = ws_rx.next().await {
        let Message::Text(text) = message else {
            if matches!(message, Message::Close(_)) {
                break;
            }
            continue;
        };
        let event: InboundEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(_) => {
                let _ = out_tx.send(OutboundEvent::Error { message: "malformed event".into() });
                continue;
            }
        };

        let now_ms = crate::current_time_ms();
        let result = match event {
            InboundEvent::JoinTable { .. } => {
                client_session.join_table(&query.table_id);
                handle.mark_connected(&user_id, now_ms).await
            }
            InboundEvent::Action { kind, amount } => match crate::state::hand::Action::parse(&kind, amount) {
                Ok(action) => handle.submit_action(&user_id, action, now_ms).await,
                Err(err) => Err(err),
            },
            InboundEvent::Chat { text, .. } => handle.chat(&user_id, text, now_ms),
            InboundEvent::LeaveTable => {
                client_session.leave_table();
                handle.leave(&user_id).await.map(|_| ())
            }
            InboundEvent::Disconnect => break,
        };
        if let Err(err) = result {
            let _ = out_tx.send(OutboundEvent::ActionError { reason: err.to_string() });
        }
    }

    let now_ms = crate::current_time_ms();
    let _ = handle.mark_disconnected(&user_id, socket_id.clone(), now_ms);
    state.registry.unregister_socket(&socket_id);
    state.registry.unbind_user_socket(&user_id);
    writer.abort();
}

async fn send_once(mut socket: WebSocket, event: OutboundEvent) -> Result<(), axum::Error> {
    if let Ok(json) = serde_json::to_string(&event) {
        socket.send(Message::Text(json)).await?;
    }
    Ok(())
}
