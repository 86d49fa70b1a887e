//! Inbound administrative endpoints — spec §6.2.
//!
//! Route shape grounded on `other_examples/.../9f25a2fe_mentalcardgames-mcg__server-src-net.rs.rs`'s
//! `build_router` (health route + `.with_state`), generalized from a single
//! lobby to a table registry.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::adapters::agent::{AgentActionRequest, AgentActionResponse};
use crate::adapters::directory::DirectoryClient;
use crate::error::GameError;
use crate::registry::Registry;
use crate::state::hand::Action;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub directory: Arc<dyn DirectoryClient>,
    pub default_action_timeout_seconds: u64,
    pub reconnect_grace_ms: u64,
}

/// Route table without a bound state, so `net::build_app` can graft the
/// websocket route on before finalizing the router's shared state.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/seat-player", post(seat_player))
        .route("/agent-action", post(agent_action))
        .route("/game/:game_id/state", get(game_state))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
struct SeatPlayerRequest {
    table_id: String,
    user_id: String,
    username: String,
    stack: u64,
    seat_number: usize,
    community_id: Option<String>,
    table_name: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SeatPlayerResponse {
    game_id: String,
    player_id: String,
    players_count: usize,
    max_seats: usize,
}

async fn seat_player(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SeatPlayerRequest>,
) -> Result<Json<SeatPlayerResponse>, ApiError> {
    let config = crate::net::resolve_table_config(
        &state,
        &body.table_id,
        body.stack,
        body.community_id.clone(),
        body.table_name.clone(),
        body.timeout_seconds,
    )
    .await;
    let handle = state.registry.get_or_create_table(&body.table_id, config).await;
    handle.seat_player(&body.user_id, &body.username, body.seat_number, body.stack).await?;
    let snapshot = handle.snapshot(&body.user_id).await?;
    let players_count = snapshot["seats"].as_array().map(|seats| seats.len()).unwrap_or(0);

    Ok(Json(SeatPlayerResponse {
        game_id: body.table_id,
        player_id: body.user_id,
        players_count,
        max_seats: crate::constants::MAX_PLAYERS,
    }))
}

async fn agent_action(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AgentActionRequest>,
) -> Result<Json<AgentActionResponse>, ApiError> {
    let handle = state
        .registry
        .table(&body.game_id)
        .ok_or_else(|| GameError::not_found(format!("no game {}", body.game_id)))?;

    let action = Action::parse(&body.action, body.amount)?;
    let now_ms = crate::current_time_ms();
    handle.submit_action(&body.user_id, action, now_ms).await?;

    let state_for_player = handle.snapshot(&body.user_id).await?;
    Ok(Json(AgentActionResponse { state_for_player }))
}

#[derive(Debug, Deserialize)]
struct GameStateQuery {
    user_id: String,
}

async fn game_state(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
    Query(query): Query<GameStateQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state.registry.table(&game_id).ok_or_else(|| GameError::not_found(format!("no game {game_id}")))?;
    let snapshot = handle.snapshot(&query.user_id).await?;
    Ok(Json(snapshot))
}

struct ApiError(GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        ApiError(err)
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.0.http_status()).unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({ "error": self.0.reason(), "message": self.0.to_string() }));
        (status, body).into_response()
    }
}
