pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use http::AppState;

use crate::adapters::directory::DirectoryClient;
use crate::state::table_session::TableSessionConfig;

/// Wires the admin HTTP surface (`http::routes`) together with the
/// websocket Client Gateway route (§4.6) behind one shared `AppState`.
pub fn build_app(state: AppState) -> Router {
    http::routes()
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Resolves the `TableConfig` a fresh table is created with (SPEC_FULL.md
/// §4.4: "sourced once at table creation from the `seatPlayer` call or the
/// Directory's `getTableConfig`"). A no-op on an already-running table,
/// since `Registry::get_or_create_table` ignores its config argument once
/// the table exists. Directory values win over the caller-supplied
/// defaults when present; a failed or unreachable Directory call just
/// leaves the defaults in place rather than blocking table creation.
pub(crate) async fn resolve_table_config(
    state: &AppState,
    table_id: &str,
    requested_stack: u64,
    community_id: Option<String>,
    table_name: Option<String>,
    timeout_seconds: Option<u64>,
) -> TableSessionConfig {
    let mut small_blind = 10;
    let mut big_blind = 20;
    let mut initial_stack = requested_stack;
    let mut ante = None;
    let mut action_timeout_seconds = timeout_seconds.or(Some(state.default_action_timeout_seconds));

    if state.registry.table(table_id).is_none() {
        if let Ok(directory_config) = state.directory.get_table_config(table_id).await {
            if let Some(value) = directory_config.small_blind {
                small_blind = value;
            }
            if let Some(value) = directory_config.big_blind {
                big_blind = value;
            }
            if let Some(value) = directory_config.initial_stack {
                initial_stack = value;
            }
            if directory_config.ante.is_some() {
                ante = directory_config.ante;
            }
            if let Some(value) = directory_config.action_timeout_seconds {
                action_timeout_seconds = Some(value);
            }
        }
    }

    TableSessionConfig {
        small_blind,
        big_blind,
        initial_stack,
        ante,
        action_timeout_seconds,
        community_id,
        table_name,
        reconnect_grace_ms: state.reconnect_grace_ms,
    }
}
