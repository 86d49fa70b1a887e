//! Binary entrypoint — spec §6.5. Loads `Config` from the environment, wires
//! the Cache Gateway and Directory adapter for the configured `MODE`, and
//! serves the combined HTTP + websocket router.
//!
//! Grounded on `other_examples/.../9f25a2fe_mentalcardgames-mcg__server-src-net.rs.rs`'s
//! binary wiring (`tracing_subscriber::fmt`, axum's `serve`) and on
//! `other_examples/.../968597fa_ShiLu1211-texas-engine__poker-ws-src-main.rs.rs`'s
//! background tick loop driving table timers.

use std::sync::Arc;
use std::time::Duration;

use holdem_core::adapters::directory::{DirectoryClient, HttpDirectoryClient, StubDirectoryClient};
use holdem_core::cache::{CacheGateway, InMemoryCache, RedisCache};
use holdem_core::config::{Config, Mode};
use holdem_core::net::{build_app, AppState};
use holdem_core::registry::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    tracing::info!(mode = ?config.mode, port = config.listen_port, "starting server");

    let cache: Arc<dyn CacheGateway> = match config.mode {
        Mode::Test => Arc::new(InMemoryCache::new()),
        Mode::Production => Arc::new(RedisCache::connect(&config.cache_host, config.cache_port, config.cache_db)?),
    };
    let directory: Arc<dyn DirectoryClient> = match config.mode {
        Mode::Test => Arc::new(StubDirectoryClient::new(config.auth_token_secret.clone())),
        Mode::Production => Arc::new(HttpDirectoryClient::new(&config.directory_url)),
    };

    let registry = Registry::new(cache, directory.clone());
    spawn_tick_loop(registry.clone());

    let app = build_app(AppState {
        registry,
        directory,
        default_action_timeout_seconds: config.default_action_timeout_sec,
        reconnect_grace_ms: config.reconnect_grace_ms,
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.listen_port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Every table actor owns its own timers but only fires on an incoming
/// `TableCommand` — this loop is what actually delivers the periodic
/// `Tick` that lets action-deadline and reconnect-grace timeouts resolve
/// even when nobody sends a fresh event.
fn spawn_tick_loop(registry: Registry) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            let now_ms = holdem_core::current_time_ms();
            for table_id in registry.table_ids() {
                if let Some(handle) = registry.table(&table_id) {
                    if let Err(err) = handle.tick(now_ms) {
                        tracing::warn!(table_id, error = %err, "tick delivery failed");
                    }
                }
            }
        }
    });
}
