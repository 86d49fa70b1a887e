//! Process-wide registries — spec §5/§9: the table handle map and the
//! userId→socketId connection map are the only state shared across tables;
//! both are built on `dashmap` so lookups never contend with an unrelated
//! table's writer lock.
//!
//! Grounded on `other_examples/manifests/happybigmtn-bitchat-rust`'s use of
//! `dashmap` for concurrent process-wide maps, and on the teacher's
//! table-lookup-by-id pattern (PDA derivation stands in for a map lookup
//! on-chain; off-chain this is just a keyed table).

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::adapters::directory::DirectoryClient;
use crate::cache::CacheGateway;
use crate::error::{GameError, GameResult};
use crate::events::OutboundEvent;
use crate::state::hand::Action;
use crate::state::table_session::{DirectoryEffect, PayoutIntent, TableSession, TableSessionConfig};

/// One command sent to a table's owning task. Mutations are admitted one at
/// a time because the task loop processes `rx` sequentially — this is the
/// single-writer discipline of §5, expressed as "only one task ever holds
/// `&mut TableSession`" rather than a mutex.
pub enum TableCommand {
    SeatPlayer {
        user_id: String,
        display_name: String,
        seat_index: usize,
        stack: u64,
        respond_to: oneshot::Sender<GameResult<()>>,
    },
    MarkConnected {
        user_id: String,
        now_ms: i64,
        respond_to: oneshot::Sender<GameResult<()>>,
    },
    MarkDisconnected {
        user_id: String,
        socket_id: String,
        now_ms: i64,
    },
    Reconnect {
        user_id: String,
        new_socket_id: String,
        respond_to: oneshot::Sender<GameResult<()>>,
    },
    SubmitAction {
        user_id: String,
        action: Action,
        now_ms: i64,
        respond_to: oneshot::Sender<GameResult<()>>,
    },
    Chat {
        user_id: String,
        text: String,
        now_ms: i64,
    },
    Leave {
        user_id: String,
        respond_to: oneshot::Sender<GameResult<PayoutIntent>>,
    },
    Snapshot {
        user_id: String,
        respond_to: oneshot::Sender<Value>,
    },
    Tick {
        now_ms: i64,
    },
}

#[derive(Clone)]
pub struct TableHandle {
    pub table_id: String,
    pub tx: mpsc::UnboundedSender<TableCommand>,
}

impl TableHandle {
    pub async fn seat_player(&self, user_id: impl Into<String>, display_name: impl Into<String>, seat_index: usize, stack: u64) -> GameResult<()> {
        let (respond_to, rx) = oneshot::channel();
        self.send(TableCommand::SeatPlayer { user_id: user_id.into(), display_name: display_name.into(), seat_index, stack, respond_to })?;
        rx.await.map_err(|_| GameError::Transport("table task dropped the response channel".into()))?
    }

    pub async fn mark_connected(&self, user_id: impl Into<String>, now_ms: i64) -> GameResult<()> {
        let (respond_to, rx) = oneshot::channel();
        self.send(TableCommand::MarkConnected { user_id: user_id.into(), now_ms, respond_to })?;
        rx.await.map_err(|_| GameError::Transport("table task dropped the response channel".into()))?
    }

    pub fn mark_disconnected(&self, user_id: impl Into<String>, socket_id: impl Into<String>, now_ms: i64) -> GameResult<()> {
        self.send(TableCommand::MarkDisconnected { user_id: user_id.into(), socket_id: socket_id.into(), now_ms })
    }

    pub async fn reconnect(&self, user_id: impl Into<String>, new_socket_id: impl Into<String>) -> GameResult<()> {
        let (respond_to, rx) = oneshot::channel();
        self.send(TableCommand::Reconnect { user_id: user_id.into(), new_socket_id: new_socket_id.into(), respond_to })?;
        rx.await.map_err(|_| GameError::Transport("table task dropped the response channel".into()))?
    }

    pub async fn submit_action(&self, user_id: impl Into<String>, action: Action, now_ms: i64) -> GameResult<()> {
        let (respond_to, rx) = oneshot::channel();
        self.send(TableCommand::SubmitAction { user_id: user_id.into(), action, now_ms, respond_to })?;
        rx.await.map_err(|_| GameError::Transport("table task dropped the response channel".into()))?
    }

    pub fn chat(&self, user_id: impl Into<String>, text: impl Into<String>, now_ms: i64) -> GameResult<()> {
        self.send(TableCommand::Chat { user_id: user_id.into(), text: text.into(), now_ms })
    }

    pub async fn leave(&self, user_id: impl Into<String>) -> GameResult<PayoutIntent> {
        let (respond_to, rx) = oneshot::channel();
        self.send(TableCommand::Leave { user_id: user_id.into(), respond_to })?;
        rx.await.map_err(|_| GameError::Transport("table task dropped the response channel".into()))?
    }

    pub async fn snapshot(&self, user_id: impl Into<String>) -> GameResult<Value> {
        let (respond_to, rx) = oneshot::channel();
        self.send(TableCommand::Snapshot { user_id: user_id.into(), respond_to })?;
        rx.await.map_err(|_| GameError::Transport("table task dropped the response channel".into()))
    }

    pub fn tick(&self, now_ms: i64) -> GameResult<()> {
        self.send(TableCommand::Tick { now_ms })
    }

    fn send(&self, cmd: TableCommand) -> GameResult<()> {
        self.tx.send(cmd).map_err(|_| GameError::Transport(format!("table {} actor is gone", self.table_id)))
    }
}

/// Runs a `TableSession`'s admission loop: the only task that ever touches
/// it mutably. `deliver` performs the actual outbound I/O after each
/// mutation releases this loop's implicit lock on the session (§5
/// "produce state under lock, release lock, then outbound I/O").
pub async fn run_table_actor(
    mut session: TableSession,
    mut rx: mpsc::UnboundedReceiver<TableCommand>,
    deliver: Arc<dyn Fn(Vec<crate::state::table_session::Outgoing>) + Send + Sync>,
    cache: Arc<dyn CacheGateway>,
    tables: Arc<DashMap<String, TableHandle>>,
    directory: Arc<dyn DirectoryClient>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            TableCommand::SeatPlayer { user_id, display_name, seat_index, stack, respond_to } => {
                let result = session.seat_player(user_id, display_name, seat_index, stack);
                let (ack, outgoing) = split_result(result);
                save(&cache, &session).await;
                deliver(outgoing);
                let _ = respond_to.send(ack);
            }
            TableCommand::MarkConnected { user_id, now_ms, respond_to } => {
                let result = session.mark_connected(&user_id, now_ms);
                let (ack, outgoing) = split_result(result);
                save(&cache, &session).await;
                deliver(outgoing);
                let _ = respond_to.send(ack);
            }
            TableCommand::MarkDisconnected { user_id, socket_id, now_ms } => {
                let outgoing = session.mark_disconnected(&user_id, socket_id, now_ms);
                save(&cache, &session).await;
                deliver(outgoing);
            }
            TableCommand::Reconnect { user_id, new_socket_id, respond_to } => {
                let result = session.reconnect(&user_id, new_socket_id);
                let (ack, outgoing) = split_result(result);
                save(&cache, &session).await;
                deliver(outgoing);
                let _ = respond_to.send(ack);
            }
            TableCommand::SubmitAction { user_id, action, now_ms, respond_to } => {
                match session.submit_action(&user_id, action, now_ms) {
                    Ok((outgoing, effects)) => {
                        save(&cache, &session).await;
                        deliver(outgoing);
                        apply_effects(&directory, &session.table_id, effects).await;
                        let _ = respond_to.send(Ok(()));
                    }
                    Err(err) => {
                        deliver(vec![crate::state::table_session::Outgoing {
                            user_id: user_id.clone(),
                            event: OutboundEvent::ActionError { reason: err.to_string() },
                        }]);
                        let _ = respond_to.send(Err(err));
                    }
                }
            }
            TableCommand::Chat { user_id, text, now_ms } => {
                let outgoing = session.chat(&user_id, text, now_ms);
                save(&cache, &session).await;
                deliver(outgoing);
            }
            TableCommand::Leave { user_id, respond_to } => {
                let result = session.leave(&user_id);
                match result {
                    Ok((payout, outgoing, effects)) => {
                        save(&cache, &session).await;
                        deliver(outgoing);
                        apply_effects(&directory, &session.table_id, effects).await;
                        let _ = respond_to.send(Ok(payout));
                    }
                    Err(err) => {
                        let _ = respond_to.send(Err(err));
                    }
                }
            }
            TableCommand::Snapshot { user_id, respond_to } => {
                let _ = respond_to.send(session.snapshot_for(&user_id));
            }
            TableCommand::Tick { now_ms } => match session.tick(now_ms) {
                Ok((outgoing, effects)) => {
                    save(&cache, &session).await;
                    deliver(outgoing);
                    apply_effects(&directory, &session.table_id, effects).await;
                }
                Err(err) => tracing::warn!(table_id = %session.table_id, error = %err, "tick failed"),
            },
        }
        if session.should_tear_down() {
            if let Err(err) = cache.delete(&session.table_id).await {
                tracing::warn!(table_id = %session.table_id, error = %err, "cache cleanup failed");
            }
            tables.remove(&session.table_id);
            break;
        }
    }
}

/// Persists the session's current hand bytes. Called after a command
/// mutates `session` but before `deliver` broadcasts the resulting
/// `Outgoing`s, so a crash can never leave clients holding state that
/// was never durably saved (spec.md "on success, persists and
/// broadcasts" — save-before-broadcast is the required relative order).
async fn save(cache: &Arc<dyn CacheGateway>, session: &TableSession) {
    if let Err(err) = cache.save(&session.table_id, session.hand_bytes()).await {
        tracing::warn!(table_id = %session.table_id, error = %err, "cache save failed");
    }
}

/// Applies the Directory-adapter calls a command produced, after the
/// session lock has already been released. Failures are logged and
/// suppressed (§7 "External... retried with bounded attempts for wallet
/// ops, otherwise logged and suppressed"); this implementation doesn't
/// retry wallet ops since the actor loop has no outstanding-retry queue,
/// but still never lets a Directory failure fail the admitted mutation.
async fn apply_effects(directory: &Arc<dyn DirectoryClient>, table_id: &str, effects: Vec<DirectoryEffect>) {
    for effect in effects {
        let result = match effect {
            DirectoryEffect::CreditWallet { user_id, community_id, amount, memo } => {
                directory.credit_wallet(&user_id, &community_id, amount, &memo).await.map(|_| ())
            }
            DirectoryEffect::UnseatPlayer { table_id, user_id } => directory.unseat_player(&table_id, &user_id).await,
            DirectoryEffect::RecordHandHistory { community_id, table_id, name, hand_data } => {
                directory.record_hand_history(&community_id, &table_id, &name, hand_data).await
            }
        };
        if let Err(err) = result {
            tracing::warn!(table_id, error = %err, "directory effect failed");
        }
    }
}

fn split_result<T>(result: GameResult<Vec<crate::state::table_session::Outgoing>>) -> (GameResult<T>, Vec<crate::state::table_session::Outgoing>)
where
    T: Default,
{
    match result {
        Ok(outgoing) => (Ok(T::default()), outgoing),
        Err(err) => (Err(err), Vec::new()),
    }
}

/// Process-wide table directory and socket routing table.
#[derive(Clone)]
pub struct Registry {
    tables: Arc<DashMap<String, TableHandle>>,
    /// Serializes table creation so two concurrent `seatPlayer` calls for a
    /// brand-new table id don't spawn two actors for the same table.
    creation_lock: Arc<Mutex<()>>,
    sockets: Arc<DashMap<String, mpsc::UnboundedSender<OutboundEvent>>>,
    user_socket: Arc<DashMap<String, String>>,
    cache: Arc<dyn CacheGateway>,
    directory: Arc<dyn DirectoryClient>,
}

impl Registry {
    pub fn new(cache: Arc<dyn CacheGateway>, directory: Arc<dyn DirectoryClient>) -> Self {
        Registry {
            tables: Arc::new(DashMap::new()),
            creation_lock: Arc::new(Mutex::new(())),
            sockets: Arc::new(DashMap::new()),
            user_socket: Arc::new(DashMap::new()),
            cache,
            directory,
        }
    }

    pub fn table(&self, table_id: &str) -> Option<TableHandle> {
        self.tables.get(table_id).map(|entry| entry.clone())
    }

    pub fn table_ids(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get-or-create a table actor, spawning its task if this is the first
    /// reference to `table_id`. On a fresh spawn, a Cache Gateway hit
    /// rehydrates the hand in flight before any socket can reach it.
    pub async fn get_or_create_table(&self, table_id: &str, config: TableSessionConfig) -> TableHandle {
        if let Some(handle) = self.table(table_id) {
            return handle;
        }
        let _guard = self.creation_lock.lock().await;
        if let Some(handle) = self.table(table_id) {
            return handle;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = TableHandle { table_id: table_id.to_string(), tx };
        self.tables.insert(table_id.to_string(), handle.clone());

        let mut session = TableSession::new(table_id, config);
        match self.cache.load(table_id).await {
            Ok(Some(bytes)) => {
                if let Err(err) = session.restore_hand_bytes(&bytes) {
                    tracing::warn!(table_id, error = %err, "discarding unreadable cached hand");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(table_id, error = %err, "cache load failed"),
        }

        let sockets = self.sockets.clone();
        let user_socket = self.user_socket.clone();
        let deliver: Arc<dyn Fn(Vec<crate::state::table_session::Outgoing>) + Send + Sync> = Arc::new(move |outgoing| {
            for item in outgoing {
                if let Some(socket_id) = user_socket.get(&item.user_id) {
                    if let Some(sink) = sockets.get(socket_id.as_str()) {
                        let _ = sink.send(item.event);
                    }
                }
            }
        });
        tokio::spawn(run_table_actor(session, rx, deliver, self.cache.clone(), self.tables.clone(), self.directory.clone()));
        handle
    }

    pub fn register_socket(&self, socket_id: impl Into<String>, sink: mpsc::UnboundedSender<OutboundEvent>) {
        self.sockets.insert(socket_id.into(), sink);
    }

    pub fn unregister_socket(&self, socket_id: &str) {
        self.sockets.remove(socket_id);
    }

    /// At most one live socket per userId (§3 ClientSession invariant): a
    /// new binding replaces any previous one.
    pub fn bind_user_socket(&self, user_id: impl Into<String>, socket_id: impl Into<String>) {
        self.user_socket.insert(user_id.into(), socket_id.into());
    }

    pub fn unbind_user_socket(&self, user_id: &str) {
        self.user_socket.remove(user_id);
    }

    pub fn socket_for_user(&self, user_id: &str) -> Option<String> {
        self.user_socket.get(user_id).map(|entry| entry.clone())
    }
}
