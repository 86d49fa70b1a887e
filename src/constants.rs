//! Tunable constants shared across the engine.
//!
//! Mirrors the teacher's `constants.rs`, stripped of PDA seeds and
//! on-chain timeout units (Solana slots) in favor of wall-clock durations,
//! since this server has no ledger to key accounts off of.

pub const DECK_SIZE: usize = 52;
pub const HOLE_CARDS: usize = 2;
pub const COMMUNITY_CARDS: usize = 5;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 9;

/// Default seconds a seat has to act before the timeout handler resolves
/// it automatically. Overridable per-table via `TableConfig::action_timeout`.
pub const DEFAULT_ACTION_TIMEOUT_SECONDS: u64 = 30;

/// Default grace window after a disconnect before the seat is evicted.
pub const DEFAULT_RECONNECT_GRACE_MS: u64 = 60_000;

/// Delay between a hand completing and the next one starting.
pub const NEXT_HAND_DELAY_SECONDS: u64 = 3;

/// Chat ring buffer capacity per table.
pub const CHAT_HISTORY_CAPACITY: usize = 100;
