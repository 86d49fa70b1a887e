//! TableSession — spec §3, §4.4. Owns one table's seated/connected sets,
//! its `Hand`, chat history, and disconnect records, and funnels every
//! mutation through itself so a single per-table writer lock (held by the
//! caller — see `registry.rs`) is sufficient to satisfy the single-writer
//! discipline of §5.
//!
//! Grounded on the teacher's `instructions/join_table.rs`, `leave_table.rs`,
//! `create_table.rs`, `timeout_player.rs`, `close_inactive_table.rs` for the
//! operations (seat/leave/timeout/cleanup), and on
//! `other_examples/.../ShiLu1211-texas-engine__poker-ws-src-main.rs.rs`'s
//! `TableActor` for the "produce outgoing events, let the caller perform the
//! I/O" shape — this struct never touches a socket directly, it only returns
//! a `Vec<Outgoing>` for the gateway to deliver.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::chat::ChatRingBuffer;
use super::disconnect::DisconnectRecord;
use super::hand::{Action, Hand, HandConfig, Stage};
use super::seat::Seat;
use crate::constants::MAX_PLAYERS;
use crate::error::{GameError, GameResult};
use crate::events::OutboundEvent;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableSessionConfig {
    pub small_blind: u64,
    pub big_blind: u64,
    pub initial_stack: u64,
    pub ante: Option<u64>,
    pub action_timeout_seconds: Option<u64>,
    pub community_id: Option<String>,
    pub table_name: Option<String>,
    pub reconnect_grace_ms: u64,
}

/// An event this session wants delivered to a specific user, produced
/// without doing any I/O itself (§5 "produce state under lock, release
/// lock, then do outbound I/O").
#[derive(Clone, Debug)]
pub struct Outgoing {
    pub user_id: String,
    pub event: OutboundEvent,
}

impl Outgoing {
    fn to(user_id: impl Into<String>, event: OutboundEvent) -> Self {
        Outgoing { user_id: user_id.into(), event }
    }
}

/// Amount owed to a leaving user, reported to the Directory adapter.
#[derive(Clone, Copy, Debug)]
pub struct PayoutIntent {
    pub user_id_seat: usize,
    pub amount: u64,
}

/// An outbound Directory-adapter call this session wants made, produced
/// without doing the actual network I/O itself (§5 "produce state under
/// lock, release lock, then do outbound I/O"; the actor task applies these
/// against its `DirectoryClient` after the command that produced them has
/// released the session).
#[derive(Clone, Debug)]
pub enum DirectoryEffect {
    CreditWallet { user_id: String, community_id: String, amount: u64, memo: String },
    UnseatPlayer { table_id: String, user_id: String },
    RecordHandHistory { community_id: String, table_id: String, name: String, hand_data: Value },
}

pub struct TableSession {
    pub table_id: String,
    pub community_id: Option<String>,
    pub table_name: Option<String>,
    pub seated_users: HashSet<String>,
    pub connected_users: HashSet<String>,
    pub user_seat: HashMap<String, usize>,
    pub hand: Hand,
    pub chat: ChatRingBuffer,
    pub disconnects: HashMap<String, DisconnectRecord>,
    pub next_hand_at_ms: Option<i64>,
    reconnect_grace_ms: u64,
    had_players: bool,
}

impl TableSession {
    pub fn new(table_id: impl Into<String>, config: TableSessionConfig) -> Self {
        let hand_config = HandConfig {
            small_blind: config.small_blind,
            big_blind: config.big_blind,
            initial_stack: config.initial_stack,
            ante: config.ante,
            action_timeout_seconds: config.action_timeout_seconds,
        };
        TableSession {
            table_id: table_id.into(),
            community_id: config.community_id,
            table_name: config.table_name,
            seated_users: HashSet::new(),
            connected_users: HashSet::new(),
            user_seat: HashMap::new(),
            hand: Hand::new(hand_config),
            chat: ChatRingBuffer::new(),
            disconnects: HashMap::new(),
            next_hand_at_ms: None,
            reconnect_grace_ms: config.reconnect_grace_ms,
            had_players: false,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(self.connected_users.is_subset(&self.seated_users));
    }

    // ---- seating -------------------------------------------------------

    pub fn seat_player(
        &mut self,
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        seat_index: usize,
        stack: u64,
    ) -> GameResult<Vec<Outgoing>> {
        let user_id = user_id.into();
        if self.seated_users.contains(&user_id) {
            return Err(GameError::invalid_action("user already seated at this table"));
        }
        if seat_index >= MAX_PLAYERS {
            return Err(GameError::capacity("seat index out of range"));
        }
        if self.hand.seat(seat_index).is_some() {
            return Err(GameError::capacity(format!("seat {seat_index} occupied")));
        }
        self.hand.seat_player(Seat::new(user_id.clone(), display_name, seat_index, stack))?;
        self.seated_users.insert(user_id.clone());
        self.user_seat.insert(user_id, seat_index);
        self.had_players = true;
        self.assert_invariants();
        Ok(self.broadcast_state())
    }

    // ---- connection lifecycle ------------------------------------------

    /// Idempotent: marking an already-connected user connected again is a
    /// no-op (§5 "Idempotence").
    pub fn mark_connected(&mut self, user_id: &str, now_ms: i64) -> GameResult<Vec<Outgoing>> {
        if !self.seated_users.contains(user_id) {
            return Err(GameError::not_found(format!("user {user_id} is not seated at this table")));
        }
        if self.connected_users.contains(user_id) {
            return Ok(Vec::new());
        }
        self.connected_users.insert(user_id.to_string());
        self.disconnects.remove(user_id);

        let mut out = vec![Outgoing::to(user_id, OutboundEvent::ChatHistory { msgs: self.chat.history().cloned().collect() })];

        if matches!(self.hand.stage, Stage::Waiting | Stage::Complete)
            && self.seated_users.intersection(&self.connected_users).count() >= 2
        {
            self.hand.start_hand(now_ms)?;
        }
        out.extend(self.broadcast_state());
        self.assert_invariants();
        Ok(out)
    }

    pub fn mark_disconnected(&mut self, user_id: &str, socket_id: impl Into<String>, now_ms: i64) -> Vec<Outgoing> {
        if !self.connected_users.remove(user_id) {
            return Vec::new();
        }
        let snapshot = self.snapshot_for(user_id);
        let record = DisconnectRecord::new(
            user_id,
            self.table_id.clone(),
            socket_id,
            now_ms + self.reconnect_grace_ms as i64,
            snapshot,
            self.chat.history().cloned().collect(),
        );
        self.disconnects.insert(user_id.to_string(), record);

        let name = self.display_name(user_id);
        let mut out = self.broadcast_to_room(OutboundEvent::PlayerDisconnected { name, grace_ms: self.reconnect_grace_ms as i64 });
        out.extend(self.broadcast_state());
        out
    }

    pub fn reconnect(&mut self, user_id: &str, _new_socket_id: impl Into<String>) -> GameResult<Vec<Outgoing>> {
        let record = self
            .disconnects
            .remove(user_id)
            .ok_or_else(|| GameError::not_found(format!("no pending disconnect for {user_id}")))?;
        if !self.seated_users.contains(user_id) {
            return Err(GameError::not_found(format!("user {user_id} no longer at this table")));
        }
        self.connected_users.insert(user_id.to_string());

        let mut out = vec![
            Outgoing::to(user_id, OutboundEvent::Reconnected { table_id: self.table_id.clone(), state: record.snapshot }),
            Outgoing::to(user_id, OutboundEvent::ChatHistory { msgs: record.chat_snapshot }),
        ];
        let name = self.display_name(user_id);
        out.extend(self.broadcast_to_room(OutboundEvent::PlayerReconnected { name }));
        out.extend(self.broadcast_state());
        out
    }

    // ---- actions ---------------------------------------------------------

    pub fn submit_action(&mut self, user_id: &str, action: Action, now_ms: i64) -> GameResult<(Vec<Outgoing>, Vec<DirectoryEffect>)> {
        let seat_index = *self.user_seat.get(user_id).ok_or_else(|| GameError::not_found(format!("user {user_id} has no seat")))?;
        self.hand.submit_action(seat_index, action, now_ms)?;
        let mut effects = Vec::new();
        if self.hand.stage == Stage::Complete {
            self.next_hand_at_ms = Some(now_ms + crate::constants::NEXT_HAND_DELAY_SECONDS as i64 * 1000);
            effects.push(self.hand_history_effect());
        }
        Ok((self.broadcast_state(), effects))
    }

    /// Best-effort hand-history record, reported to the Directory adapter
    /// on hand completion (spec §4.4 "schedules hand-history emission
    /// (best-effort)"). Failures are logged and suppressed by the caller,
    /// never surfaced to a client (§7 "External").
    fn hand_history_effect(&self) -> DirectoryEffect {
        DirectoryEffect::RecordHandHistory {
            community_id: self.community_id.clone().unwrap_or_else(|| self.table_id.clone()),
            table_id: self.table_id.clone(),
            name: self.table_name.clone().unwrap_or_else(|| self.table_id.clone()),
            hand_data: serde_json::to_value(&self.hand).unwrap_or(Value::Null),
        }
    }

    pub fn chat(&mut self, user_id: &str, text: impl Into<String>, now_ms: i64) -> Vec<Outgoing> {
        let name = self.display_name(user_id);
        let msg = self.chat.push(user_id, name, text, now_ms);
        self.broadcast_to_room(OutboundEvent::ChatMessage { msg })
    }

    // ---- leaving -----------------------------------------------------------

    pub fn leave(&mut self, user_id: &str) -> GameResult<(PayoutIntent, Vec<Outgoing>, Vec<DirectoryEffect>)> {
        let seat_index = self
            .user_seat
            .remove(user_id)
            .ok_or_else(|| GameError::not_found(format!("user {user_id} has no seat")))?;
        let stack = self.hand.seat(seat_index).map(|s| s.stack).unwrap_or(0);
        self.hand.remove_seat(seat_index);
        self.seated_users.remove(user_id);
        self.connected_users.remove(user_id);
        self.disconnects.remove(user_id);
        self.assert_invariants();
        let payout = PayoutIntent { user_id_seat: seat_index, amount: stack };

        let mut effects = Vec::new();
        if stack > 0 {
            effects.push(DirectoryEffect::CreditWallet {
                user_id: user_id.to_string(),
                community_id: self.community_id.clone().unwrap_or_else(|| self.table_id.clone()),
                amount: stack,
                memo: "leave".into(),
            });
        }
        effects.push(DirectoryEffect::UnseatPlayer { table_id: self.table_id.clone(), user_id: user_id.to_string() });

        Ok((payout, self.broadcast_state(), effects))
    }

    pub fn is_empty(&self) -> bool {
        self.seated_users.is_empty()
    }

    /// True once a table that has actually held at least one player has
    /// emptied back out, distinguishing "never seated anyone yet" (a table
    /// actor that just spawned and is waiting for its first `SeatPlayer`)
    /// from "everyone left" so the actor doesn't tear itself down before
    /// the first seat ever lands.
    pub fn should_tear_down(&self) -> bool {
        self.had_players && self.is_empty()
    }

    // ---- persistence -----------------------------------------------------

    /// Hand-rolled serialization of `self.hand` for the Cache Gateway
    /// (keyspace `hand:<tableId>`, §4.5). Seating/chat/disconnect state is
    /// reconstructed from the websocket/HTTP admission flow, not cached.
    pub fn hand_bytes(&self) -> Vec<u8> {
        self.hand.to_bytes()
    }

    /// Rehydrates `self.hand` (and the derived `seated_users`/`user_seat`
    /// maps) from a previous `hand_bytes()` on a cache hit at table
    /// creation (§5 "spawned lazily on first reference... or first
    /// cache-hit load").
    pub fn restore_hand_bytes(&mut self, bytes: &[u8]) -> GameResult<()> {
        self.hand = Hand::from_bytes(bytes)?;
        self.seated_users.clear();
        self.user_seat.clear();
        for seat in &self.hand.seats {
            self.seated_users.insert(seat.user_id.clone());
            self.user_seat.insert(seat.user_id.clone(), seat.seat_index);
        }
        self.had_players = !self.seated_users.is_empty();
        Ok(())
    }

    // ---- timers --------------------------------------------------------

    /// Driven by the table's periodic tick: resolves an elapsed action
    /// deadline and evicts any reconnect-grace record that has expired.
    pub fn tick(&mut self, now_ms: i64) -> GameResult<(Vec<Outgoing>, Vec<DirectoryEffect>)> {
        let mut out = Vec::new();
        let mut effects = Vec::new();

        if let Some(acting_user) = self.current_acting_user() {
            if self.hand.resolve_timeout(now_ms)? {
                let name = self.display_name(&acting_user);
                out.extend(self.broadcast_to_room(OutboundEvent::ActionTimeout { seat_name: name }));
                if self.hand.stage == Stage::Complete {
                    self.next_hand_at_ms = Some(now_ms + crate::constants::NEXT_HAND_DELAY_SECONDS as i64 * 1000);
                    effects.push(self.hand_history_effect());
                }
                out.extend(self.broadcast_state());
            }
        }

        let expired: Vec<String> = self
            .disconnects
            .iter()
            .filter(|(_, record)| record.has_expired(now_ms))
            .map(|(user_id, _)| user_id.clone())
            .collect();
        for user_id in expired {
            self.disconnects.remove(&user_id);
            if let Ok((_, evicted, leave_effects)) = self.leave(&user_id) {
                out.extend(evicted);
                effects.extend(leave_effects);
            }
        }

        if let Some(at) = self.next_hand_at_ms {
            if now_ms >= at && self.seated_users.intersection(&self.connected_users).count() >= 2 {
                self.next_hand_at_ms = None;
                self.hand.start_hand(now_ms)?;
                out.extend(self.broadcast_state());
            }
        }

        Ok((out, effects))
    }

    fn current_acting_user(&self) -> Option<String> {
        let seat_index = self.hand.current_seat?;
        self.hand.seat(seat_index).map(|s| s.user_id.clone())
    }

    fn display_name(&self, user_id: &str) -> String {
        self.user_seat
            .get(user_id)
            .and_then(|idx| self.hand.seat(*idx))
            .map(|s| s.display_name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }

    // ---- snapshots -------------------------------------------------------

    /// Personalized state: `viewer_user_id`'s own hole cards are visible,
    /// everyone else's are redacted to `hidden: true`.
    pub fn snapshot_for(&self, viewer_user_id: &str) -> Value {
        let seats: Vec<Value> = self
            .hand
            .seats
            .iter()
            .map(|seat| {
                let hole_cards = if seat.user_id == viewer_user_id {
                    seat.hole_cards.map(|cards| json!([cards[0].to_string(), cards[1].to_string()]))
                } else if seat.hole_cards.is_some() {
                    Some(json!("hidden"))
                } else {
                    None
                };
                json!({
                    "userId": seat.user_id,
                    "displayName": seat.display_name,
                    "seatIndex": seat.seat_index,
                    "stack": seat.stack,
                    "currentBet": seat.current_bet,
                    "folded": seat.folded,
                    "allIn": seat.all_in,
                    "activeInHand": seat.active_in_hand,
                    "holeCards": hole_cards,
                })
            })
            .collect();

        let is_viewers_turn = self.user_seat.get(viewer_user_id).copied() == self.hand.current_seat;
        let legal_actions = if is_viewers_turn { self.hand.legal_actions() } else { Vec::new() };

        json!({
            "tableId": self.table_id,
            "communityId": self.community_id,
            "tableName": self.table_name,
            "stage": format!("{:?}", self.hand.stage),
            "pot": self.hand.pot,
            "community": self.hand.community.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "currentSeat": self.hand.current_seat,
            "currentBetToMatch": self.hand.current_bet_to_match,
            "dealerIdx": self.hand.dealer_idx,
            "actionDeadlineMs": self.hand.action_deadline_ms,
            "handNumber": self.hand.hand_number,
            "seats": seats,
            "legalActions": legal_actions,
        })
    }

    fn broadcast_state(&self) -> Vec<Outgoing> {
        self.connected_users
            .iter()
            .map(|user_id| Outgoing::to(user_id, OutboundEvent::TableStateUpdate { state: self.snapshot_for(user_id) }))
            .collect()
    }

    fn broadcast_to_room(&self, event: OutboundEvent) -> Vec<Outgoing> {
        self.connected_users.iter().map(|user_id| Outgoing::to(user_id, event.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_RECONNECT_GRACE_MS;

    fn config() -> TableSessionConfig {
        TableSessionConfig {
            small_blind: 10,
            big_blind: 20,
            initial_stack: 1000,
            ante: None,
            action_timeout_seconds: None,
            community_id: None,
            table_name: Some("Table 1".into()),
            reconnect_grace_ms: DEFAULT_RECONNECT_GRACE_MS,
        }
    }

    #[test]
    fn starts_hand_once_two_users_are_connected() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        session.seat_player("u2", "Bob", 1, 1000).unwrap();
        session.mark_connected("u1", 0).unwrap();
        assert_eq!(session.hand.stage, Stage::Waiting);
        session.mark_connected("u2", 0).unwrap();
        assert_eq!(session.hand.stage, Stage::Preflop);
    }

    #[test]
    fn mark_connected_is_idempotent() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        session.mark_connected("u1", 0).unwrap();
        let out = session.mark_connected("u1", 0).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn disconnect_then_reconnect_restores_snapshot() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        session.seat_player("u2", "Bob", 1, 1000).unwrap();
        session.mark_connected("u1", 0).unwrap();
        session.mark_connected("u2", 0).unwrap();

        session.mark_disconnected("u1", "sock-1", 1_000);
        assert!(!session.connected_users.contains("u1"));
        assert!(session.disconnects.contains_key("u1"));

        let out = session.reconnect("u1", "sock-2").unwrap();
        assert!(session.connected_users.contains("u1"));
        assert!(session.disconnects.is_empty());
        assert!(out.iter().any(|o| matches!(o.event, OutboundEvent::Reconnected { .. })));
    }

    #[test]
    fn disconnect_grace_expiry_evicts_seat_on_tick() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        session.seat_player("u2", "Bob", 1, 1000).unwrap();
        session.mark_connected("u1", 0).unwrap();
        session.mark_connected("u2", 0).unwrap();
        session.mark_disconnected("u1", "sock-1", 0);

        session.tick(DEFAULT_RECONNECT_GRACE_MS as i64 + 1).unwrap();
        assert!(!session.seated_users.contains("u1"));
    }

    #[test]
    fn leave_reports_remaining_stack() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        let (payout, _, effects) = session.leave("u1").unwrap();
        assert_eq!(payout.amount, 1000);
        assert!(!session.seated_users.contains("u1"));
        assert!(effects.iter().any(|e| matches!(e, DirectoryEffect::CreditWallet { amount: 1000, .. })));
        assert!(effects.iter().any(|e| matches!(e, DirectoryEffect::UnseatPlayer { .. })));
    }
}
