//! Wire events between the client gateway and connected sockets — spec §4.6.
//!
//! Grounded on the teacher's `events.rs` (`HandCompleted`, `PlayerHandResult`)
//! in spirit only: the teacher emits Anchor `#[event]` structs to the Solana
//! transaction log for on-chain indexing, which has no off-chain analogue.
//! Here events are serde-tagged JSON frames sent directly over the
//! websocket, the way `other_examples/.../ShiLu1211-texas-engine__poker-ws-src-main.rs.rs`
//! and `mentalcardgames-mcg`'s `net.rs` shape their client protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::chat::ChatMessage;

/// Events a client socket sends in.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    JoinTable { community_id: Option<String> },
    Action { kind: String, amount: Option<u64> },
    Chat { text: String, table_id: Option<String> },
    LeaveTable,
    Disconnect,
}

/// Events the server pushes out to a client socket.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Connected { socket_id: String, message: String },
    /// `state` is the personalized snapshot for this recipient: their own
    /// hole cards are visible, everyone else's are redacted.
    TableStateUpdate { state: Value },
    ActionError { reason: String },
    ChatMessage { msg: ChatMessage },
    ChatHistory { msgs: Vec<ChatMessage> },
    PlayerDisconnected { name: String, grace_ms: i64 },
    PlayerReconnected { name: String },
    Reconnected { table_id: String, state: Value },
    ActionTimeout { seat_name: String },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_action_round_trips_through_json() {
        let event = InboundEvent::Action { kind: "raise".into(), amount: Some(50) };
        let json = serde_json::to_string(&event).unwrap();
        let back: InboundEvent = serde_json::from_str(&json).unwrap();
        match back {
            InboundEvent::Action { kind, amount: Some(50) } if kind == "raise" => {}
            other => panic!("unexpected round trip: {other:?}"),
        }
    }

    #[test]
    fn outbound_events_are_tagged_by_type() {
        let event = OutboundEvent::Error { message: "boom".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
    }
}
