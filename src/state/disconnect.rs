//! DisconnectRecord — spec §3, §4.4 `markDisconnected`/`reconnect`. Grounded
//! on `other_examples/.../vincev-freezeout__crates-server-src-table-state.rs.rs`'s
//! reconnect-grace timer fields; the teacher has no disconnect/reconnect
//! concept since Solana clients don't hold a stateful socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chat::ChatMessage;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DisconnectRecord {
    pub user_id: String,
    pub table_id: String,
    pub socket_id_at_disconnect: String,
    /// Absolute unix-millis when the reconnect grace period expires.
    pub deadline_ms: i64,
    /// Last personalized snapshot sent to this user, replayed verbatim on
    /// reconnect rather than recomputed, in case table state moved on.
    pub snapshot: Value,
    pub chat_snapshot: Vec<ChatMessage>,
}

impl DisconnectRecord {
    pub fn new(
        user_id: impl Into<String>,
        table_id: impl Into<String>,
        socket_id_at_disconnect: impl Into<String>,
        deadline_ms: i64,
        snapshot: Value,
        chat_snapshot: Vec<ChatMessage>,
    ) -> Self {
        DisconnectRecord {
            user_id: user_id.into(),
            table_id: table_id.into(),
            socket_id_at_disconnect: socket_id_at_disconnect.into(),
            deadline_ms,
            snapshot,
            chat_snapshot,
        }
    }

    pub fn has_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.deadline_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expiry_is_deadline_inclusive() {
        let record = DisconnectRecord::new("u1", "t1", "sock-1", 1_000, json!({}), Vec::new());
        assert!(!record.has_expired(999));
        assert!(record.has_expired(1_000));
        assert!(record.has_expired(1_001));
    }
}
