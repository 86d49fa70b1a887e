//! Agent action resolution — spec §6.2 `/agent-action`, §9 Open Question.
//!
//! Not an outbound client (there is no separate "Agent Service" call in
//! scope here): this module is the seat-resolution helper the inbound
//! `/agent-action` HTTP endpoint uses, grounded on the spec's own resolved
//! Open Question ("agent endpoints require the admin to pass a unique
//! (userId, tableId) pair that maps to exactly one seat; refuse with 400
//! otherwise") rather than the teacher's first-seat-fallback shortcut.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};
use crate::state::table_session::TableSession;

#[derive(Debug, Deserialize)]
pub struct AgentActionRequest {
    pub user_id: String,
    pub game_id: String,
    pub action: String,
    pub amount: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AgentActionResponse {
    pub state_for_player: serde_json::Value,
}

/// Resolves `user_id` to exactly one seat at `session`, refusing rather
/// than falling back to "the first seat" when the user isn't seated there.
pub fn resolve_agent_seat(session: &TableSession, user_id: &str) -> GameResult<usize> {
    session
        .user_seat
        .get(user_id)
        .copied()
        .ok_or_else(|| GameError::not_found(format!("user {user_id} has no seat at this table")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::table_session::TableSessionConfig;

    fn config() -> TableSessionConfig {
        TableSessionConfig {
            small_blind: 10,
            big_blind: 20,
            initial_stack: 1000,
            ante: None,
            action_timeout_seconds: None,
            community_id: None,
            table_name: None,
            reconnect_grace_ms: crate::constants::DEFAULT_RECONNECT_GRACE_MS,
        }
    }

    #[test]
    fn refuses_unknown_user_instead_of_defaulting_to_first_seat() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        let err = resolve_agent_seat(&session, "u2").unwrap_err();
        assert_eq!(err.reason(), "NotFound");
    }

    #[test]
    fn resolves_the_seated_user() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        assert_eq!(resolve_agent_seat(&session, "u1").unwrap(), 0);
    }
}
