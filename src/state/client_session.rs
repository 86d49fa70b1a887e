//! ClientSession — spec §3. Tracks the live websocket for a user. No teacher
//! counterpart; the registry (§9) keeps one of these per connected socket and
//! enforces "at most one live socket per userId" by replacing, not layering,
//! entries keyed by userId.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientSession {
    pub socket_id: String,
    pub user_id: String,
    pub display_name: String,
    pub current_table_id: Option<String>,
}

impl ClientSession {
    pub fn new(socket_id: impl Into<String>, user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        ClientSession {
            socket_id: socket_id.into(),
            user_id: user_id.into(),
            display_name: display_name.into(),
            current_table_id: None,
        }
    }

    pub fn join_table(&mut self, table_id: impl Into<String>) {
        self.current_table_id = Some(table_id.into());
    }

    pub fn leave_table(&mut self) {
        self.current_table_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_leave_table_round_trip() {
        let mut session = ClientSession::new("sock-1", "u1", "Alice");
        assert!(session.current_table_id.is_none());
        session.join_table("table-1");
        assert_eq!(session.current_table_id.as_deref(), Some("table-1"));
        session.leave_table();
        assert!(session.current_table_id.is_none());
    }
}
