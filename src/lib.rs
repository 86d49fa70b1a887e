pub mod adapters;
pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod net;
pub mod registry;
pub mod state;

pub use config::Config;
pub use error::{GameError, GameResult};
pub use registry::Registry;

/// The only function in the crate allowed to read a live system clock.
/// Every state-machine method below this boundary takes `now_ms: i64`
/// explicitly instead, so hand/table logic stays a pure function of its
/// inputs and is testable without wall-clock dependence.
pub fn current_time_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

#[cfg(test)]
mod integration_tests {
    use crate::events::{InboundEvent, OutboundEvent};
    use crate::state::hand::Action;
    use crate::state::table_session::{TableSession, TableSessionConfig};

    fn config() -> TableSessionConfig {
        TableSessionConfig {
            small_blind: 10,
            big_blind: 20,
            initial_stack: 1000,
            ante: None,
            action_timeout_seconds: None,
            community_id: Some("community-1".into()),
            table_name: Some("Final Table".into()),
            reconnect_grace_ms: crate::constants::DEFAULT_RECONNECT_GRACE_MS,
        }
    }

    #[test]
    fn a_full_hand_plays_out_from_seating_to_next_hand_countdown() {
        let mut session = TableSession::new("t1", config());
        session.seat_player("u1", "Alice", 0, 1000).unwrap();
        session.seat_player("u2", "Bob", 1, 1000).unwrap();
        session.mark_connected("u1", 0).unwrap();
        session.mark_connected("u2", 0).unwrap();

        assert_eq!(session.hand.stage, crate::state::hand::Stage::Preflop);

        // Heads-up preflop: small blind (the dealer) acts first.
        let sb_user = session.hand.seat(session.hand.current_seat.unwrap()).unwrap().user_id.clone();
        session.submit_action(&sb_user, Action::Call, 0).unwrap();
        let bb_user = session.hand.seat(session.hand.current_seat.unwrap()).unwrap().user_id.clone();
        session.submit_action(&bb_user, Action::Check, 0).unwrap();

        assert_eq!(session.hand.stage, crate::state::hand::Stage::Flop);
    }

    #[test]
    fn wire_events_round_trip_through_serde() {
        let inbound = InboundEvent::Action { kind: "bet".into(), amount: Some(40) };
        let json = serde_json::to_string(&inbound).unwrap();
        let decoded: InboundEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(decoded, InboundEvent::Action { ref kind, amount: Some(40) } if kind == "bet"));

        let outbound = OutboundEvent::ActionError { reason: "Cannot check".into() };
        let json = serde_json::to_string(&outbound).unwrap();
        assert!(json.contains("\"type\":\"action_error\""));
    }
}
