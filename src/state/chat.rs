//! Per-table chat history — spec §3. No teacher counterpart (the on-chain
//! program has no chat); modeled as a bounded ring buffer the way
//! `table_session.rs` models other per-table ambient state.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::constants::CHAT_HISTORY_CAPACITY;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender_user_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp_ms: i64,
}

/// FIFO capped at `CHAT_HISTORY_CAPACITY`; pushing past capacity evicts the
/// oldest message.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRingBuffer {
    messages: VecDeque<ChatMessage>,
    next_id: u64,
}

impl ChatRingBuffer {
    pub fn new() -> Self {
        ChatRingBuffer { messages: VecDeque::new(), next_id: 0 }
    }

    pub fn push(&mut self, sender_user_id: impl Into<String>, sender_name: impl Into<String>, text: impl Into<String>, timestamp_ms: i64) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_id,
            sender_user_id: sender_user_id.into(),
            sender_name: sender_name.into(),
            text: text.into(),
            timestamp_ms,
        };
        self.next_id += 1;
        if self.messages.len() >= CHAT_HISTORY_CAPACITY {
            self.messages.pop_front();
        }
        self.messages.push_back(message.clone());
        message
    }

    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut buf = ChatRingBuffer::new();
        for i in 0..(CHAT_HISTORY_CAPACITY + 10) {
            buf.push("u1", "Alice", format!("msg {i}"), i as i64);
        }
        assert_eq!(buf.len(), CHAT_HISTORY_CAPACITY);
        let oldest = buf.history().next().unwrap();
        assert_eq!(oldest.text, "msg 10");
    }

    #[test]
    fn ids_increase_monotonically() {
        let mut buf = ChatRingBuffer::new();
        let a = buf.push("u1", "Alice", "hi", 0);
        let b = buf.push("u2", "Bob", "yo", 1);
        assert!(b.id > a.id);
    }
}
