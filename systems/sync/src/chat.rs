//! Direct conversations between two friends.

use std::time::Duration;

use tracing::debug;

use crate::message::{ChatLine, Outbound, Payload};
use crate::topics::Topics;

/// Conversation history with one friend, ordered by timestamp.
#[derive(Debug)]
pub struct Conversation {
    me: String,
    topic: String,
    lines: Vec<ChatLine>,
}

impl Conversation {
    /// Opens the conversation between `me` and `friend`.
    #[must_use]
    pub fn open(me: impl Into<String>, friend: &str, topics: &Topics) -> Self {
        let me = me.into();
        let topic = topics.chat(&me, friend);
        Self {
            me,
            topic,
            lines: Vec::new(),
        }
    }

    /// Topic shared by both participants.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Lines in timestamp order.
    #[must_use]
    pub fn lines(&self) -> &[ChatLine] {
        &self.lines
    }

    /// Records and publishes `text`; blank input sends nothing.
    pub fn send(&mut self, text: &str, timestamp: u64) -> Option<Outbound> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let line = ChatLine {
            sender: self.me.clone(),
            text: text.to_owned(),
            timestamp,
        };
        let _ = self.insert(line.clone());
        Some(Outbound {
            topic: self.topic.clone(),
            payload: Payload::Chat(line),
            delay: Duration::ZERO,
        })
    }

    /// Decodes and records a line from the topic, returning whether it was new.
    pub fn receive(&mut self, payload: &str) -> bool {
        match serde_json::from_str::<ChatLine>(payload) {
            Ok(line) => self.insert(line),
            Err(error) => {
                debug!(%error, "discarding malformed chat line");
                false
            }
        }
    }

    fn insert(&mut self, line: ChatLine) -> bool {
        let duplicate = self
            .lines
            .iter()
            .any(|known| known.sender == line.sender && known.timestamp == line.timestamp);
        if duplicate {
            return false;
        }
        let index = self
            .lines
            .partition_point(|known| known.timestamp <= line.timestamp);
        self.lines.insert(index, line);
        true
    }
}
