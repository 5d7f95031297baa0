//! Derivation of a room's current topic from its message history.
//!
//! The topic is never stored. It is announced in-band: a message whose content
//! starts with [`TOPIC_PREFIX`] sets the topic to the rest of the line, and the
//! latest such message wins.

use crate::models::Message;

pub const TOPIC_PREFIX: &str = "TOPIC:";

/// Returns the payload of the most recent topic announcement, trimmed.
pub fn current_topic(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find_map(|m| m.content.strip_prefix(TOPIC_PREFIX))
        .map(|payload| payload.trim().to_string())
}

/// Caches [`current_topic`] for one version of a message list.
///
/// The message list is replaced wholesale on every applied poll, so a version
/// counter is enough to know whether the cached value is still valid.
#[derive(Debug, Clone, Default)]
pub struct TopicMemo {
    version: Option<u64>,
    topic: Option<String>,
}

impl TopicMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, version: u64, messages: &[Message]) -> Option<&str> {
        if self.version != Some(version) {
            self.topic = current_topic(messages);
            self.version = Some(version);
        }
        self.topic.as_deref()
    }

    pub fn cached(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}
