use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::room::RoomId;
use crate::topic::TOPIC_PREFIX;

pub type MessageId = i64;

/// One entry of a room's append-only conversation log.
///
/// `agent_id` is `None` for messages not spoken by an agent: human input,
/// topic announcements and other system notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl Message {
    pub fn is_topic_announcement(&self) -> bool {
        self.content.starts_with(TOPIC_PREFIX)
    }
}

/// Request body for `POST /messages/human/{room_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanMessage {
    pub content: String,
}

/// Request body for `POST /rooms/{room_id}/topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicUpdate {
    pub topic: String,
}
