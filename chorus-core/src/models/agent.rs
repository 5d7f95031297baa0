use serde::{Deserialize, Serialize};

use super::room::RoomId;

pub type AgentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub room_id: RoomId,
    pub name: String,
    pub role: String,
    pub goal: String,
}

/// Request body for `POST /agents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub room_id: RoomId,
}

impl NewAgent {
    pub fn new(
        room_id: RoomId,
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            room_id,
        }
    }

    /// Name of the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.role.trim().is_empty() {
            Some("role")
        } else if self.goal.trim().is_empty() {
            Some("goal")
        } else {
            None
        }
    }
}
