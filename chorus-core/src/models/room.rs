use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::agent::Agent;

pub type RoomId = i64;

/// Conversation style a room was created with.
///
/// The server treats the scenario as a free-form string; the known values get
/// their own variants and anything else is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Scenario {
    #[default]
    Freeplay,
    Debate,
    Planning,
    Other(String),
}

impl Scenario {
    pub fn as_str(&self) -> &str {
        match self {
            Scenario::Freeplay => "freeplay",
            Scenario::Debate => "debate",
            Scenario::Planning => "planning",
            Scenario::Other(s) => s,
        }
    }

    pub fn known() -> &'static [Scenario] {
        &[Scenario::Freeplay, Scenario::Debate, Scenario::Planning]
    }
}

impl From<String> for Scenario {
    fn from(value: String) -> Self {
        match value.as_str() {
            "freeplay" => Scenario::Freeplay,
            "debate" => Scenario::Debate,
            "planning" => Scenario::Planning,
            _ => Scenario::Other(value),
        }
    }
}

impl From<&str> for Scenario {
    fn from(value: &str) -> Self {
        Scenario::from(value.to_string())
    }
}

impl From<Scenario> for String {
    fn from(value: Scenario) -> Self {
        match value {
            Scenario::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl Room {
    pub fn new(id: RoomId, name: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            id,
            name: name.into(),
            scenario,
            created_at: None,
        }
    }
}

/// Request body for `POST /rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub scenario: Scenario,
}

/// Response of `POST /rooms/build/{key}`: the new room plus whatever the
/// server seeded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltScenario {
    pub room: Room,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
