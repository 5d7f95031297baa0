mod agent;
mod message;
mod room;

pub use agent::{Agent, AgentId, NewAgent};
pub use message::{HumanMessage, Message, MessageId, TopicUpdate};
pub use room::{BuiltScenario, HealthStatus, NewRoom, Room, RoomId, Scenario};
