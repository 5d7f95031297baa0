#![allow(clippy::needless_borrows_for_generic_args, clippy::manual_range_contains)]

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod registry;
pub mod session;
pub mod templates;
pub mod topic;
pub mod transport;

pub use api::{HttpRoomApi, RoomApi};
pub use config::{
    ApiConfig, ChorusConfig, ExportConfig, LoggingConfig, SessionConfig, DEFAULT_BASE_URL,
};
pub use error::{ChorusError, ChorusResult, CliErrorDisplay};
pub use export::{transcript_file_name, TranscriptExporter};
pub use models::{
    Agent, AgentId, BuiltScenario, HealthStatus, HumanMessage, Message, MessageId, NewAgent,
    NewRoom, Room, RoomId, Scenario, TopicUpdate,
};
pub use registry::{AlwaysConfirm, Confirm, NeverConfirm, RoomRegistry};
pub use session::{RoomSession, SessionOptions, SessionSnapshot, SessionStatus};
pub use templates::{AgentSeed, ScenarioTemplate};
pub use topic::{current_topic, TopicMemo, TOPIC_PREFIX};
pub use transport::Transport;
