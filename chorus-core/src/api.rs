use async_trait::async_trait;
use reqwest::Method;

use crate::config::ApiConfig;
use crate::error::ChorusResult;
use crate::models::{
    Agent, BuiltScenario, HealthStatus, HumanMessage, Message, NewAgent, NewRoom, Room, RoomId,
    TopicUpdate,
};
use crate::transport::Transport;

/// The remote room service as seen by the client.
///
/// One method per endpoint. Implementations perform exactly one round trip per
/// call and never retry.
#[async_trait]
pub trait RoomApi: Send + Sync {
    async fn health(&self) -> ChorusResult<HealthStatus>;

    async fn list_rooms(&self) -> ChorusResult<Vec<Room>>;

    async fn create_room(&self, room: &NewRoom) -> ChorusResult<Room>;

    async fn build_scenario(&self, key: &str) -> ChorusResult<BuiltScenario>;

    async fn delete_room(&self, room_id: RoomId) -> ChorusResult<()>;

    async fn list_agents(&self, room_id: RoomId) -> ChorusResult<Vec<Agent>>;

    async fn add_agent(&self, agent: &NewAgent) -> ChorusResult<Agent>;

    async fn list_messages(&self, room_id: RoomId) -> ChorusResult<Vec<Message>>;

    async fn send_human_message(&self, room_id: RoomId, content: &str) -> ChorusResult<Message>;

    async fn simulate_turn(&self, room_id: RoomId) -> ChorusResult<Message>;

    async fn judge_turn(&self, room_id: RoomId) -> ChorusResult<Message>;

    async fn set_topic(&self, room_id: RoomId, topic: &str) -> ChorusResult<()>;

    async fn reset_room(&self, room_id: RoomId, wipe_all: bool) -> ChorusResult<()>;

    async fn export_transcript(&self, room_id: RoomId) -> ChorusResult<String>;
}

#[derive(Debug, Clone)]
pub struct HttpRoomApi {
    transport: Transport,
}

impl HttpRoomApi {
    pub fn new(config: &ApiConfig) -> ChorusResult<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }
}

pub(crate) fn reset_path(room_id: RoomId, wipe_all: bool) -> String {
    if wipe_all {
        format!("/rooms/{}/reset?wipe=all", room_id)
    } else {
        format!("/rooms/{}/reset", room_id)
    }
}

#[async_trait]
impl RoomApi for HttpRoomApi {
    async fn health(&self) -> ChorusResult<HealthStatus> {
        self.transport.get("/health").await
    }

    async fn list_rooms(&self) -> ChorusResult<Vec<Room>> {
        self.transport.get("/rooms").await
    }

    async fn create_room(&self, room: &NewRoom) -> ChorusResult<Room> {
        self.transport.post("/rooms", room).await
    }

    async fn build_scenario(&self, key: &str) -> ChorusResult<BuiltScenario> {
        self.transport
            .post_empty(&format!("/rooms/build/{}", key))
            .await
    }

    async fn delete_room(&self, room_id: RoomId) -> ChorusResult<()> {
        self.transport
            .request_unit::<()>(Method::DELETE, &format!("/rooms/{}", room_id), None)
            .await
    }

    async fn list_agents(&self, room_id: RoomId) -> ChorusResult<Vec<Agent>> {
        self.transport.get(&format!("/agents/{}", room_id)).await
    }

    async fn add_agent(&self, agent: &NewAgent) -> ChorusResult<Agent> {
        self.transport.post("/agents", agent).await
    }

    async fn list_messages(&self, room_id: RoomId) -> ChorusResult<Vec<Message>> {
        self.transport.get(&format!("/messages/{}", room_id)).await
    }

    async fn send_human_message(&self, room_id: RoomId, content: &str) -> ChorusResult<Message> {
        let body = HumanMessage {
            content: content.to_string(),
        };
        self.transport
            .post(&format!("/messages/human/{}", room_id), &body)
            .await
    }

    async fn simulate_turn(&self, room_id: RoomId) -> ChorusResult<Message> {
        self.transport
            .post_empty(&format!("/simulate/turn/{}", room_id))
            .await
    }

    async fn judge_turn(&self, room_id: RoomId) -> ChorusResult<Message> {
        self.transport
            .post_empty(&format!("/simulate/judge/{}", room_id))
            .await
    }

    async fn set_topic(&self, room_id: RoomId, topic: &str) -> ChorusResult<()> {
        let body = TopicUpdate {
            topic: topic.to_string(),
        };
        self.transport
            .request_unit(Method::POST, &format!("/rooms/{}/topic", room_id), Some(&body))
            .await
    }

    async fn reset_room(&self, room_id: RoomId, wipe_all: bool) -> ChorusResult<()> {
        self.transport
            .request_unit::<()>(Method::POST, &reset_path(room_id, wipe_all), None)
            .await
    }

    async fn export_transcript(&self, room_id: RoomId) -> ChorusResult<String> {
        self.transport
            .get_text(&format!("/rooms/{}/export.md", room_id))
            .await
    }
}
