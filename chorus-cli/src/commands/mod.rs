pub mod agents;
pub mod conversation;
pub mod prompt;
pub mod rooms;
pub mod watch;

pub use agents::{handle_agents_command, AgentsCommand};
pub use conversation::{handle_conversation_command, ConversationCommand};
pub use rooms::{handle_rooms_command, RoomsCommand};
pub use watch::handle_watch_command;

use std::collections::HashMap;
use std::sync::Arc;

use chorus_core::{
    Agent, AgentId, ChorusConfig, ChorusError, HttpRoomApi, Message, Room, RoomApi, RoomId,
    RoomRegistry, RoomSession, SessionOptions,
};
use colored::Colorize;

pub(crate) fn connect(config: &ChorusConfig) -> anyhow::Result<Arc<dyn RoomApi>> {
    Ok(Arc::new(HttpRoomApi::new(&config.api)?))
}

pub(crate) async fn find_room(api: Arc<dyn RoomApi>, room_id: RoomId) -> anyhow::Result<Room> {
    let mut registry = RoomRegistry::new(api);
    registry.list().await?;
    registry
        .get(room_id)
        .cloned()
        .ok_or_else(|| ChorusError::RoomNotFound(room_id).into())
}

/// Opens a session for one-shot commands. Load failures abort the command.
pub(crate) async fn open_session(
    config: &ChorusConfig,
    room_id: RoomId,
    live: bool,
) -> anyhow::Result<RoomSession> {
    let api = connect(config)?;
    let room = find_room(api.clone(), room_id).await?;
    let options = SessionOptions {
        live,
        ..SessionOptions::from(&config.session)
    };
    let session = RoomSession::open(room, api, options).await;
    if let Some(error) = session.snapshot().await.last_error {
        session.close().await;
        anyhow::bail!("Failed to load room {}: {}", room_id, error);
    }
    Ok(session)
}

pub(crate) fn agent_names(agents: &[Agent]) -> HashMap<AgentId, String> {
    agents.iter().map(|a| (a.id, a.name.clone())).collect()
}

pub(crate) fn format_message(message: &Message, names: &HashMap<AgentId, String>) -> String {
    let time = message.created_at.format("%H:%M:%S").to_string().dimmed();

    if message.is_topic_announcement() {
        return format!("{} {}", time, message.content.magenta().bold());
    }

    let speaker = match message.agent_id {
        Some(id) => names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("agent #{}", id))
            .cyan()
            .bold(),
        None => "you".green().bold(),
    };
    format!("{} {}: {}", time, speaker, message.content)
}
