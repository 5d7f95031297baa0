//! Local view of the rooms known to the server.

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::RoomApi;
use crate::error::{ChorusError, ChorusResult};
use crate::models::{BuiltScenario, NewRoom, Room, RoomId, Scenario};

/// Interactive confirmation for destructive actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirms every prompt, for `--yes` style non-interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Owns the room list. Newest rooms are kept first.
///
/// Every mutator takes `&mut self`, so at most one registry operation can be
/// outstanding at a time.
pub struct RoomRegistry {
    api: Arc<dyn RoomApi>,
    rooms: Vec<Room>,
}

impl RoomRegistry {
    pub fn new(api: Arc<dyn RoomApi>) -> Self {
        Self {
            api,
            rooms: Vec::new(),
        }
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn get(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn api(&self) -> Arc<dyn RoomApi> {
        Arc::clone(&self.api)
    }

    /// Replaces the local room list with the server's.
    pub async fn list(&mut self) -> ChorusResult<&[Room]> {
        let rooms = self.api.list_rooms().await?;
        debug!(count = rooms.len(), "Room list refreshed");
        self.rooms = rooms;
        Ok(&self.rooms)
    }

    /// Creates a room. The name is checked trimmed but sent as typed.
    pub async fn create(&mut self, name: &str, scenario: Scenario) -> ChorusResult<Room> {
        if name.trim().is_empty() {
            return Err(ChorusError::ValidationFailed(
                "room name must not be empty".to_string(),
            ));
        }

        let room = self
            .api
            .create_room(&NewRoom {
                name: name.to_string(),
                scenario,
            })
            .await?;

        info!(room_id = room.id, name = %room.name, "Created room");
        self.rooms.insert(0, room.clone());
        Ok(room)
    }

    /// Asks the server to build a preset multi-agent room.
    ///
    /// Unknown keys are forwarded; the server decides whether they exist.
    pub async fn build_from_template(&mut self, key: &str) -> ChorusResult<BuiltScenario> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ChorusError::ValidationFailed(
                "scenario key must not be empty".to_string(),
            ));
        }

        let built = self.api.build_scenario(key).await?;
        info!(
            room_id = built.room.id,
            key = key,
            agents = built.agents.len(),
            "Built room from scenario"
        );
        self.rooms.insert(0, built.room.clone());
        Ok(built)
    }

    /// The question asked before deleting `room_id`.
    pub fn delete_prompt(&self, room_id: RoomId) -> String {
        let label = self
            .get(room_id)
            .map(|r| format!("'{}' (#{})", r.name, r.id))
            .unwrap_or_else(|| format!("#{}", room_id));
        format!(
            "Delete room {}? Its agents and messages are removed as well.",
            label
        )
    }

    /// Deletes a room after confirmation.
    ///
    /// Returns `Ok(false)` when the user declined; no request is sent then.
    pub async fn delete(&mut self, room_id: RoomId, confirm: &dyn Confirm) -> ChorusResult<bool> {
        if !confirm.confirm(&self.delete_prompt(room_id)) {
            debug!(room_id = room_id, "Room deletion declined");
            return Ok(false);
        }

        self.api.delete_room(room_id).await?;
        self.rooms.retain(|r| r.id != room_id);
        info!(room_id = room_id, "Deleted room");
        Ok(true)
    }
}
