//! Live controller for one open room.
//!
//! A [`RoomSession`] owns the room's agent and message lists. It loads both
//! once when opened, then (while live) re-fetches the message list on a fixed
//! interval and replaces the local copy wholesale with each applied response.
//!
//! Poll results are guarded twice before they touch state:
//!
//! * every loop carries the generation it was started under; stopping the loop
//!   bumps the session generation under the state lock, so a response that
//!   lands after the stop is dropped even if its task was not yet cancelled;
//! * every fetch carries a sequence number, and a response older than the last
//!   applied one is dropped, so a slow tick can never overwrite a newer one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, info_span, warn};

use crate::api::RoomApi;
use crate::config::SessionConfig;
use crate::error::{ChorusError, ChorusResult};
use crate::models::{Agent, Message, NewAgent, Room, RoomId};
use crate::registry::Confirm;
use crate::topic::TopicMemo;

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub poll_interval: Duration,
    pub live: bool,
    /// Consecutive poll failures after which a warning is logged.
    pub poll_failure_warn_threshold: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            live: config.live,
            poll_failure_warn_threshold: config.poll_failure_warn_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loaded,
    Polling,
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Loaded => "loaded",
            SessionStatus::Polling => "polling",
            SessionStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time copy of a session's state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub room: Room,
    pub status: SessionStatus,
    pub agents: Vec<Agent>,
    pub messages: Arc<Vec<Message>>,
    pub messages_version: u64,
    pub topic: Option<String>,
    pub last_error: Option<String>,
    pub busy: bool,
    pub live: bool,
}

struct SessionState {
    status: SessionStatus,
    agents: Vec<Agent>,
    messages: Arc<Vec<Message>>,
    messages_version: u64,
    topic: TopicMemo,
    last_error: Option<String>,
    live: bool,
    generation: u64,
    last_applied_seq: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            agents: Vec::new(),
            messages: Arc::new(Vec::new()),
            messages_version: 0,
            topic: TopicMemo::new(),
            last_error: None,
            live: false,
            generation: 0,
            last_applied_seq: 0,
        }
    }

    /// Swaps in a new message list. Returns false when nothing changed.
    fn replace_messages(&mut self, messages: Vec<Message>) -> bool {
        if *self.messages == messages {
            return false;
        }
        self.messages = Arc::new(messages);
        self.messages_version += 1;
        self.topic.get(self.messages_version, &self.messages);
        true
    }
}

struct Shared {
    room: Room,
    api: Arc<dyn RoomApi>,
    state: RwLock<SessionState>,
    busy: AtomicBool,
    next_seq: AtomicU64,
    version_tx: watch::Sender<u64>,
}

impl Shared {
    fn issue_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn issued_seq(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    /// Applies a fetched message list if it is still current.
    ///
    /// `generation` is `Some` for poll-loop results and must match the
    /// session's generation; manual refreshes pass `None`.
    async fn apply_messages(
        &self,
        generation: Option<u64>,
        seq: u64,
        messages: Vec<Message>,
    ) -> bool {
        let mut state = self.state.write().await;
        if state.status == SessionStatus::Closed {
            return false;
        }
        if let Some(generation) = generation {
            if state.generation != generation {
                debug!(room_id = self.room.id, seq = seq, "Dropping poll result from stopped loop");
                return false;
            }
        }
        if seq <= state.last_applied_seq {
            debug!(
                room_id = self.room.id,
                seq = seq,
                last_applied = state.last_applied_seq,
                "Dropping overtaken poll result"
            );
            return false;
        }

        state.last_applied_seq = seq;
        if !state.replace_messages(messages) {
            return false;
        }
        let version = state.messages_version;
        drop(state);

        self.version_tx.send_replace(version);
        true
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RoomSession {
    shared: Arc<Shared>,
    options: SessionOptions,
    poll: Mutex<Option<JoinHandle<()>>>,
}

impl RoomSession {
    /// Opens a session: loads agents and messages, then starts polling when
    /// `options.live` is set.
    ///
    /// Load failures do not fail the open; they are recorded and visible
    /// through [`RoomSession::snapshot`].
    pub async fn open(room: Room, api: Arc<dyn RoomApi>, options: SessionOptions) -> Self {
        let session = Self::new(room, api, options);
        if let Err(e) = session.load().await {
            debug!(room_id = session.room_id(), error = %e, "Initial load incomplete");
        }
        if options.live {
            session.start_polling().await;
        }
        session
    }

    /// Creates an idle session without loading anything.
    pub fn new(room: Room, api: Arc<dyn RoomApi>, options: SessionOptions) -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                room,
                api,
                state: RwLock::new(SessionState::new()),
                busy: AtomicBool::new(false),
                next_seq: AtomicU64::new(0),
                version_tx,
            }),
            options,
            poll: Mutex::new(None),
        }
    }

    pub fn room(&self) -> &Room {
        &self.shared.room
    }

    pub fn room_id(&self) -> RoomId {
        self.shared.room.id
    }

    /// Fetches agents and messages in parallel and applies whatever succeeded.
    pub async fn load(&self) -> ChorusResult<()> {
        self.ensure_open().await?;
        let room_id = self.room_id();
        let seq = self.shared.issue_seq();

        let (agents, messages) = tokio::join!(
            self.shared.api.list_agents(room_id),
            self.shared.api.list_messages(room_id)
        );

        let mut failures = Vec::new();
        let mut first_error = None;

        {
            let mut state = self.shared.state.write().await;
            match agents {
                Ok(agents) => state.agents = agents,
                Err(e) => {
                    failures.push(format!("agents: {}", e.detail()));
                    first_error.get_or_insert(e);
                }
            }
            if state.status == SessionStatus::Idle {
                state.status = SessionStatus::Loaded;
            }
            state.last_error = None;
        }

        match messages {
            Ok(messages) => {
                self.shared.apply_messages(None, seq, messages).await;
            }
            Err(e) => {
                failures.push(format!("messages: {}", e.detail()));
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => {
                debug!(room_id = room_id, "Room loaded");
                Ok(())
            }
            Some(e) => {
                let combined = failures.join("; ");
                warn!(room_id = room_id, error = %combined, "Room load failed");
                self.shared.state.write().await.last_error = Some(combined);
                Err(e)
            }
        }
    }

    /// Re-fetches the agent list. Agents are never polled.
    pub async fn reload_agents(&self) -> ChorusResult<Vec<Agent>> {
        self.ensure_open().await?;
        let result = self.shared.api.list_agents(self.room_id()).await;
        let mut state = self.shared.state.write().await;
        match result {
            Ok(agents) => {
                state.agents = agents.clone();
                Ok(agents)
            }
            Err(e) => {
                state.last_error = Some(e.detail());
                Err(e)
            }
        }
    }

    /// One-shot message fetch outside the poll loop. Errors are surfaced.
    pub async fn refresh_messages(&self) -> ChorusResult<Arc<Vec<Message>>> {
        self.ensure_open().await?;
        let seq = self.shared.issue_seq();
        match self.shared.api.list_messages(self.room_id()).await {
            Ok(messages) => {
                self.shared.apply_messages(None, seq, messages).await;
                Ok(self.shared.state.read().await.messages.clone())
            }
            Err(e) => self.record(Err(e)).await,
        }
    }

    pub async fn set_live(&self, live: bool) -> ChorusResult<()> {
        self.ensure_open().await?;
        if live {
            self.start_polling().await;
        } else {
            self.stop_polling().await;
        }
        Ok(())
    }

    pub async fn is_live(&self) -> bool {
        self.shared.state.read().await.live
    }

    /// Stops polling and rejects every further operation.
    pub async fn close(&self) {
        self.stop_polling().await;
        self.shared.state.write().await.status = SessionStatus::Closed;
        debug!(room_id = self.room_id(), "Room session closed");
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version_tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.state.read().await;
        SessionSnapshot {
            room: self.shared.room.clone(),
            status: state.status,
            agents: state.agents.clone(),
            messages: state.messages.clone(),
            messages_version: state.messages_version,
            topic: state.topic.cached().map(str::to_string),
            last_error: state.last_error.clone(),
            busy: self.is_busy(),
            live: state.live,
        }
    }

    pub async fn messages(&self) -> Arc<Vec<Message>> {
        self.shared.state.read().await.messages.clone()
    }

    pub async fn topic(&self) -> Option<String> {
        self.shared.state.read().await.topic.cached().map(str::to_string)
    }

    pub async fn clear_error(&self) {
        self.shared.state.write().await.last_error = None;
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Creates an agent and appends it to the local list.
    pub async fn add_agent(&self, name: &str, role: &str, goal: &str) -> ChorusResult<Agent> {
        self.ensure_open().await?;
        let agent = NewAgent::new(self.room_id(), name.trim(), role.trim(), goal.trim());
        if let Some(field) = agent.missing_field() {
            return Err(ChorusError::ValidationFailed(format!(
                "agent {} must not be empty",
                field
            )));
        }

        let _busy = self.acquire_busy("adding an agent")?;
        self.begin_write().await;
        let result = self.shared.api.add_agent(&agent).await;
        if let Ok(created) = &result {
            info!(room_id = self.room_id(), agent_id = created.id, name = %created.name, "Agent added");
            self.shared.state.write().await.agents.push(created.clone());
        }
        self.record(result).await
    }

    /// Posts a human message. The message shows up with the next poll.
    pub async fn send_human_message(&self, content: &str) -> ChorusResult<Message> {
        self.ensure_open().await?;
        if content.trim().is_empty() {
            return Err(ChorusError::ValidationFailed(
                "message must not be empty".to_string(),
            ));
        }

        self.begin_write().await;
        let result = self
            .shared
            .api
            .send_human_message(self.room_id(), content)
            .await;
        self.record(result).await
    }

    pub async fn simulate_turn(&self) -> ChorusResult<Message> {
        self.ensure_open().await?;
        let _busy = self.acquire_busy("simulating a turn")?;
        self.begin_write().await;
        let result = self.shared.api.simulate_turn(self.room_id()).await;
        self.record(result).await
    }

    pub async fn judge_turn(&self) -> ChorusResult<Message> {
        self.ensure_open().await?;
        let _busy = self.acquire_busy("judging")?;
        self.begin_write().await;
        let result = self.shared.api.judge_turn(self.room_id()).await;
        self.record(result).await
    }

    pub async fn set_topic(&self, topic: &str) -> ChorusResult<()> {
        self.ensure_open().await?;
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ChorusError::ValidationFailed(
                "topic must not be empty".to_string(),
            ));
        }

        self.begin_write().await;
        let result = self.shared.api.set_topic(self.room_id(), topic).await;
        self.record(result).await
    }

    /// The question asked before a reset.
    pub fn reset_prompt(&self, wipe_all: bool) -> String {
        if wipe_all {
            format!(
                "Reset room '{}' and wipe all of its memory?",
                self.shared.room.name
            )
        } else {
            format!("Reset the conversation in room '{}'?", self.shared.room.name)
        }
    }

    /// Resets the room after confirmation.
    ///
    /// The local message list is cleared before the request is sent, and any
    /// fetch issued before that point can no longer be applied. Returns
    /// `Ok(false)` when the user declined.
    pub async fn reset(&self, wipe_all: bool, confirm: &dyn Confirm) -> ChorusResult<bool> {
        self.ensure_open().await?;
        let _busy = self.acquire_busy("resetting the room")?;
        if !confirm.confirm(&self.reset_prompt(wipe_all)) {
            return Ok(false);
        }

        let version = {
            let mut state = self.shared.state.write().await;
            state.last_error = None;
            state.last_applied_seq = state.last_applied_seq.max(self.shared.issued_seq());
            state.messages = Arc::new(Vec::new());
            state.messages_version += 1;
            let version = state.messages_version;
            state.topic.get(version, &[]);
            version
        };
        self.shared.version_tx.send_replace(version);

        let result = self
            .shared
            .api
            .reset_room(self.room_id(), wipe_all)
            .await;
        if result.is_ok() {
            info!(room_id = self.room_id(), wipe_all = wipe_all, "Room reset");
        }
        self.record(result).await.map(|_| true)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn ensure_open(&self) -> ChorusResult<()> {
        if self.shared.state.read().await.status == SessionStatus::Closed {
            return Err(ChorusError::SessionClosed);
        }
        Ok(())
    }

    fn acquire_busy(&self, action: &str) -> ChorusResult<BusyGuard<'_>> {
        self.shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChorusError::Busy(action.to_string()))?;
        Ok(BusyGuard(&self.shared.busy))
    }

    async fn begin_write(&self) {
        self.shared.state.write().await.last_error = None;
    }

    async fn record<T>(&self, result: ChorusResult<T>) -> ChorusResult<T> {
        if let Err(e) = &result {
            debug!(room_id = self.room_id(), error = %e, "Write failed");
            self.shared.state.write().await.last_error = Some(e.detail());
        }
        result
    }

    async fn start_polling(&self) {
        let mut poll = self.poll.lock().await;

        let generation = {
            let mut state = self.shared.state.write().await;
            state.live = true;
            if poll.is_some() {
                return;
            }
            if state.status != SessionStatus::Closed {
                state.status = SessionStatus::Polling;
            }
            state.generation += 1;
            state.generation
        };

        info!(
            room_id = self.room_id(),
            interval_ms = self.options.poll_interval.as_millis() as u64,
            "Starting live updates"
        );
        *poll = Some(tokio::spawn(poll_loop(
            Arc::clone(&self.shared),
            generation,
            self.options.poll_interval,
            self.options.poll_failure_warn_threshold,
        )));
    }

    async fn stop_polling(&self) {
        let mut poll = self.poll.lock().await;

        {
            let mut state = self.shared.state.write().await;
            state.live = false;
            state.generation += 1;
            if state.status == SessionStatus::Polling {
                state.status = SessionStatus::Loaded;
            }
        }

        if let Some(handle) = poll.take() {
            handle.abort();
            info!(room_id = self.room_id(), "Stopped live updates");
        }
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        if let Some(handle) = self.poll.get_mut().take() {
            handle.abort();
        }
    }
}

type PollResult = (u64, ChorusResult<Vec<Message>>);

async fn poll_loop(
    shared: Arc<Shared>,
    generation: u64,
    period: Duration,
    warn_threshold: u32,
) {
    let room_id = shared.room.id;
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Fetches run beside the ticker so a slow response never delays the next
    // tick. Dropping the set on abort cancels whatever is still in flight.
    let mut in_flight: JoinSet<PollResult> = JoinSet::new();
    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let seq = shared.issue_seq();
                let api = Arc::clone(&shared.api);
                in_flight.spawn(async move { (seq, api.list_messages(room_id).await) });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok((seq, Ok(messages))) => {
                        if consecutive_failures >= warn_threshold {
                            info!(room_id = room_id, failures = consecutive_failures, "Live updates recovered");
                        }
                        consecutive_failures = 0;
                        if shared.apply_messages(Some(generation), seq, messages).await {
                            debug!(room_id = room_id, seq = seq, "Applied poll result");
                        }
                    }
                    Ok((seq, Err(e))) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        if consecutive_failures == warn_threshold {
                            info_span!(
                                "live_updates",
                                room_id = room_id,
                                failures = consecutive_failures
                            )
                            .in_scope(|| e.log());
                        } else {
                            debug!(room_id = room_id, seq = seq, error = %e, "Poll failed");
                        }
                    }
                    Err(e) if e.is_panic() => {
                        warn!(room_id = room_id, "Poll fetch panicked");
                    }
                    Err(_) => {}
                }
            }
        }
    }
}
