use std::collections::HashMap;
use std::time::Duration;

use colored::Colorize;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use chorus_core::{AgentId, ChorusConfig, CliErrorDisplay, Message, MessageId, RoomId, RoomSession};

use super::{agent_names, format_message, open_session};

pub async fn handle_watch_command(
    config: &ChorusConfig,
    room_id: RoomId,
    simulate_every: Option<u64>,
) -> anyhow::Result<()> {
    let session = open_session(config, room_id, true).await?;
    let snapshot = session.snapshot().await;

    println!(
        "{} {} {}",
        "Watching".cyan().bold(),
        snapshot.room.name.cyan().bold(),
        "(Ctrl-C to stop)".dimmed()
    );
    if !snapshot.agents.is_empty() {
        let roster = snapshot
            .agents
            .iter()
            .map(|a| format!("{} ({})", a.name, a.role))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} {}", "Agents:".bold(), roster);
    }
    if let Some(seconds) = simulate_every.filter(|s| *s > 0) {
        println!("  {} Simulating a turn every {}s", "→".blue(), seconds);
    }
    println!();

    let mut view = TranscriptView::new(agent_names(&snapshot.agents));
    view.show(&session, &snapshot.messages, snapshot.topic.as_deref())
        .await;

    let mut versions = session.subscribe();
    let mut simulate = simulate_every.filter(|s| *s > 0).map(|s| {
        let period = Duration::from_secs(s);
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = versions.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = session.snapshot().await;
                view.show(&session, &snapshot.messages, snapshot.topic.as_deref()).await;
            }
            _ = next_tick(&mut simulate), if simulate.is_some() => {
                if let Err(e) = session.simulate_turn().await {
                    println!("  {} {}", "!".yellow(), CliErrorDisplay::new(&e).without_suggestion());
                }
            }
        }
    }

    session.close().await;
    println!();
    println!("{}", "Stopped watching.".dimmed());
    Ok(())
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// What changed between two applied versions of the message list.
struct ViewUpdate<'a> {
    reset: bool,
    fresh: Vec<&'a Message>,
    new_topic: Option<String>,
    unknown_speaker: bool,
}

/// Tracks what the terminal has already shown so each message prints once.
struct TranscriptView {
    names: HashMap<AgentId, String>,
    last_id: Option<MessageId>,
    seen: usize,
    topic: Option<String>,
}

impl TranscriptView {
    fn new(names: HashMap<AgentId, String>) -> Self {
        Self {
            names,
            last_id: None,
            seen: 0,
            topic: None,
        }
    }

    fn advance<'a>(&mut self, messages: &'a [Message], topic: Option<&str>) -> ViewUpdate<'a> {
        // A reset truncates the list; the ids that follow may restart below
        // what was last printed.
        let reset = messages.len() < self.seen
            || self
                .last_id
                .is_some_and(|last| messages.last().map_or(true, |m| m.id < last));
        if reset {
            self.last_id = None;
        }
        self.seen = messages.len();

        let fresh: Vec<&Message> = messages
            .iter()
            .filter(|m| self.last_id.map_or(true, |last| m.id > last))
            .collect();
        if let Some(last) = fresh.last() {
            self.last_id = Some(last.id);
        }

        let unknown_speaker = fresh
            .iter()
            .filter_map(|m| m.agent_id)
            .any(|id| !self.names.contains_key(&id));

        let mut new_topic = None;
        if topic != self.topic.as_deref() {
            new_topic = topic.map(str::to_string);
            self.topic = topic.map(str::to_string);
        }

        ViewUpdate {
            reset,
            fresh,
            new_topic,
            unknown_speaker,
        }
    }

    async fn show(&mut self, session: &RoomSession, messages: &[Message], topic: Option<&str>) {
        let update = self.advance(messages, topic);

        if update.reset {
            println!("{}", "── conversation reset ──".yellow());
        }
        if update.unknown_speaker {
            if let Ok(agents) = session.reload_agents().await {
                self.names = agent_names(&agents);
            }
        }
        for message in &update.fresh {
            println!("{}", format_message(message, &self.names));
        }
        if let Some(topic) = &update.new_topic {
            println!("  {} {}", "Topic:".bold(), topic.magenta());
        }
    }
}
