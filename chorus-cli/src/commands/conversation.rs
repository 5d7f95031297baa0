use std::path::PathBuf;

use clap::Subcommand;
use colored::Colorize;

use chorus_core::{AlwaysConfirm, ChorusConfig, RoomId, TranscriptExporter};

use super::prompt::ask;
use super::{agent_names, connect, find_room, format_message, open_session};

/// One-shot writes against a room. Their effect shows up in `watch` or on
/// the next read; nothing here waits for the conversation to update.
#[derive(Subcommand)]
pub enum ConversationCommand {
    #[command(about = "Post a message as the human participant")]
    Say {
        #[arg(help = "Room id")]
        room: RoomId,

        #[arg(help = "Message text")]
        content: String,
    },

    #[command(about = "Let the next agent take a turn")]
    Turn {
        #[arg(help = "Room id")]
        room: RoomId,
    },

    #[command(about = "Ask the judge to weigh in")]
    Judge {
        #[arg(help = "Room id")]
        room: RoomId,
    },

    #[command(about = "Announce a new topic")]
    Topic {
        #[arg(help = "Room id")]
        room: RoomId,

        #[arg(help = "Topic text")]
        topic: String,
    },

    #[command(about = "Clear the conversation (and with --all, agent memory too)")]
    Reset {
        #[arg(help = "Room id")]
        room: RoomId,

        #[arg(short, long, help = "Wipe everything, not only the messages")]
        all: bool,

        #[arg(short, long, help = "Do not ask for confirmation")]
        yes: bool,
    },

    #[command(about = "Save the room transcript as Markdown")]
    Export {
        #[arg(help = "Room id")]
        room: RoomId,

        #[arg(short, long, help = "Directory to write into (default from config)")]
        out: Option<PathBuf>,
    },
}

pub async fn handle_conversation_command(
    config: &ChorusConfig,
    cmd: ConversationCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConversationCommand::Say { room, content } => cmd_say(config, room, &content).await,
        ConversationCommand::Turn { room } => cmd_turn(config, room, false).await,
        ConversationCommand::Judge { room } => cmd_turn(config, room, true).await,
        ConversationCommand::Topic { room, topic } => cmd_topic(config, room, &topic).await,
        ConversationCommand::Reset { room, all, yes } => cmd_reset(config, room, all, yes).await,
        ConversationCommand::Export { room, out } => cmd_export(config, room, out).await,
    }
}

async fn cmd_say(config: &ChorusConfig, room_id: RoomId, content: &str) -> anyhow::Result<()> {
    let session = open_session(config, room_id, false).await?;
    let result = session.send_human_message(content).await;
    session.close().await;

    let message = result?;
    println!("{} Sent message #{}", "✓".green().bold(), message.id);
    Ok(())
}

async fn cmd_turn(config: &ChorusConfig, room_id: RoomId, judge: bool) -> anyhow::Result<()> {
    let session = open_session(config, room_id, false).await?;
    let result = if judge {
        session.judge_turn().await
    } else {
        session.simulate_turn().await
    };
    let names = agent_names(&session.snapshot().await.agents);
    session.close().await;

    let message = result?;
    println!("{}", format_message(&message, &names));
    Ok(())
}

async fn cmd_topic(config: &ChorusConfig, room_id: RoomId, topic: &str) -> anyhow::Result<()> {
    let session = open_session(config, room_id, false).await?;
    let result = session.set_topic(topic).await;
    session.close().await;

    result?;
    println!(
        "{} Topic set to {}",
        "✓".green().bold(),
        topic.trim().magenta().bold()
    );
    Ok(())
}

async fn cmd_reset(config: &ChorusConfig, room_id: RoomId, all: bool, yes: bool) -> anyhow::Result<()> {
    let session = open_session(config, room_id, false).await?;

    // Ask before the session takes its busy flag.
    let confirmed = ask(yes, session.reset_prompt(all)).await;
    if !matches!(confirmed, Ok(true)) {
        session.close().await;
        confirmed?;
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    }

    let result = session.reset(all, &AlwaysConfirm).await;
    session.close().await;
    result?;

    let what = if all { "Room wiped" } else { "Conversation cleared" };
    println!("{} {} in #{}", "✓".green().bold(), what, room_id);
    Ok(())
}

async fn cmd_export(config: &ChorusConfig, room_id: RoomId, out: Option<PathBuf>) -> anyhow::Result<()> {
    let api = connect(config)?;
    let room = find_room(api.clone(), room_id).await?;

    let mut export_config = config.export.clone();
    if let Some(dir) = out {
        export_config.directory = dir.to_string_lossy().into_owned();
    }

    let exporter = TranscriptExporter::new(api, export_config);
    println!("  {} Exporting transcript of {}...", "→".blue(), room.name.cyan());
    let path = exporter.export_transcript(room.id, &room.name).await?;

    println!("{} Saved {}", "✓".green().bold(), path.display());
    Ok(())
}
