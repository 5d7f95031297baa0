use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use chorus_core::{ChorusConfig, RoomId};

use super::open_session;

#[derive(Subcommand)]
pub enum AgentsCommand {
    #[command(about = "List the agents in a room")]
    List {
        #[arg(help = "Room id")]
        room: RoomId,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Add an agent to a room")]
    Add {
        #[arg(help = "Room id")]
        room: RoomId,

        #[arg(short, long, help = "Agent name")]
        name: String,

        #[arg(short, long, help = "Role the agent plays, e.g. 'Pro side'")]
        role: String,

        #[arg(short, long, help = "What the agent is trying to achieve")]
        goal: String,
    },
}

pub async fn handle_agents_command(config: &ChorusConfig, cmd: AgentsCommand) -> anyhow::Result<()> {
    match cmd {
        AgentsCommand::List { room, format } => cmd_agents_list(config, room, &format).await,
        AgentsCommand::Add {
            room,
            name,
            role,
            goal,
        } => cmd_agents_add(config, room, &name, &role, &goal).await,
    }
}

async fn cmd_agents_list(config: &ChorusConfig, room_id: RoomId, format: &str) -> anyhow::Result<()> {
    let session = open_session(config, room_id, false).await?;
    let snapshot = session.snapshot().await;
    session.close().await;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&snapshot.agents)?);
        return Ok(());
    }

    if snapshot.agents.is_empty() {
        println!("{}", "No agents in this room.".yellow());
        println!(
            "{}",
            format!(
                "Run 'chorus agents add {} --name .. --role .. --goal ..' to add one.",
                room_id
            )
            .dimmed()
        );
        return Ok(());
    }

    println!(
        "{} {}",
        "Agents in".cyan().bold(),
        snapshot.room.name.cyan().bold()
    );
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Name").fg(Color::White),
            Cell::new("Role").fg(Color::White),
            Cell::new("Goal").fg(Color::White),
        ]);

    for agent in &snapshot.agents {
        table.add_row(vec![
            Cell::new(agent.id),
            Cell::new(&agent.name).fg(Color::Cyan),
            Cell::new(&agent.role),
            Cell::new(&agent.goal).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    Ok(())
}

async fn cmd_agents_add(
    config: &ChorusConfig,
    room_id: RoomId,
    name: &str,
    role: &str,
    goal: &str,
) -> anyhow::Result<()> {
    let session = open_session(config, room_id, false).await?;
    let result = session.add_agent(name, role, goal).await;
    let count = session.snapshot().await.agents.len();
    session.close().await;

    let agent = result?;
    println!(
        "{} Added {} to room #{} {}",
        "✓".green().bold(),
        agent.name.cyan().bold(),
        room_id,
        format!("({} agents now)", count).dimmed()
    );

    Ok(())
}
