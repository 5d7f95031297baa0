use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use chorus_core::{
    AlwaysConfirm, ChorusConfig, Room, RoomId, RoomRegistry, Scenario, ScenarioTemplate,
};

use super::prompt::ask;
use super::connect;

#[derive(Subcommand)]
pub enum RoomsCommand {
    #[command(about = "List rooms on the server")]
    List {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Create an empty room")]
    Create {
        #[arg(help = "Room name")]
        name: String,

        #[arg(
            short,
            long,
            default_value = "freeplay",
            help = "Scenario (freeplay, debate, planning, ...)"
        )]
        scenario: String,
    },

    #[command(about = "Create a room with preset agents from a scenario template")]
    Build {
        #[arg(help = "Template key, see 'chorus rooms templates'")]
        template: String,
    },

    #[command(about = "Show the scenario templates the server ships with")]
    Templates,

    #[command(about = "Delete a room with its agents and messages")]
    Delete {
        #[arg(help = "Room id")]
        id: RoomId,

        #[arg(short, long, help = "Do not ask for confirmation")]
        yes: bool,
    },
}

pub async fn handle_rooms_command(
    config: &ChorusConfig,
    cmd: Option<RoomsCommand>,
) -> anyhow::Result<()> {
    let cmd = cmd.unwrap_or(RoomsCommand::List {
        format: "text".to_string(),
    });

    if let RoomsCommand::Templates = cmd {
        cmd_rooms_templates();
        return Ok(());
    }

    let mut registry = RoomRegistry::new(connect(config)?);

    match cmd {
        RoomsCommand::List { format } => cmd_rooms_list(&mut registry, &format).await,
        RoomsCommand::Create { name, scenario } => {
            cmd_rooms_create(&mut registry, &name, Scenario::from(scenario)).await
        }
        RoomsCommand::Build { template } => cmd_rooms_build(&mut registry, &template).await,
        RoomsCommand::Delete { id, yes } => cmd_rooms_delete(&mut registry, id, yes).await,
        RoomsCommand::Templates => Ok(()),
    }
}

async fn cmd_rooms_list(registry: &mut RoomRegistry, format: &str) -> anyhow::Result<()> {
    let rooms = registry.list().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(rooms)?);
        return Ok(());
    }

    if rooms.is_empty() {
        println!("{}", "No rooms yet.".yellow());
        println!(
            "{}",
            "Run 'chorus rooms create <name>' or 'chorus rooms build debate' to make one.".dimmed()
        );
        return Ok(());
    }

    println!("{}", "Rooms".cyan().bold());
    println!();
    println!("{}", rooms_table(rooms));
    println!();
    println!("  {} {}", "Total:".dimmed(), rooms.len());

    Ok(())
}

fn rooms_table(rooms: &[Room]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("ID").fg(Color::White),
            Cell::new("Name").fg(Color::White),
            Cell::new("Scenario").fg(Color::White),
            Cell::new("Created").fg(Color::White),
        ]);

    for room in rooms {
        let created = room
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(room.id),
            Cell::new(&room.name).fg(Color::Cyan),
            Cell::new(room.scenario.as_str()),
            Cell::new(created).fg(Color::DarkGrey),
        ]);
    }

    table
}

async fn cmd_rooms_create(
    registry: &mut RoomRegistry,
    name: &str,
    scenario: Scenario,
) -> anyhow::Result<()> {
    if !Scenario::known().contains(&scenario) {
        println!(
            "  {} '{}' is not a built-in scenario; the server stores it as given",
            "!".yellow(),
            scenario
        );
    }

    let room = registry.create(name, scenario).await?;

    println!(
        "{} Created room {} {}",
        "✓".green().bold(),
        room.name.cyan().bold(),
        format!("(#{}, {})", room.id, room.scenario).dimmed()
    );
    println!(
        "  {} Add agents with 'chorus agents add {} --name .. --role .. --goal ..'",
        "→".blue(),
        room.id
    );

    Ok(())
}

async fn cmd_rooms_build(registry: &mut RoomRegistry, template: &str) -> anyhow::Result<()> {
    if ScenarioTemplate::find(template).is_none() {
        println!(
            "  {} '{}' is not a known template; asking the server anyway",
            "!".yellow(),
            template
        );
    }

    let built = registry.build_from_template(template).await?;

    println!(
        "{} Built room {} {}",
        "✓".green().bold(),
        built.room.name.cyan().bold(),
        format!("(#{})", built.room.id).dimmed()
    );
    if let Some(description) = &built.description {
        println!("  {}", description.dimmed());
    }
    for agent in &built.agents {
        println!(
            "  {} {} {}",
            "•".blue(),
            agent.name.bold(),
            format!("({}) {}", agent.role, agent.goal).dimmed()
        );
    }

    Ok(())
}

fn cmd_rooms_templates() {
    println!("{}", "Scenario Templates".cyan().bold());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Key").fg(Color::White),
            Cell::new("Description").fg(Color::White),
            Cell::new("Agents").fg(Color::White),
        ]);

    for template in ScenarioTemplate::all() {
        let agents = template
            .agents
            .iter()
            .map(|a| format!("{} ({})", a.name, a.role))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![
            Cell::new(template.key).fg(Color::Cyan),
            Cell::new(template.description),
            Cell::new(agents),
        ]);
    }

    println!("{table}");
}

async fn cmd_rooms_delete(registry: &mut RoomRegistry, id: RoomId, yes: bool) -> anyhow::Result<()> {
    // Listing first lets the prompt show the room's name.
    registry.list().await?;

    if !ask(yes, registry.delete_prompt(id)).await? {
        println!("{}", "Cancelled.".yellow());
        return Ok(());
    }

    registry.delete(id, &AlwaysConfirm).await?;
    println!("{} Deleted room #{}", "✓".green().bold(), id);

    Ok(())
}
