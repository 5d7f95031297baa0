use chorus_core::{ChorusConfig, ChorusError, CliErrorDisplay, HttpRoomApi, LoggingConfig, RoomApi};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::{
    handle_agents_command, handle_conversation_command, handle_rooms_command,
    handle_watch_command, AgentsCommand, ConversationCommand, RoomsCommand,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "chorus")]
#[command(version = VERSION)]
#[command(about = "Chorus - create rooms of simulated agents and watch them talk")]
#[command(long_about = r#"
Chorus drives a multi-agent conversation server from the terminal. Rooms hold
agents with a name, a role and a goal; the server simulates their turns and
appends messages while you watch.

Use 'chorus rooms build debate' to start from a preset, then
'chorus watch <room> --simulate-every 5' to follow the conversation live.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true, help = "Server address (overrides CHORUS_API_BASE)")]
    base_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Check the server and show the effective configuration")]
    Status {
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    #[command(about = "List, create, build and delete rooms")]
    Rooms {
        #[command(subcommand)]
        action: Option<RoomsCommand>,
    },

    #[command(about = "List and add agents in a room")]
    Agents {
        #[command(subcommand)]
        action: AgentsCommand,
    },

    #[command(flatten)]
    Conversation(ConversationCommand),

    #[command(about = "Follow a room live until Ctrl-C")]
    Watch {
        #[arg(help = "Room id")]
        room: i64,

        #[arg(long, value_name = "SECS", help = "Simulate a turn every SECS seconds")]
        simulate_every: Option<u64>,
    },

    #[command(about = "Show version information")]
    Version {
        #[arg(short, long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Version { detailed } = cli.command {
        cmd_version(detailed);
        return ExitCode::SUCCESS;
    }

    let config = match load_config(cli.base_url.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(&e));
            return ExitCode::FAILURE;
        }
    };

    init_logging(cli.verbose, &config.logging);
    debug!(base_url = %config.base_url(), "Configuration loaded");

    match run(cli, config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ChorusError>() {
                Some(err) => eprintln!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(err)),
                None => eprintln!("{}: {}", "Error".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(base_url: Option<&str>) -> Result<ChorusConfig, ChorusError> {
    let mut config = ChorusConfig::load()?;
    if let Some(url) = base_url {
        config.api.base_url = url.to_string();
        config.validate()?;
    }
    Ok(config)
}

fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli, config: ChorusConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Status { format } => cmd_status(&config, &format).await,
        Commands::Rooms { action } => handle_rooms_command(&config, action).await,
        Commands::Agents { action } => handle_agents_command(&config, action).await,
        Commands::Conversation(cmd) => handle_conversation_command(&config, cmd).await,
        Commands::Watch {
            room,
            simulate_every,
        } => handle_watch_command(&config, room, simulate_every).await,
        Commands::Version { detailed } => {
            cmd_version(detailed);
            Ok(())
        }
    }
}

async fn cmd_status(config: &ChorusConfig, format: &str) -> anyhow::Result<()> {
    let api = HttpRoomApi::new(&config.api)?;
    let health = api.health().await;

    if format == "json" {
        let output = serde_json::json!({
            "server": {
                "base_url": api.base_url(),
                "reachable": health.is_ok(),
                "status": health.as_ref().ok().map(|h| h.status.clone()),
                "error": health.as_ref().err().map(|e| e.detail()),
            },
            "session": {
                "poll_interval_ms": config.session.poll_interval_ms,
                "live": config.session.live,
            },
            "export": {
                "directory": config.export.directory().display().to_string(),
                "suffix": config.export.suffix,
            },
            "logging": {
                "level": config.logging.level,
                "json_format": config.logging.json_format,
            }
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Chorus Status".cyan().bold());
    println!("{}", "═".repeat(40).dimmed());
    println!();

    println!("  {} {}", "Server:".bold(), api.base_url());
    match &health {
        Ok(h) if h.is_ok() => println!("  {} {}", "Health:".bold(), "OK".green()),
        Ok(h) => println!("  {} {}", "Health:".bold(), h.status.yellow()),
        Err(e) => println!("  {} {}", "Health:".bold(), e.detail().red()),
    }

    println!();
    println!("  {}", "Configuration".yellow().bold());
    println!(
        "    Poll interval:  {} ms",
        config.session.poll_interval_ms
    );
    println!("    Live updates:   {}", config.session.live);
    println!(
        "    Export to:      {}",
        config.export.directory().display()
    );
    println!("    Log level:      {}", config.logging.level);

    health.map(|_| ()).map_err(Into::into)
}

fn cmd_version(detailed: bool) {
    if detailed {
        println!("{}", "Chorus Version Information".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!("  {:<15} {}", "Version:".bold(), VERSION);
        println!("  {:<15} {}", "Name:".bold(), NAME);
        println!("  {:<15} Apache-2.0", "License:".bold());
        println!();
        println!("  {}", "Build Information:".bold());
        println!("    Rust Edition: 2021");
        #[cfg(debug_assertions)]
        println!("    Build:        Debug");
        #[cfg(not(debug_assertions))]
        println!("    Build:        Release");
    } else {
        println!("chorus {}", VERSION);
    }
}
