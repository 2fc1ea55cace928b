//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod agent;
pub mod gateway;
pub mod memory;
pub mod onboard;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "picobot")]
#[command(version)]
#[command(about = "Lightweight personal AI assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Write a default config and bootstrap the workspace
    Onboard,
    /// Talk to the agent (single message with -m, interactive otherwise)
    Agent {
        /// Message to process (non-interactive mode)
        #[arg(short, long)]
        message: Option<String>,
        /// Override the configured model
        #[arg(short = 'M', long)]
        model: Option<String>,
    },
    /// Run the long-lived gateway: bus, scheduler, agent loop and heartbeat
    Gateway {
        /// Override the configured model
        #[arg(short = 'M', long)]
        model: Option<String>,
    },
    /// Inspect or edit workspace memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

/// Which memory document a command addresses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MemoryTarget {
    /// Today's note file
    Today,
    /// Long-term memory (MEMORY.md)
    Long,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MemoryAction {
    /// Print today's notes or long-term memory
    Read {
        #[arg(value_enum)]
        target: MemoryTarget,
    },
    /// Append text to today's notes or long-term memory
    Append {
        #[arg(value_enum)]
        target: MemoryTarget,
        /// Text to append
        #[arg(short, long)]
        content: String,
    },
    /// Replace long-term memory
    Write {
        #[arg(value_enum)]
        target: MemoryTarget,
        /// New content
        #[arg(short, long)]
        content: String,
    },
    /// Print the notes of the last few days
    Recent {
        /// Number of days to include
        #[arg(short, long, default_value_t = 7)]
        days: usize,
    },
}

/// Entry point for the CLI, called from main().
pub async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Respect the configured logging settings; fall back to defaults if the
    // config file is missing or unreadable.
    let logging_cfg = picobot::config::Config::load()
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = picobot::utils::logging::init_logging(&logging_cfg) {
        eprintln!("Warning: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Version) => {
            cmd_version();
        }
        Some(Commands::Onboard) => {
            onboard::cmd_onboard()?;
        }
        Some(Commands::Agent { message, model }) => {
            agent::cmd_agent(message, model).await?;
        }
        Some(Commands::Gateway { model }) => {
            gateway::cmd_gateway(model).await?;
        }
        Some(Commands::Memory { action }) => {
            memory::cmd_memory(action)?;
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("picobot {}", env!("CARGO_PKG_VERSION"));
}

/// Load config and apply a `-M/--model` override.
pub(crate) fn load_config(model: Option<String>) -> Result<picobot::Config> {
    use anyhow::Context;

    let mut config = picobot::Config::load().with_context(|| "Failed to load configuration")?;
    if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
        config.agents.defaults.model = model;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_agent_message() {
        let cli = Cli::try_parse_from(["picobot", "agent", "-m", "hello", "-M", "gpt-4o"]).unwrap();
        match cli.command {
            Some(Commands::Agent { message, model }) => {
                assert_eq!(message.as_deref(), Some("hello"));
                assert_eq!(model.as_deref(), Some("gpt-4o"));
            }
            _ => panic!("expected agent command"),
        }
    }

    #[test]
    fn test_cli_parses_memory_append() {
        let cli =
            Cli::try_parse_from(["picobot", "memory", "append", "today", "-c", "note"]).unwrap();
        match cli.command {
            Some(Commands::Memory {
                action: MemoryAction::Append { target, content },
            }) => {
                assert_eq!(target, MemoryTarget::Today);
                assert_eq!(content, "note");
            }
            _ => panic!("expected memory append"),
        }
    }

    #[test]
    fn test_cli_memory_recent_default_days() {
        let cli = Cli::try_parse_from(["picobot", "memory", "recent"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Memory {
                action: MemoryAction::Recent { days: 7 }
            })
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_memory_target() {
        assert!(Cli::try_parse_from(["picobot", "memory", "read", "yesterday"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
