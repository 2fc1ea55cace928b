//! Agent command handlers (single message + interactive mode).

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use picobot::agent::{AgentLoop, AgentSettings};
use picobot::bus::{InboundMessage, MessageBus};
use picobot::config::Config;
use picobot::cron::Scheduler;
use picobot::providers::provider_from_config;
use picobot::session::SessionManager;

use super::load_config;

/// Deadline for a single `-m` message.
const DIRECT_TIMEOUT: Duration = Duration::from_secs(300);

/// Build an agent loop with persistent sessions and the default tools.
pub(crate) async fn build_agent(
    config: &Config,
    bus: Arc<MessageBus>,
    scheduler: Option<Arc<Scheduler>>,
) -> Result<AgentLoop> {
    let settings = AgentSettings::from_config(config);
    let sessions = SessionManager::new(settings.workspace.join("sessions"));
    let loaded = sessions
        .load_all()
        .await
        .with_context(|| "Failed to load sessions")?;
    debug!(sessions = loaded, "Loaded sessions");

    let provider = provider_from_config(config);
    Ok(AgentLoop::with_default_tools(
        bus, provider, sessions, settings, scheduler,
    ))
}

/// Interactive or single-message agent mode.
pub(crate) async fn cmd_agent(message: Option<String>, model: Option<String>) -> Result<()> {
    let config = load_config(model)?;

    if config.providers.openai.api_key.is_none() {
        eprintln!("Warning: No API key configured, replies come from the echo stub.");
        eprintln!("Set PICOBOT_OPENAI_API_KEY or edit {}", Config::path().display());
        eprintln!();
    }

    let bus = Arc::new(MessageBus::with_buffer_size(config.bus_capacity()));
    let agent = build_agent(&config, Arc::clone(&bus), None).await?;

    if let Some(msg) = message {
        match agent.process_direct(&msg, DIRECT_TIMEOUT).await {
            Ok(response) => println!("{}", response),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Replies are printed from the return value; drain the outbound queue so
    // it never fills up.
    let drain_bus = Arc::clone(&bus);
    tokio::spawn(async move { while drain_bus.consume_outbound().await.is_some() {} });

    println!("Picobot Interactive Agent (model: {})", agent.model());
    println!("Type your message and press Enter. Type 'quit' or 'exit' to stop.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                // EOF
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "quit" || input == "exit" {
                    println!("Goodbye!");
                    break;
                }

                let inbound = InboundMessage::new("cli", "user", "direct", input);
                match agent.process_message(&inbound).await {
                    Ok(response) => {
                        println!();
                        println!("{}", response);
                        println!();
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        eprintln!();
                    }
                }
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
    }

    bus.close();
    Ok(())
}
