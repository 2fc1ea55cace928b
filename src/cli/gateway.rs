//! Gateway command handler (long-running bot server).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use picobot::bus::MessageBus;
use picobot::cron::{bus_callback, Scheduler};
use picobot::heartbeat::HeartbeatService;
use picobot::log_component;

use super::agent::build_agent;
use super::load_config;

/// Start the gateway and run until Ctrl-C.
pub(crate) async fn cmd_gateway(model: Option<String>) -> Result<()> {
    println!("Starting Picobot Gateway...");

    let config = load_config(model)?;
    let workspace = config.workspace_path();
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("Failed to create workspace {}", workspace.display()))?;

    let bus = Arc::new(MessageBus::with_buffer_size(config.bus_capacity()));
    let scheduler = Arc::new(Scheduler::new(bus_callback(Arc::clone(&bus))));
    let agent =
        Arc::new(build_agent(&config, Arc::clone(&bus), Some(Arc::clone(&scheduler))).await?);
    let heartbeat = Arc::new(HeartbeatService::new(
        &workspace,
        Duration::from_secs(config.agents.defaults.heartbeat_interval_secs),
        Arc::clone(&bus),
    ));

    info!(
        model = %agent.model(),
        workspace = %workspace.display(),
        tools = agent.tools().len(),
        "Gateway ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let agent_handle = {
        let agent = Arc::clone(&agent);
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { agent.run(rx).await })
    };
    let scheduler_handle = {
        let scheduler = Arc::clone(&scheduler);
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { scheduler.run(rx).await })
    };
    let heartbeat_handle = {
        let heartbeat = Arc::clone(&heartbeat);
        let rx = shutdown_rx.clone();
        tokio::spawn(async move { heartbeat.run(rx).await })
    };

    // No channel adapters are wired in; replies are printed.
    let outbound_handle = {
        let bus = Arc::clone(&bus);
        tokio::spawn(async move {
            while let Some(msg) = bus.consume_outbound().await {
                log_component!(
                    info,
                    "gateway",
                    "Outbound message",
                    channel = msg.channel.as_str(),
                    chat_id = msg.chat_id.as_str(),
                );
                println!("[{}:{}] {}", msg.channel, msg.chat_id, msg.content);
            }
        })
    };

    println!("Gateway running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .with_context(|| "Failed to listen for Ctrl+C")?;

    println!();
    println!("Shutting down...");
    let _ = shutdown_tx.send(true);

    for (name, handle) in [
        ("agent", agent_handle),
        ("scheduler", scheduler_handle),
        ("heartbeat", heartbeat_handle),
    ] {
        if let Err(e) = handle.await {
            error!(task = name, error = %e, "Task panicked during shutdown");
        }
    }

    bus.close();
    if let Err(e) = outbound_handle.await {
        error!(error = %e, "Outbound task panicked during shutdown");
    }

    println!("Gateway stopped.");
    Ok(())
}
