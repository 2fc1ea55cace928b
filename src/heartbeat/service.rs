//! Heartbeat service implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bus::{InboundMessage, MessageBus};

/// Workspace file whose content is sent on every tick.
pub const HEARTBEAT_FILE: &str = "HEARTBEAT.md";

/// Default seconds between ticks.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 60;

/// Text placed before the file content in the synthetic inbound message.
pub const HEARTBEAT_PREFIX: &str =
    "[HEARTBEAT CHECK] Review and execute any pending tasks from HEARTBEAT.md:\n\n";

/// Structured result from a heartbeat tick.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatResult {
    pub timestamp: DateTime<Utc>,
    /// Whether the heartbeat file was found.
    pub file_found: bool,
    /// Whether the file held non-blank content.
    pub actionable: bool,
    /// Whether the message was published.
    pub delivered: bool,
    /// Error message if the tick failed.
    pub error: Option<String>,
}

impl HeartbeatResult {
    fn ok(file_found: bool, actionable: bool, delivered: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            file_found,
            actionable,
            delivered,
            error: None,
        }
    }

    fn err(msg: String) -> Self {
        Self {
            timestamp: Utc::now(),
            file_found: false,
            actionable: false,
            delivered: false,
            error: Some(msg),
        }
    }
}

/// Background service that periodically enqueues HEARTBEAT.md content.
pub struct HeartbeatService {
    file_path: PathBuf,
    interval: Duration,
    bus: Arc<MessageBus>,
}

impl HeartbeatService {
    /// Create a heartbeat for `workspace`. A zero interval uses the default.
    pub fn new(workspace: impl AsRef<Path>, interval: Duration, bus: Arc<MessageBus>) -> Self {
        let interval = if interval.is_zero() {
            Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS)
        } else {
            interval
        };
        Self {
            file_path: workspace.as_ref().join(HEARTBEAT_FILE),
            interval,
            bus,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Read the heartbeat file once and publish it if it has content.
    ///
    /// Waits for inbound capacity, like any other producer.
    pub async fn tick(&self) -> HeartbeatResult {
        let content = match tokio::fs::read_to_string(&self.file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.file_path.display(), "Heartbeat file missing, skipping tick");
                return HeartbeatResult::ok(false, false, false);
            }
            Err(e) => {
                warn!(path = %self.file_path.display(), error = %e, "Failed to read heartbeat file");
                return HeartbeatResult::err(format!("Failed to read file: {e}"));
            }
        };

        let content = content.trim();
        if content.is_empty() {
            debug!("Heartbeat file is blank");
            return HeartbeatResult::ok(true, false, false);
        }

        let message = InboundMessage::new(
            "heartbeat",
            "heartbeat",
            "system",
            &format!("{}{}", HEARTBEAT_PREFIX, content),
        );
        match self.bus.publish_inbound(message).await {
            Ok(()) => {
                info!("Heartbeat sent tasks to agent");
                HeartbeatResult::ok(true, true, true)
            }
            Err(e) => {
                error!(error = %e, "Failed to publish heartbeat");
                HeartbeatResult::err(format!("Delivery failed: {e}"))
            }
        }
    }

    /// Tick every interval until `shutdown` flips to `true` or its sender drops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        // first tick completes immediately
        ticker.tick().await;
        info!(interval_secs = self.interval.as_secs(), "Heartbeat started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // A full inbound queue must not hold up shutdown.
                    tokio::select! {
                        _ = self.tick() => {}
                        _ = shutdown.wait_for(|stop| *stop) => break,
                    }
                }
            }
        }

        info!("Heartbeat stopped");
    }
}
