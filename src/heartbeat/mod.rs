//! Heartbeat - periodically feed HEARTBEAT.md tasks to the agent.

mod service;

pub use service::{
    HeartbeatResult, HeartbeatService, DEFAULT_HEARTBEAT_INTERVAL_SECS, HEARTBEAT_FILE,
    HEARTBEAT_PREFIX,
};
