//! Picobot - lightweight personal AI assistant core
//!
//! A message bus decouples channel adapters from the agent loop. The loop
//! drives an LLM provider through a bounded tool loop, records each turn in
//! a session and publishes one reply per inbound message. An in-memory
//! scheduler and a heartbeat inject synthetic messages into the same bus.

pub mod agent;
pub mod bus;
pub mod config;
pub mod cron;
pub mod error;
pub mod heartbeat;
pub mod memory;
pub mod providers;
pub mod session;
pub mod skills;
pub mod tools;
pub mod utils;

pub use agent::{AgentLoop, AgentSettings};
pub use bus::{InboundMessage, MessageBus, OutboundMessage};
pub use config::Config;
pub use cron::Scheduler;
pub use error::{PicoError, Result};
pub use providers::{LLMProvider, LLMResponse, Message, Role, ToolCall, ToolDefinition};
pub use session::{Session, SessionManager};
pub use tools::{Tool, ToolContext, ToolRegistry};
