//! Agent module - the per-message processing protocol
//!
//! - Applying the remember shortcut for explicit "remember ..." requests
//! - Building conversation context with system prompt, memory and history
//! - Calling the LLM provider and executing requested tools, bounded by
//!   a maximum number of iterations
//! - Recording the turn in the session and replying through the bus
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  MessageBus │────>│  AgentLoop  │────>│ LLMProvider │
//! │  (inbound)  │     │             │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                   │                   │
//!        │                   │                   │
//!        │                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Scheduler  │     │   Session   │     │    Tools    │
//! │  Heartbeat  │     │   Manager   │     │  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```

mod context;
mod r#loop;

pub use context::{ContextBuilder, BOOTSTRAP_FILES, DEFAULT_TOP_K};
pub use r#loop::{
    register_default_tools, AgentLoop, AgentSettings, DEFAULT_MAX_ITERATIONS,
    MAX_ITERATIONS_REPLY, NO_RESPONSE_REPLY, PROVIDER_ERROR_REPLY, REMEMBER_ACK,
    TOOL_ERROR_PREFIX,
};
