//! Tool types for Picobot
//!
//! The `Tool` trait every capability implements, and the per-turn
//! `ToolContext` passed into each call.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A capability the model can invoke by name.
///
/// Tool instances are shared across turns. Anything addressing-specific
/// (which channel and chat to reply to) arrives through [`ToolContext`],
/// never through mutable tool state.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use picobot::tools::{Tool, ToolContext};
/// use picobot::Result;
/// use serde_json::{json, Value};
///
/// struct Upper;
///
/// #[async_trait]
/// impl Tool for Upper {
///     fn name(&self) -> &str { "upper" }
///     fn description(&self) -> &str { "Uppercase the text argument" }
///     fn parameters(&self) -> Value {
///         json!({"type": "object", "properties": {"text": {"type": "string"}}})
///     }
///     async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
///         Ok(args["text"].as_str().unwrap_or_default().to_uppercase())
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name exposed to the model.
    fn name(&self) -> &str;

    /// Description exposed to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the accepted arguments.
    fn parameters(&self) -> Value;

    /// Run the tool and return its textual observation.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String>;
}

/// Per-turn execution context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Channel of the message being processed
    pub channel: Option<String>,
    /// Chat of the message being processed
    pub chat_id: Option<String>,
    /// Workspace directory
    pub workspace: Option<String>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reply address (builder pattern).
    pub fn with_channel(mut self, channel: &str, chat_id: &str) -> Self {
        self.channel = Some(channel.to_string());
        self.chat_id = Some(chat_id.to_string());
        self
    }

    /// Set the workspace directory (builder pattern).
    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }
}
