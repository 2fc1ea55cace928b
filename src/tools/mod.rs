//! Tools module - capabilities the model can call
//!
//! - `Tool` trait: name, description, JSON schema, `execute(args, ctx)`
//! - `ToolContext`: per-turn addressing (channel, chat_id, workspace)
//! - `ToolRegistry`: shared name-to-tool table used by the agent loop
//!
//! # Built-in Tools
//!
//! | name | purpose |
//! |------|---------|
//! | `message` | send a message to a chat |
//! | `filesystem` | read, write and list files inside the workspace |
//! | `exec` | run an argv command with a timeout |
//! | `web` | fetch a URL |
//! | `spawn` | placeholder for sub-agents |
//! | `cron` | schedule, list and cancel reminders |
//! | `write_memory` | write to today's note or long-term memory |
//! | `create_skill`, `list_skills`, `read_skill`, `delete_skill` | manage workspace skills |

pub mod cron;
pub mod exec;
pub mod filesystem;
pub mod memory;
pub mod message;
mod registry;
pub mod skills;
pub mod spawn;
mod types;
pub mod web;

pub use registry::ToolRegistry;
pub use types::{Tool, ToolContext};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// String argument `key`, trimmed, `None` when missing or blank.
pub(crate) fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub(crate) fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n...(truncated)", &text[..idx]),
        None => text,
    }
}

/// Tool that echoes its `message` argument. Handy for wiring tests.
///
/// # Example
///
/// ```rust
/// use picobot::tools::{Tool, ToolContext, EchoTool};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let result = EchoTool.execute(json!({"message": "Hello"}), &ToolContext::new()).await;
/// assert_eq!(result.unwrap(), "Hello");
/// # });
/// ```
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the provided message"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {"type": "string", "description": "The message to echo"}
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        Ok(args
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("(no message)")
            .to_string())
    }
}
