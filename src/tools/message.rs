//! `message` tool: send a message to a chat through the outbound queue.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::bus::{MessageBus, OutboundMessage};
use crate::error::{PicoError, Result};

use super::{str_arg, Tool, ToolContext};

/// Publishes an `OutboundMessage` addressed to the current chat unless the
/// arguments name another one.
pub struct MessageTool {
    bus: Arc<MessageBus>,
}

impl MessageTool {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        Self { bus }
    }
}

/// Text of the `content` argument. Non-string JSON is serialized.
fn content_arg(args: &Value) -> Option<String> {
    match args.get("content") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
    .filter(|s| !s.trim().is_empty())
}

#[async_trait]
impl Tool for MessageTool {
    fn name(&self) -> &str {
        "message"
    }

    fn description(&self) -> &str {
        "Send a message to the user. Defaults to the chat the current request came from."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "Message text to send"
                },
                "channel": {
                    "type": "string",
                    "description": "Destination channel. Omit to reply on the current channel."
                },
                "chat_id": {
                    "type": "string",
                    "description": "Destination chat ID. Omit to reply in the current chat."
                }
            },
            "required": ["content"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let content = content_arg(&args)
            .ok_or_else(|| PicoError::Tool("message tool: 'content' argument required".into()))?;

        let channel = str_arg(&args, "channel")
            .or(ctx.channel.as_deref())
            .ok_or_else(|| PicoError::Tool("message tool: no channel for this chat".into()))?;
        let chat_id = str_arg(&args, "chat_id")
            .or(ctx.chat_id.as_deref())
            .ok_or_else(|| PicoError::Tool("message tool: no chat_id for this chat".into()))?;

        match self
            .bus
            .publish_outbound(OutboundMessage::new(channel, chat_id, &content))
        {
            Ok(()) => Ok("sent".to_string()),
            Err(e) if e.is_bus_full() => Err(PicoError::Tool("outbound channel full".into())),
            Err(e) => Err(e),
        }
    }
}
