//! `write_memory` tool: persist notes the agent should keep beyond the
//! session window.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{PicoError, Result};
use crate::memory::NoteStore;

use super::{Tool, ToolContext};

pub struct WriteMemoryTool {
    store: Arc<NoteStore>,
}

impl WriteMemoryTool {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WriteMemoryTool {
    fn name(&self) -> &str {
        "write_memory"
    }

    fn description(&self) -> &str {
        "Write or append to memory (today's note or long-term MEMORY.md)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "description": "'today' for the daily note or 'long' for long-term memory",
                    "enum": ["today", "long"]
                },
                "content": {
                    "type": "string",
                    "description": "The content to write or append"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append to existing content (true) or overwrite (false)",
                    "default": true
                }
            },
            "required": ["target", "content"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let target = match args.get("target") {
            None => {
                return Err(PicoError::Tool(
                    "write_memory: 'target' argument required (today|long)".into(),
                ))
            }
            Some(v) => v
                .as_str()
                .ok_or_else(|| PicoError::Tool("write_memory: 'target' must be a string".into()))?,
        };
        let content = match args.get("content") {
            None => {
                return Err(PicoError::Tool(
                    "write_memory: 'content' argument required".into(),
                ))
            }
            Some(v) => v.as_str().ok_or_else(|| {
                PicoError::Tool("write_memory: 'content' must be a string".into())
            })?,
        };
        let append = args.get("append").and_then(Value::as_bool).unwrap_or(true);

        match target {
            "today" => {
                self.store.append_today(content)?;
                Ok("appended to today".to_string())
            }
            "long" if append => {
                self.store.append_long_term(content)?;
                Ok("appended to long-term memory".to_string())
            }
            "long" => {
                self.store.write_long_term(content)?;
                Ok("wrote long-term memory".to_string())
            }
            other => Err(PicoError::Tool(format!(
                "write_memory: unknown target '{}'",
                other
            ))),
        }
    }
}
