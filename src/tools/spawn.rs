//! `spawn` tool: acknowledge a request to start a background sub-agent.
//!
//! Sub-agents are not run yet; the tool records the request in the logs and
//! returns an acknowledgement so the model can carry on.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{PicoError, Result};

use super::{str_arg, Tool, ToolContext};

pub struct SpawnTool;

#[async_trait]
impl Tool for SpawnTool {
    fn name(&self) -> &str {
        "spawn"
    }

    fn description(&self) -> &str {
        "Spawn a background subagent (acknowledgement only)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent": {"type": "string", "description": "The name of the agent to spawn"},
                "task": {"type": "string", "description": "The task for the spawned agent"}
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let agent = str_arg(&args, "agent").unwrap_or_default();
        let task = str_arg(&args, "task").unwrap_or_default();
        if agent.is_empty() && task.is_empty() {
            return Err(PicoError::Tool("spawn: 'agent' or 'task' required".into()));
        }

        info!(
            agent = %agent,
            task = %task,
            chat_id = ctx.chat_id.as_deref().unwrap_or("-"),
            "Spawn requested"
        );
        Ok(format!("spawned: agent={} task={}", agent, task))
    }
}
