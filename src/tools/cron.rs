//! `cron` tool: let the model schedule, list and cancel reminders.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::cron::{format_duration, parse_duration, Scheduler};
use crate::error::{PicoError, Result};

use super::{str_arg, Tool, ToolContext};

pub struct CronTool {
    scheduler: Arc<Scheduler>,
}

impl CronTool {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    fn add(&self, args: &Value, ctx: &ToolContext) -> Result<String> {
        let name = str_arg(args, "name").unwrap_or("reminder");
        let message = str_arg(args, "message")
            .ok_or_else(|| PicoError::Tool("cron add: 'message' is required".into()))?;
        let delay_str = str_arg(args, "delay").ok_or_else(|| {
            PicoError::Tool("cron add: 'delay' is required (e.g. '2m', '1h')".into())
        })?;
        let delay = parse_duration(delay_str)
            .map_err(|e| PicoError::Tool(format!("cron add: {}", e)))?;
        if delay.is_zero() {
            return Err(PicoError::Tool("cron add: delay must be positive".into()));
        }

        let channel = ctx.channel.as_deref().unwrap_or("cli");
        let chat_id = ctx.chat_id.as_deref().unwrap_or("direct");
        let recurring = args
            .get("recurring")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let id = if recurring {
            self.scheduler
                .add_recurring(name, message, delay, channel, chat_id)
        } else {
            self.scheduler.add(name, message, delay, channel, chat_id)
        };

        let when = format_duration(delay);
        if recurring {
            Ok(format!(
                "Scheduled recurring job {:?} (id: {}). Will fire every {}.",
                name, id, when
            ))
        } else {
            Ok(format!(
                "Scheduled job {:?} (id: {}). Will fire in {}.",
                name, id, when
            ))
        }
    }

    fn list(&self) -> String {
        let jobs = self.scheduler.list();
        if jobs.is_empty() {
            return "No pending jobs.".to_string();
        }

        let now = Utc::now();
        let mut out = format!("{} pending job(s):\n", jobs.len());
        for job in jobs {
            let remaining =
                Duration::from_secs(job.remaining(now).as_secs_f64().round() as u64);
            let _ = writeln!(
                out,
                "- {} ({}): {:?} fires in {}",
                job.name,
                job.id,
                job.message,
                format_duration(remaining)
            );
        }
        out
    }

    fn cancel(&self, args: &Value) -> Result<String> {
        let name = str_arg(args, "name")
            .ok_or_else(|| PicoError::Tool("cron cancel: 'name' is required".into()))?;
        if self.scheduler.cancel_by_name(name) {
            Ok(format!("Cancelled job {:?}.", name))
        } else {
            Ok(format!("No job found with name {:?}.", name))
        }
    }
}

#[async_trait]
impl Tool for CronTool {
    fn name(&self) -> &str {
        "cron"
    }

    fn description(&self) -> &str {
        "Schedule a reminder or task after a delay. Actions: add (schedule), list (show pending), cancel (remove by name)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "add, list or cancel",
                    "enum": ["add", "list", "cancel"]
                },
                "name": {
                    "type": "string",
                    "description": "Short name for the job (used to cancel it)"
                },
                "message": {
                    "type": "string",
                    "description": "The reminder text delivered when the job fires"
                },
                "delay": {
                    "type": "string",
                    "description": "How long to wait before firing, e.g. '2m', '1h30m', '30s', '1h'"
                },
                "recurring": {
                    "type": "boolean",
                    "description": "Repeat at the same interval until cancelled",
                    "default": false
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        match str_arg(&args, "action").unwrap_or_default() {
            "add" => self.add(&args, ctx),
            "list" => Ok(self.list()),
            "cancel" => self.cancel(&args),
            other => Err(PicoError::Tool(format!(
                "cron: unknown action {:?} (use add, list, or cancel)",
                other
            ))),
        }
    }
}
