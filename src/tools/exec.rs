//! `exec` tool: run a program from an argv array with a timeout.
//!
//! Only the array form is accepted, so no shell ever interprets the
//! command. A small deny list of destructive programs is enforced, and
//! arguments that look like paths escaping the working directory are
//! rejected.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use crate::error::{PicoError, Result};

use super::{truncate_chars, Tool, ToolContext};

/// Default timeout for a command.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 60;

/// Characters of combined output returned to the model.
pub const MAX_OUTPUT_CHARS: usize = 10_000;

const DENIED_PROGRAMS: &[&str] = &["rm", "sudo", "dd", "mkfs", "shutdown", "reboot"];

/// Runs a command and returns its combined output.
pub struct ExecTool {
    timeout: Duration,
    workdir: Option<PathBuf>,
}

impl ExecTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            workdir: None,
        }
    }

    /// Run commands inside `dir` unless the context names a workspace.
    pub fn with_workspace(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }
}

impl Default for ExecTool {
    fn default() -> Self {
        Self::new(DEFAULT_EXEC_TIMEOUT_SECS)
    }
}

fn is_denied_program(program: &str) -> bool {
    let base = Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    DENIED_PROGRAMS.contains(&base.as_str())
}

fn is_unsafe_arg(arg: &str) -> bool {
    arg.starts_with('/') || arg.starts_with('~') || arg.contains("..")
}

fn parse_argv(args: &Value) -> Result<Vec<String>> {
    match args.get("cmd") {
        None | Some(Value::Null) => Err(PicoError::Tool("exec: 'cmd' argument required".into())),
        Some(Value::String(_)) => Err(PicoError::Tool(
            "exec: string commands are disallowed; use array form".into(),
        )),
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Err(PicoError::Tool("exec: empty cmd array".into()));
            }
            items
                .iter()
                .map(|v| {
                    v.as_str().map(str::to_string).ok_or_else(|| {
                        PicoError::Tool("exec: cmd array must contain strings only".into())
                    })
                })
                .collect()
        }
        Some(_) => Err(PicoError::Tool("exec: unsupported cmd type".into())),
    }
}

#[async_trait]
impl Tool for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    fn description(&self) -> &str {
        "Execute a command (array form only, restricted for safety) and return its output"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cmd": {
                    "type": "array",
                    "description": "Command as [program, arg1, arg2, ...]. String form is rejected.",
                    "items": {"type": "string"},
                    "minItems": 1
                }
            },
            "required": ["cmd"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let argv = parse_argv(&args)?;
        let program = &argv[0];

        if is_denied_program(program) {
            return Err(PicoError::Tool(format!(
                "exec: program '{}' is disallowed",
                program
            )));
        }
        if let Some(arg) = argv[1..].iter().find(|a| is_unsafe_arg(a)) {
            return Err(PicoError::Tool(format!(
                "exec: argument '{}' looks unsafe",
                arg
            )));
        }

        let mut cmd = Command::new(program);
        cmd.args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let workdir = ctx
            .workspace
            .as_deref()
            .map(PathBuf::from)
            .or_else(|| self.workdir.clone());
        if let Some(dir) = workdir {
            cmd.current_dir(dir);
        }

        debug!(program = %program, args = argv.len() - 1, "Running command");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                PicoError::Tool(format!(
                    "exec: command timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| PicoError::Tool(format!("exec error: {}", e)))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = truncate_chars(
            combined.trim_end_matches('\n').to_string(),
            MAX_OUTPUT_CHARS,
        );

        if !output.status.success() {
            return Err(PicoError::Tool(format!(
                "exec error: {}: {}",
                output.status, combined
            )));
        }
        Ok(combined)
    }
}
