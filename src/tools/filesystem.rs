//! `filesystem` tool: read, write and list files confined to the workspace.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{PicoError, Result};

use super::{str_arg, Tool, ToolContext};

/// Workspace-confined file access.
pub struct FilesystemTool {
    workspace: PathBuf,
}

impl FilesystemTool {
    /// Confine access to `workspace`. A workspace in the context takes
    /// precedence.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    fn workspace<'a>(&'a self, ctx: &'a ToolContext) -> &'a Path {
        ctx.workspace
            .as_deref()
            .map(Path::new)
            .unwrap_or(&self.workspace)
    }
}

/// Lexically normalize `path` (no filesystem access), resolving `.` and `..`.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Resolve `requested` against `workspace`, rejecting anything outside it.
///
/// Symlinks are followed on the nearest existing ancestor of the target, so
/// a new file under a symlinked directory is checked against where it would
/// actually land.
pub(crate) fn resolve_in_workspace(workspace: &Path, requested: &str) -> Result<PathBuf> {
    let base = absolute(workspace)?;
    let candidate = if requested.trim().is_empty() {
        base.clone()
    } else if Path::new(requested).is_absolute() {
        normalize(Path::new(requested))
    } else {
        normalize(&base.join(requested))
    };

    let outside = || PicoError::Tool("filesystem: path outside workspace not allowed".into());
    if !candidate.starts_with(&base) {
        return Err(outside());
    }

    if let Ok(real_base) = std::fs::canonicalize(&base) {
        let existing = candidate
            .ancestors()
            .find(|p| p.symlink_metadata().is_ok())
            .unwrap_or(&base);
        match std::fs::canonicalize(existing) {
            Ok(real) if real.starts_with(&real_base) => {}
            // dangling symlink or escape
            _ => return Err(outside()),
        }
    }
    Ok(candidate)
}

#[async_trait]
impl Tool for FilesystemTool {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn description(&self) -> &str {
        "Read, write, and list files in the workspace"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "The filesystem operation to perform",
                    "enum": ["read", "write", "list"]
                },
                "path": {
                    "type": "string",
                    "description": "File or directory path, relative to the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write (required when action is 'write')"
                }
            },
            "required": ["action", "path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let action = str_arg(&args, "action")
            .ok_or_else(|| PicoError::Tool("filesystem: 'action' is required".into()))?;
        let path = match args.get("path") {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(PicoError::Tool("filesystem: 'path' must be a string".into())),
        };
        let resolved = resolve_in_workspace(self.workspace(ctx), path)?;

        match action {
            "read" => tokio::fs::read_to_string(&resolved).await.map_err(|e| {
                PicoError::Tool(format!("filesystem: cannot read '{}': {}", path, e))
            }),
            "write" => {
                let content = args
                    .get("content")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        PicoError::Tool("filesystem: 'content' must be a string".into())
                    })?;
                if let Some(parent) = resolved.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&resolved, content).await?;
                Ok("written".to_string())
            }
            "list" => {
                let mut entries = tokio::fs::read_dir(&resolved).await.map_err(|e| {
                    PicoError::Tool(format!("filesystem: cannot list '{}': {}", path, e))
                })?;
                let mut names = Vec::new();
                while let Some(entry) = entries.next_entry().await? {
                    let mut name = entry.file_name().to_string_lossy().into_owned();
                    if entry.file_type().await?.is_dir() {
                        name.push('/');
                    }
                    names.push(name);
                }
                names.sort();
                Ok(names.join("\n"))
            }
            other => Err(PicoError::Tool(format!(
                "filesystem: unknown action {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tool(dir: &TempDir) -> FilesystemTool {
        FilesystemTool::new(dir.path())
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new();

        let out = tool(&dir)
            .execute(
                json!({"action": "write", "path": "notes/todo.txt", "content": "ship it"}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(out, "written");

        let read = tool(&dir)
            .execute(json!({"action": "read", "path": "notes/todo.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(read, "ship it");
    }

    #[tokio::test]
    async fn test_list_marks_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("skills")).unwrap();
        std::fs::write(dir.path().join("AGENTS.md"), "x").unwrap();

        let out = tool(&dir)
            .execute(json!({"action": "list", "path": "."}), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(out, "AGENTS.md\nskills/");
    }

    #[tokio::test]
    async fn test_rejects_escape() {
        let dir = TempDir::new().unwrap();
        for path in ["../outside.txt", "/etc/passwd", "a/../../b"] {
            let err = tool(&dir)
                .execute(json!({"action": "read", "path": path}), &ToolContext::new())
                .await
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "filesystem: path outside workspace not allowed"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rejects_write_through_symlinked_dir() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let err = tool(&dir)
            .execute(
                json!({"action": "write", "path": "link/new/pwned.txt", "content": "x"}),
                &ToolContext::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "filesystem: path outside workspace not allowed");
        assert!(!outside.path().join("new").exists());
    }

    #[tokio::test]
    async fn test_context_workspace_wins() {
        let configured = TempDir::new().unwrap();
        let turn = TempDir::new().unwrap();
        std::fs::write(turn.path().join("here.txt"), "turn").unwrap();

        let ctx = ToolContext::new().with_workspace(&turn.path().to_string_lossy());
        let out = tool(&configured)
            .execute(json!({"action": "read", "path": "here.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "turn");
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let dir = TempDir::new().unwrap();
        let err = tool(&dir)
            .execute(json!({"action": "delete", "path": "x"}), &ToolContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown action delete"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
