//! Tool registry for Picobot
//!
//! Name-keyed table of shared tool instances. Lookups take a read lock, and
//! the lock is released before a tool runs, so a long tool call never
//! blocks registration or other lookups.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PicoError, Result};
use crate::providers::ToolDefinition;

use super::{Tool, ToolContext};

/// Registry of tools available to the agent.
///
/// # Example
/// ```
/// use picobot::tools::{EchoTool, ToolContext, ToolRegistry};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let registry = ToolRegistry::new();
/// registry.register(EchoTool);
///
/// let out = registry
///     .execute("echo", json!({"message": "hi"}), &ToolContext::new())
///     .await
///     .unwrap();
/// assert_eq!(out, "hi");
/// # });
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Tool>>> {
        self.tools.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    /// Register an already shared tool. A tool with the same name is replaced.
    pub fn register_arc(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.write().insert(name.clone(), tool).is_some() {
            info!(tool = %name, "Replacing tool");
        } else {
            info!(tool = %name, "Registering tool");
        }
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.read().get(name).cloned()
    }

    /// Execute the named tool.
    ///
    /// # Errors
    /// - `PicoError::Tool` when `name` is empty
    /// - `PicoError::ToolNotFound` when nothing is registered under `name`
    /// - the tool's own error, unchanged
    pub async fn execute(&self, name: &str, args: Value, ctx: &ToolContext) -> Result<String> {
        if name.is_empty() {
            return Err(PicoError::Tool("tool name is required".into()));
        }
        let tool = self
            .get(name)
            .ok_or_else(|| PicoError::ToolNotFound(name.to_string()))?;

        let start = Instant::now();
        let result = tool.execute(args, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(tool = name, duration_ms, "Tool executed successfully"),
            Err(e) => warn!(tool = name, error = %e, duration_ms, "Tool execution failed"),
        }
        result
    }

    /// Definitions of every registered tool, in no particular order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.read()
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.parameters()))
            .collect()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
