//! Agent loop implementation
//!
//! One turn per inbound message: the remember shortcut, or context assembly
//! followed by the bounded provider/tool iteration. Both branches finish the
//! same way: the session is saved and one reply goes to the outbound queue.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::bus::{InboundMessage, MessageBus, OutboundMessage};
use crate::config::Config;
use crate::cron::Scheduler;
use crate::error::{PicoError, Result};
use crate::memory::NoteStore;
use crate::providers::{LLMProvider, Message, ToolCall};
use crate::session::SessionManager;
use crate::skills::SkillsLoader;
use crate::tools::cron::CronTool;
use crate::tools::exec::{ExecTool, DEFAULT_EXEC_TIMEOUT_SECS};
use crate::tools::filesystem::FilesystemTool;
use crate::tools::memory::WriteMemoryTool;
use crate::tools::message::MessageTool;
use crate::tools::skills::{CreateSkillTool, DeleteSkillTool, ListSkillsTool, ReadSkillTool};
use crate::tools::spawn::SpawnTool;
use crate::tools::web::WebTool;
use crate::tools::{ToolContext, ToolRegistry};

use super::context::ContextBuilder;

/// Reply sent after the remember shortcut stores a note.
pub const REMEMBER_ACK: &str = "OK, I've remembered that.";
/// Reply sent when the provider call fails.
pub const PROVIDER_ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your request.";
/// Reply sent when a turn produced neither content nor a tool result.
pub const NO_RESPONSE_REPLY: &str = "I've completed processing but have no response to give.";
/// Result of a direct call that ran out of iterations without any tool output.
pub const MAX_ITERATIONS_REPLY: &str = "Max iterations reached without final response";
/// Prefix for tool failures fed back to the model.
pub const TOOL_ERROR_PREFIX: &str = "(tool error) ";

/// Number of recent notes offered to the ranker each turn.
const RECENT_MEMORIES: usize = 5;
/// Default bound on provider calls per turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

static REMEMBER_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)^remember(?:\s+to)?\s+(.+)$").ok());

/// Note text when `content` asks the agent to remember something.
fn remember_note(content: &str) -> Option<&str> {
    let re = REMEMBER_RE.as_ref()?;
    re.captures(content.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Tunables for an [`AgentLoop`].
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model name; empty selects the provider default
    pub model: String,
    /// Provider calls allowed per turn
    pub max_iterations: usize,
    /// Workspace root handed to tools and the context builder
    pub workspace: PathBuf,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            workspace: PathBuf::from("."),
        }
    }
}

impl AgentSettings {
    /// Settings taken from the `agents.defaults` section of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.agents.defaults.model.clone(),
            max_iterations: config.agents.defaults.max_tool_iterations,
            workspace: config.workspace_path(),
        }
    }
}

/// Register the built-in tool set on `registry`.
///
/// The `cron` tool is only registered when a scheduler is supplied.
pub fn register_default_tools(
    registry: &ToolRegistry,
    bus: Arc<MessageBus>,
    memory: Arc<NoteStore>,
    workspace: &Path,
    scheduler: Option<Arc<Scheduler>>,
) {
    registry.register(MessageTool::new(bus));
    registry.register(FilesystemTool::new(workspace));
    registry.register(ExecTool::new(DEFAULT_EXEC_TIMEOUT_SECS).with_workspace(workspace));
    registry.register(WebTool::new());
    registry.register(SpawnTool);
    if let Some(scheduler) = scheduler {
        registry.register(CronTool::new(scheduler));
    }
    registry.register(WriteMemoryTool::new(memory));

    let skills = SkillsLoader::new(workspace);
    registry.register(CreateSkillTool::new(skills.clone()));
    registry.register(ListSkillsTool::new(skills.clone()));
    registry.register(ReadSkillTool::new(skills.clone()));
    registry.register(DeleteSkillTool::new(skills));
}

/// What the iteration loop produced before it stopped.
#[derive(Debug, Default)]
struct TurnOutcome {
    /// Content of the tool-call-free response, `None` when the budget ran out
    content: Option<String>,
    last_tool_result: Option<String>,
    iterations: usize,
}

/// The orchestrator: consumes inbound messages, drives the provider and tools,
/// records the turn and replies.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use picobot::agent::{AgentLoop, AgentSettings};
/// use picobot::bus::MessageBus;
/// use picobot::memory::NoteStore;
/// use picobot::providers::StubProvider;
/// use picobot::session::SessionManager;
/// use picobot::tools::ToolRegistry;
///
/// # tokio_test::block_on(async {
/// let workspace = tempfile::tempdir().unwrap();
/// let agent = AgentLoop::new(
///     Arc::new(MessageBus::new()),
///     Arc::new(StubProvider::new()),
///     SessionManager::new_memory(),
///     Arc::new(NoteStore::new(workspace.path())),
///     Arc::new(ToolRegistry::new()),
///     AgentSettings { workspace: workspace.path().to_path_buf(), ..Default::default() },
/// );
/// let reply = agent.process_direct("hello", Duration::from_secs(5)).await.unwrap();
/// assert!(reply.contains("hello"));
/// # });
/// ```
pub struct AgentLoop {
    bus: Arc<MessageBus>,
    provider: Arc<dyn LLMProvider>,
    sessions: Arc<SessionManager>,
    memory: Arc<NoteStore>,
    tools: Arc<ToolRegistry>,
    context_builder: ContextBuilder,
    model: String,
    max_iterations: usize,
    workspace: PathBuf,
    /// Per-session locks so turns for one key never overlap
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentLoop {
    /// Create an agent loop over explicit collaborators.
    pub fn new(
        bus: Arc<MessageBus>,
        provider: Arc<dyn LLMProvider>,
        sessions: SessionManager,
        memory: Arc<NoteStore>,
        tools: Arc<ToolRegistry>,
        settings: AgentSettings,
    ) -> Self {
        let model = if settings.model.trim().is_empty() {
            provider.default_model().to_string()
        } else {
            settings.model
        };

        Self {
            bus,
            sessions: Arc::new(sessions),
            memory,
            tools,
            context_builder: ContextBuilder::new(&settings.workspace),
            model,
            max_iterations: settings.max_iterations.max(1),
            workspace: settings.workspace,
            session_locks: Mutex::new(HashMap::new()),
            provider,
        }
    }

    /// Create an agent loop with a note store in the workspace and every
    /// built-in tool registered.
    pub fn with_default_tools(
        bus: Arc<MessageBus>,
        provider: Arc<dyn LLMProvider>,
        sessions: SessionManager,
        settings: AgentSettings,
        scheduler: Option<Arc<Scheduler>>,
    ) -> Self {
        let memory = Arc::new(NoteStore::new(&settings.workspace));
        let tools = Arc::new(ToolRegistry::new());
        register_default_tools(
            &tools,
            Arc::clone(&bus),
            Arc::clone(&memory),
            &settings.workspace,
            scheduler,
        );
        Self::new(bus, provider, sessions, memory, tools, settings)
    }

    /// Replace the context builder (custom prompt or ranker).
    pub fn with_context_builder(mut self, context_builder: ContextBuilder) -> Self {
        self.context_builder = context_builder;
        self
    }

    /// Model name sent to the provider.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn memory(&self) -> &Arc<NoteStore> {
        &self.memory
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    fn tool_context(&self, channel: &str, chat_id: &str) -> ToolContext {
        ToolContext::new()
            .with_channel(channel, chat_id)
            .with_workspace(&self.workspace.to_string_lossy())
    }

    /// Memory context and ranked recent notes for the prompt.
    fn memory_inputs(&self) -> (String, Vec<crate::memory::MemoryItem>) {
        let memory_context = self.memory.memory_context().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read memory context");
            String::new()
        });
        (memory_context, self.memory.recent(RECENT_MEMORIES))
    }

    /// Process one inbound message to completion and publish the reply.
    ///
    /// Provider failures are folded into an apology, so this only fails on
    /// errors outside the turn protocol. Returns the reply text.
    pub async fn process_message(&self, msg: &InboundMessage) -> Result<String> {
        let session_key = msg.session_key();
        let session_lock = {
            let mut locks = self.session_locks.lock().await;
            locks
                .entry(session_key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let result = {
            let _session_guard = session_lock.lock().await;
            self.run_turn(msg, &session_key).await
        };

        // Clones are only taken under the map lock, so a count of two (map
        // plus ours) means no other turn is waiting on this session.
        let mut locks = self.session_locks.lock().await;
        if Arc::strong_count(&session_lock) == 2 {
            locks.remove(&session_key);
        }
        result
    }

    /// One turn for `msg`. The caller holds the session lock.
    async fn run_turn(&self, msg: &InboundMessage, session_key: &str) -> Result<String> {
        let mut session = self.sessions.get_or_create(session_key).await;

        let reply = match remember_note(&msg.content) {
            Some(note) => {
                if let Err(e) = self.memory.append_today(note) {
                    error!(error = %e, "Failed to append note");
                }
                info!("Stored note via remember shortcut");
                REMEMBER_ACK.to_string()
            }
            None => {
                let (memory_context, memories) = self.memory_inputs();
                let messages = self.context_builder.build_messages(
                    session.history(),
                    &msg.content,
                    &msg.channel,
                    &msg.chat_id,
                    &memory_context,
                    &memories,
                );
                let ctx = self.tool_context(&msg.channel, &msg.chat_id);

                match self.run_iterations(messages, &ctx).await {
                    Ok(outcome) => final_reply(outcome),
                    Err(e) => {
                        error!(error = %e, "Provider call failed");
                        PROVIDER_ERROR_REPLY.to_string()
                    }
                }
            }
        };

        session.add_message("user", &msg.content);
        session.add_message("assistant", &reply);
        if let Err(e) = self.sessions.save(&session).await {
            warn!(session = %session_key, error = %e, "Failed to save session");
        }

        match self.bus.publish_outbound(OutboundMessage::reply_to(msg, &reply)) {
            Ok(()) => {}
            Err(e) if e.is_bus_full() => warn!("Outbound channel full, dropping message"),
            Err(e) => warn!(error = %e, "Failed to publish outbound message"),
        }

        Ok(reply)
    }

    /// Answer `content` directly, without bus consumption or session history.
    ///
    /// # Errors
    /// - provider errors, unchanged
    /// - `PicoError::Timeout` when `timeout` elapses first
    pub async fn process_direct(&self, content: &str, timeout: Duration) -> Result<String> {
        let work = async {
            let (memory_context, memories) = self.memory_inputs();
            let messages = self.context_builder.build_messages(
                &[],
                content,
                "cli",
                "direct",
                &memory_context,
                &memories,
            );
            let ctx = self.tool_context("cli", "direct");
            let outcome = self.run_iterations(messages, &ctx).await?;

            Ok::<_, PicoError>(match (outcome.content, outcome.last_tool_result) {
                (Some(content), _) if !content.is_empty() => content,
                (_, Some(last)) => last,
                (Some(content), None) => content,
                (None, None) => MAX_ITERATIONS_REPLY.to_string(),
            })
        };

        tokio::time::timeout(timeout, work).await.map_err(|_| {
            PicoError::Timeout(format!("no response within {}ms", timeout.as_millis()))
        })?
    }

    /// Bounded provider/tool loop shared by both entry points.
    async fn run_iterations(
        &self,
        mut messages: Vec<Message>,
        ctx: &ToolContext,
    ) -> Result<TurnOutcome> {
        let tool_definitions = self.tools.definitions();
        let mut outcome = TurnOutcome::default();

        while outcome.iterations < self.max_iterations {
            outcome.iterations += 1;
            debug!(
                iteration = outcome.iterations,
                max_iterations = self.max_iterations,
                "Calling provider"
            );

            let response = self
                .provider
                .chat(&messages, &tool_definitions, &self.model)
                .await?;

            if !response.has_tool_calls() {
                outcome.content = Some(response.content);
                return Ok(outcome);
            }

            messages.push(Message::assistant_with_tools(
                &response.content,
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = self.execute_tool_call(call, ctx).await;
                messages.push(Message::tool_result(&call.id, &result));
                outcome.last_tool_result = Some(result);
            }
        }

        info!(
            iterations = outcome.iterations,
            "Tool loop reached maximum iterations"
        );
        Ok(outcome)
    }

    /// Run one tool call; failures become model-visible text.
    async fn execute_tool_call(&self, call: &ToolCall, ctx: &ToolContext) -> String {
        info!(tool = %call.name, id = %call.id, "Executing tool");
        let args = parse_tool_arguments(call);
        match self.tools.execute(&call.name, args, ctx).await {
            Ok(result) => result,
            Err(e) => format!("{}{}", TOOL_ERROR_PREFIX, e),
        }
    }

    /// Consume inbound messages until `shutdown` flips to `true`, its sender
    /// drops, or the bus closes. Turns run one at a time.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow_and_update() {
            return;
        }
        info!(model = %self.model, provider = self.provider.name(), "Agent loop started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Received shutdown signal");
                        break;
                    }
                }
                msg = self.bus.consume_inbound() => {
                    let Some(msg) = msg else {
                        info!("Inbound channel closed");
                        break;
                    };
                    self.handle_inbound(msg).await;
                }
            }
        }

        info!("Agent loop stopped");
    }

    async fn handle_inbound(&self, msg: InboundMessage) {
        let request_span = info_span!(
            "request",
            request_id = %uuid::Uuid::new_v4(),
            channel = %msg.channel,
            chat_id = %msg.chat_id,
            sender = %msg.sender_id,
        );

        async {
            info!("Processing message");
            let start = Instant::now();
            match self.process_message(&msg).await {
                Ok(reply) => info!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    response_len = reply.len(),
                    "Request completed"
                ),
                Err(e) => error!(
                    latency_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Request failed"
                ),
            }
        }
        .instrument(request_span)
        .await;
    }
}

/// Final reply of a bus turn: content, else the last tool result, else a
/// fixed fallback.
fn final_reply(outcome: TurnOutcome) -> String {
    match (outcome.content, outcome.last_tool_result) {
        (Some(content), _) if !content.is_empty() => content,
        (_, Some(last)) if !last.is_empty() => last,
        _ => NO_RESPONSE_REPLY.to_string(),
    }
}

/// Decode tool-call arguments. Blank input is an empty object; malformed
/// JSON is passed through as a `_parse_error` object so the tool can report it.
fn parse_tool_arguments(call: &ToolCall) -> Value {
    if call.arguments.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str::<Value>(&call.arguments) {
        Ok(value) => value,
        Err(e) => {
            warn!(tool = %call.name, error = %e, "Invalid JSON in tool arguments");
            json!({"_parse_error": format!("Invalid arguments JSON: {}", e)})
        }
    }
}
