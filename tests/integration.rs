//! Integration tests for Picobot
//!
//! These tests drive the public API end to end: bus, agent loop, tools,
//! scheduler, sessions and workspace bootstrap, with a scripted provider in
//! place of a real LLM.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::watch;

use picobot::agent::{AgentLoop, AgentSettings, REMEMBER_ACK};
use picobot::bus::{InboundMessage, MessageBus, OutboundMessage};
use picobot::config::{initialize_workspace, Config};
use picobot::cron::{bus_callback, Scheduler};
use picobot::heartbeat::{HeartbeatService, HEARTBEAT_PREFIX};
use picobot::memory::NoteStore;
use picobot::providers::{LLMProvider, LLMResponse, Message, ToolCall, ToolDefinition};
use picobot::session::SessionManager;
use picobot::tools::{EchoTool, ToolContext, ToolRegistry};
use picobot::{PicoError, Result};

// ============================================================================
// Helpers
// ============================================================================

/// Provider that replays canned responses, then repeats a final text reply.
struct ScriptedProvider {
    script: Mutex<VecDeque<LLMResponse>>,
    calls: AtomicUsize,
    tool_counts: Mutex<Vec<usize>>,
}

impl ScriptedProvider {
    fn new(script: Vec<LLMResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            tool_counts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        _messages: &[Message],
        tools: &[ToolDefinition],
        _model: &str,
    ) -> Result<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tool_counts.lock().unwrap().push(tools.len());
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| LLMResponse::text("done")))
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn call(name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(&format!("call_{}", name), name, &args.to_string())
}

fn settings(workspace: &TempDir) -> AgentSettings {
    AgentSettings {
        workspace: workspace.path().to_path_buf(),
        ..Default::default()
    }
}

async fn next_outbound(bus: &MessageBus) -> OutboundMessage {
    tokio::time::timeout(Duration::from_secs(2), bus.consume_outbound())
        .await
        .expect("timed out waiting for outbound")
        .expect("bus closed")
}

// ============================================================================
// Message Bus
// ============================================================================

#[tokio::test]
async fn test_message_bus_roundtrip() {
    let bus = MessageBus::new();

    let inbound = InboundMessage::new("telegram", "user123", "chat456", "Hello bot!");
    bus.publish_inbound(inbound).await.unwrap();

    let received = bus.consume_inbound().await.unwrap();
    assert_eq!(received.content, "Hello bot!");
    assert_eq!(received.session_key(), "telegram:chat456");

    bus.publish_outbound(OutboundMessage::reply_to(&received, "Hello human!"))
        .unwrap();

    let outgoing = bus.consume_outbound().await.unwrap();
    assert_eq!(outgoing.content, "Hello human!");
    assert_eq!(outgoing.channel, "telegram");
    assert_eq!(outgoing.chat_id, "chat456");
}

#[tokio::test]
async fn test_concurrent_message_producers() {
    let bus = Arc::new(MessageBus::new());
    let mut handles = vec![];

    for channel in ["telegram", "discord", "slack"] {
        let bus = Arc::clone(&bus);
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                let msg = InboundMessage::new(channel, "user", "chat", &format!("{}:{}", channel, i));
                bus.publish_inbound(msg).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..15 {
        received.push(bus.consume_inbound().await.unwrap().content);
    }

    // Per-producer order is preserved.
    for channel in ["telegram", "discord", "slack"] {
        let seq: Vec<_> = received.iter().filter(|c| c.starts_with(channel)).collect();
        let expected: Vec<_> = (0..5).map(|i| format!("{}:{}", channel, i)).collect();
        assert_eq!(seq, expected.iter().collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_outbound_full_is_reported_not_blocking() {
    let bus = MessageBus::with_buffer_size(1);
    bus.publish_outbound(OutboundMessage::new("cli", "direct", "first"))
        .unwrap();
    let err = bus
        .publish_outbound(OutboundMessage::new("cli", "direct", "second"))
        .unwrap_err();
    assert!(err.is_bus_full());
}

// ============================================================================
// Agent Loop
// ============================================================================

#[tokio::test]
async fn test_agent_run_delivers_tool_message_then_reply() {
    let workspace = TempDir::new().unwrap();
    let bus = Arc::new(MessageBus::new());
    let provider = ScriptedProvider::new(vec![
        LLMResponse::with_tools("", vec![call("message", json!({"content": "working on it"}))]),
        LLMResponse::text("All done."),
    ]);
    let agent = Arc::new(AgentLoop::with_default_tools(
        Arc::clone(&bus),
        provider.clone(),
        SessionManager::new_memory(),
        settings(&workspace),
        None,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.run(shutdown_rx).await })
    };

    bus.publish_inbound(InboundMessage::new("telegram", "u1", "42", "do the thing"))
        .await
        .unwrap();

    let first = next_outbound(&bus).await;
    assert_eq!(first.content, "working on it");
    assert_eq!(first.channel, "telegram");
    assert_eq!(first.chat_id, "42");

    let second = next_outbound(&bus).await;
    assert_eq!(second.content, "All done.");
    assert_eq!(provider.calls(), 2);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("agent loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_remember_shortcut_skips_provider() {
    let workspace = TempDir::new().unwrap();
    let bus = Arc::new(MessageBus::new());
    let provider = ScriptedProvider::new(vec![]);
    let agent = AgentLoop::with_default_tools(
        Arc::clone(&bus),
        provider.clone(),
        SessionManager::new_memory(),
        settings(&workspace),
        None,
    );

    let reply = agent
        .process_message(&InboundMessage::new("cli", "user", "direct", "Remember to buy milk"))
        .await
        .unwrap();

    assert_eq!(reply, REMEMBER_ACK);
    assert_eq!(provider.calls(), 0);
    assert_eq!(next_outbound(&bus).await.content, REMEMBER_ACK);

    let notes = NoteStore::new(workspace.path()).read_today().unwrap();
    assert!(notes.contains("buy milk"));

    let session = agent.sessions().get("cli:direct").await.unwrap();
    assert_eq!(session.len(), 2);
}

#[tokio::test]
async fn test_sessions_survive_restart() {
    let workspace = TempDir::new().unwrap();
    let sessions_dir = workspace.path().join("sessions");

    {
        let agent = AgentLoop::with_default_tools(
            Arc::new(MessageBus::new()),
            ScriptedProvider::new(vec![LLMResponse::text("Nice to meet you.")]),
            SessionManager::new(&sessions_dir),
            settings(&workspace),
            None,
        );
        agent
            .process_message(&InboundMessage::new("discord", "u", "room", "I'm Ada"))
            .await
            .unwrap();
    }

    let reloaded = SessionManager::new(&sessions_dir);
    assert_eq!(reloaded.load_all().await.unwrap(), 1);
    let session = reloaded.get("discord:room").await.unwrap();
    assert_eq!(
        session.history(),
        &["user: I'm Ada".to_string(), "assistant: Nice to meet you.".to_string()]
    );
}

#[tokio::test]
async fn test_cron_tool_schedules_reminder_that_reenters_bus() {
    let workspace = TempDir::new().unwrap();
    let bus = Arc::new(MessageBus::new());
    let scheduler = Arc::new(Scheduler::new(bus_callback(Arc::clone(&bus))));
    let provider = ScriptedProvider::new(vec![
        LLMResponse::with_tools(
            "",
            vec![call(
                "cron",
                json!({"action": "add", "name": "stretch", "message": "Stand up", "delay": "2m"}),
            )],
        ),
        LLMResponse::text("Reminder set."),
    ]);
    let agent = AgentLoop::with_default_tools(
        Arc::clone(&bus),
        provider.clone(),
        SessionManager::new_memory(),
        settings(&workspace),
        Some(Arc::clone(&scheduler)),
    );

    let reply = agent
        .process_message(&InboundMessage::new("telegram", "u", "42", "remind me in 2m"))
        .await
        .unwrap();
    assert_eq!(reply, "Reminder set.");

    // Every default tool plus cron was offered to the provider.
    assert_eq!(provider.tool_counts.lock().unwrap()[0], agent.tools().len());
    assert!(agent.tools().has("cron"));

    let jobs = scheduler.list();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, "stretch");
    assert_eq!(jobs[0].channel, "telegram");
    assert_eq!(jobs[0].chat_id, "42");

    let fired = scheduler.tick(jobs[0].fire_at + chrono::Duration::seconds(1));
    assert_eq!(fired.len(), 1);
    assert!(scheduler.is_empty());

    let reminder = tokio::time::timeout(Duration::from_secs(2), bus.consume_inbound())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reminder.sender_id, "cron");
    assert_eq!(reminder.session_key(), "telegram:42");
    assert!(reminder.content.contains("Stand up"));
}

#[tokio::test]
async fn test_process_direct_with_scripted_tools() {
    let workspace = TempDir::new().unwrap();
    let registry = Arc::new(ToolRegistry::new());
    registry.register(EchoTool);

    let provider = ScriptedProvider::new(vec![
        LLMResponse::with_tools("", vec![call("echo", json!({"message": "ping"}))]),
        LLMResponse::text("pong"),
    ]);
    let agent = AgentLoop::new(
        Arc::new(MessageBus::new()),
        provider,
        SessionManager::new_memory(),
        Arc::new(NoteStore::new(workspace.path())),
        registry,
        settings(&workspace),
    );

    assert_eq!(agent.model(), "scripted-model");
    let reply = agent
        .process_direct("say pong", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(reply, "pong");
}

// ============================================================================
// Tools
// ============================================================================

#[tokio::test]
async fn test_registry_unknown_tool() {
    let registry = ToolRegistry::new();
    registry.register(EchoTool);

    let ok = registry
        .execute("echo", json!({"message": "hi"}), &ToolContext::new())
        .await
        .unwrap();
    assert_eq!(ok, "hi");

    let err = registry
        .execute("nope", json!({}), &ToolContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PicoError::ToolNotFound(_)));
}

// ============================================================================
// Workspace, Config and Heartbeat
// ============================================================================

#[tokio::test]
async fn test_onboarded_workspace_feeds_heartbeat() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    let workspace = dir.path().join("workspace");

    let mut config = Config::default();
    config.agents.defaults.workspace = workspace.to_string_lossy().to_string();
    config.save(&config_path).unwrap();

    let (_, ws) = Config::onboard_at(&config_path).unwrap();
    assert_eq!(ws, workspace);
    // Idempotent.
    initialize_workspace(&ws).unwrap();

    std::fs::write(ws.join("HEARTBEAT.md"), "- check the weather\n").unwrap();

    let bus = Arc::new(MessageBus::new());
    let heartbeat = HeartbeatService::new(&ws, Duration::from_secs(60), Arc::clone(&bus));
    let result = heartbeat.tick().await;
    assert!(result.delivered);

    let msg = bus.consume_inbound().await.unwrap();
    assert_eq!(msg.channel, "heartbeat");
    assert!(msg.content.starts_with(HEARTBEAT_PREFIX));
    assert!(msg.content.ends_with("- check the weather"));
}

#[test]
fn test_config_load_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_from_path(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config.bus_capacity(), 200);
    assert_eq!(config.agents.defaults.max_tool_iterations, 20);
}
