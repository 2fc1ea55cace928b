//! Context builder for agent conversations
//!
//! Assembles the message list sent to the provider each turn: system prompt
//! (with workspace bootstrap files and the skills index), injected memory
//! context, a ranked summary of recent notes, prior history and the current
//! user message.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::memory::{MemoryItem, Ranker, SimpleRanker};
use crate::providers::Message;
use crate::skills::SkillsLoader;

/// Default system prompt for the Picobot agent
const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Picobot, a lightweight personal AI assistant.

You have access to tools to help accomplish tasks. Use them when needed.
Use the `message` tool to talk to the user mid-task, `write_memory` to keep
facts worth remembering and `cron` to schedule reminders.

Be concise but helpful. Focus on completing the user's request efficiently."#;

/// Workspace files appended to the system prompt when present, in order.
pub const BOOTSTRAP_FILES: &[&str] = &["AGENTS.md", "SOUL.md", "USER.md", "TOOLS.md"];

/// Default number of ranked memories summarized into the prompt.
pub const DEFAULT_TOP_K: usize = 5;

/// Builder for the per-turn provider context.
///
/// # Example
///
/// ```rust
/// use picobot::agent::ContextBuilder;
/// use picobot::memory::MemoryItem;
///
/// let builder = ContextBuilder::new("/nonexistent/workspace");
/// let memories = vec![MemoryItem::new("long", "user likes tea")];
/// let messages = builder.build_messages(
///     &["user: hi".to_string(), "assistant: hello".to_string()],
///     "what do I like?",
///     "telegram",
///     "42",
///     "",
///     &memories,
/// );
/// assert_eq!(messages.last().unwrap().content, "what do I like?");
/// ```
pub struct ContextBuilder {
    workspace: PathBuf,
    system_prompt: String,
    ranker: Arc<dyn Ranker>,
    top_k: usize,
    skills: SkillsLoader,
}

impl ContextBuilder {
    /// Create a builder with the default prompt and the word-overlap ranker.
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self::with_ranker(workspace, Arc::new(SimpleRanker::new()), DEFAULT_TOP_K)
    }

    /// Create a builder with a custom ranker.
    pub fn with_ranker(workspace: impl AsRef<Path>, ranker: Arc<dyn Ranker>, top_k: usize) -> Self {
        let workspace = workspace.as_ref().to_path_buf();
        Self {
            skills: SkillsLoader::new(&workspace),
            workspace,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            ranker,
            top_k,
        }
    }

    /// Replace the built-in system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Render the full system prompt for this turn.
    pub fn build_system_message(&self, channel: &str, chat_id: &str) -> String {
        let mut prompt = self.system_prompt.clone();

        for file in BOOTSTRAP_FILES {
            let path = self.workspace.join(file);
            if let Ok(content) = std::fs::read_to_string(&path) {
                let content = content.trim();
                if !content.is_empty() {
                    let _ = write!(prompt, "\n\n## {}\n\n{}", file, content);
                }
            }
        }

        let skills = self.skills.build_skills_summary();
        if !skills.is_empty() {
            let _ = write!(
                prompt,
                "\n\n## Skills\n\nUse `read_skill` to load a skill before following it.\n\n{}",
                skills
            );
        }

        let _ = write!(
            prompt,
            "\n\n## Runtime Context\n\n- Channel: {}\n- Chat ID: {}\n- Current time: {}\n- Workspace: {}",
            channel,
            chat_id,
            chrono::Local::now().to_rfc3339(),
            self.workspace.display()
        );
        prompt
    }

    /// Build the message list for one provider call.
    ///
    /// `history` holds flattened `role: content` entries, oldest first.
    pub fn build_messages(
        &self,
        history: &[String],
        content: &str,
        channel: &str,
        chat_id: &str,
        memory_context: &str,
        memories: &[MemoryItem],
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 4);
        messages.push(Message::system(&self.build_system_message(channel, chat_id)));

        if !memory_context.trim().is_empty() {
            messages.push(Message::system(&format!(
                "Memory context:\n\n{}",
                memory_context.trim()
            )));
        }

        let ranked = self.ranker.rank(content, memories, self.top_k);
        if !ranked.is_empty() {
            let mut summary = String::from("Relevant memories:");
            for item in &ranked {
                let _ = write!(summary, "\n- {} ({})", item.text, item.kind);
            }
            messages.push(Message::system(&summary));
        }

        messages.extend(history.iter().map(|entry| history_message(entry)));
        messages.push(Message::user(content));
        messages
    }
}

/// Parse a flattened `role: content` entry. Unknown roles become user turns
/// carrying the full entry.
fn history_message(entry: &str) -> Message {
    match entry.split_once(": ") {
        Some(("user", content)) => Message::user(content),
        Some(("assistant", content)) => Message::assistant(content),
        Some(("system", content)) => Message::system(content),
        _ => Message::user(entry),
    }
}
