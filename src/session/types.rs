//! Session types for Picobot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of history entries kept per session.
///
/// Older entries are dropped on save. Durable facts belong in the note
/// store, not in session replay.
pub const MAX_HISTORY_SIZE: usize = 50;

/// A conversation keyed by `channel:chat_id`, stored as a flat turn log of
/// `"role: content"` entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub key: String,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: &str) -> Self {
        let now = Utc::now();
        Self {
            key: key.to_string(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append one `"role: content"` entry.
    pub fn add_message(&mut self, role: &str, content: &str) {
        self.history.push(format!("{}: {}", role, content));
        self.updated_at = Utc::now();
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Keep only the most recent [`MAX_HISTORY_SIZE`] entries.
    pub fn trim(&mut self) {
        if self.history.len() > MAX_HISTORY_SIZE {
            let excess = self.history.len() - MAX_HISTORY_SIZE;
            self.history.drain(..excess);
        }
    }
}
