//! Session module - per-conversation bounded history
//!
//! Sessions live in memory for the process lifetime and are snapshotted to
//! one JSON file per key after every turn.
//!
//! # Example
//!
//! ```
//! use picobot::session::SessionManager;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = SessionManager::new_memory();
//!
//!     let mut session = manager.get_or_create("telegram:chat123").await;
//!     session.add_message("user", "Hello!");
//!     session.add_message("assistant", "Hi there!");
//!
//!     manager.save(&session).await.unwrap();
//! }
//! ```

pub mod types;

pub use types::{Session, MAX_HISTORY_SIZE};

use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Owns the session table and its on-disk snapshots.
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    storage_path: Option<PathBuf>,
}

impl SessionManager {
    /// Create a manager persisting under `dir`. The directory is created on
    /// first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            storage_path: Some(dir.into()),
        }
    }

    /// Create a manager that never touches the filesystem.
    pub fn new_memory() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            storage_path: None,
        }
    }

    /// Directory holding session files, if persistence is enabled.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Return the session for `key`, creating an empty one if absent.
    ///
    /// Never reads from disk; use [`load_all`](Self::load_all) at startup.
    pub async fn get_or_create(&self, key: &str) -> Session {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(key) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key))
            .clone()
    }

    /// Return the session for `key` if it is in memory.
    pub async fn get(&self, key: &str) -> Option<Session> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Trim `session` to the most recent entries, store it, and write its file.
    ///
    /// The in-memory table is updated before the write, so a disk failure
    /// still leaves the live session current.
    pub async fn save(&self, session: &Session) -> Result<()> {
        let mut trimmed = session.clone();
        trimmed.trim();

        let content = self
            .storage_path
            .as_ref()
            .map(|_| serde_json::to_string_pretty(&trimmed))
            .transpose()?;
        let key = trimmed.key.clone();
        let entries = trimmed.len();
        self.sessions.write().await.insert(key.clone(), trimmed);

        if let (Some(storage_path), Some(content)) = (&self.storage_path, content) {
            tokio::fs::create_dir_all(storage_path).await?;
            let file_path = storage_path.join(format!("{}.json", sanitize_key(&key)));
            tokio::fs::write(&file_path, content).await?;
            debug!(session = %key, entries, "Session saved");
        }
        Ok(())
    }

    /// Populate the table from the session directory.
    ///
    /// Unreadable or corrupt files are skipped with a warning. Returns the
    /// number of sessions loaded.
    pub async fn load_all(&self) -> Result<usize> {
        let Some(ref storage_path) = self.storage_path else {
            return Ok(0);
        };
        tokio::fs::create_dir_all(storage_path).await?;

        let mut loaded = Vec::new();
        let mut entries = tokio::fs::read_dir(storage_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable session file");
                    continue;
                }
            };
            match serde_json::from_str::<Session>(&content) {
                Ok(session) => loaded.push(session),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping corrupt session file");
                }
            }
        }

        let count = loaded.len();
        let mut sessions = self.sessions.write().await;
        for session in loaded {
            sessions.insert(session.key.clone(), session);
        }
        debug!(count, "Sessions loaded");
        Ok(count)
    }

    /// Keys currently in memory, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of sessions in memory.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Percent-encode characters that are unsafe in file names, `%` included so
/// the mapping stays unambiguous.
fn sanitize_key(key: &str) -> String {
    let mut result = String::with_capacity(key.len() * 3);
    for c in key.chars() {
        match c {
            '/' => result.push_str("%2F"),
            '\\' => result.push_str("%5C"),
            ':' => result.push_str("%3A"),
            '*' => result.push_str("%2A"),
            '?' => result.push_str("%3F"),
            '"' => result.push_str("%22"),
            '<' => result.push_str("%3C"),
            '>' => result.push_str("%3E"),
            '|' => result.push_str("%7C"),
            '%' => result.push_str("%25"),
            c => result.push(c),
        }
    }
    result
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            storage_path: self.storage_path.clone(),
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_or_create_returns_empty_session() {
        let manager = SessionManager::new_memory();
        let session = manager.get_or_create("telegram:1").await;
        assert!(session.is_empty());
        assert_eq!(session.key, "telegram:1");
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_or_create_does_not_read_disk() {
        let dir = TempDir::new().unwrap();
        let writer = SessionManager::new(dir.path());
        let mut session = writer.get_or_create("cli:direct").await;
        session.add_message("user", "persisted");
        writer.save(&session).await.unwrap();

        let fresh = SessionManager::new(dir.path());
        assert!(fresh.get_or_create("cli:direct").await.is_empty());
    }

    #[tokio::test]
    async fn test_save_updates_memory() {
        let manager = SessionManager::new_memory();
        let mut session = manager.get_or_create("k").await;
        session.add_message("user", "Hello");
        manager.save(&session).await.unwrap();

        let loaded = manager.get_or_create("k").await;
        assert_eq!(loaded.history(), ["user: Hello"]);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_current() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();

        let manager = SessionManager::new(blocker.join("sessions"));
        let mut session = manager.get_or_create("k").await;
        session.add_message("user", "first");
        assert!(manager.save(&session).await.is_err());

        let live = manager.get_or_create("k").await;
        assert_eq!(live.history(), ["user: first"]);
    }

    #[tokio::test]
    async fn test_save_and_load_all_round_trip() {
        let dir = TempDir::new().unwrap();
        let manager = SessionManager::new(dir.path().join("sessions"));

        let mut session = manager.get_or_create("telegram:42").await;
        for i in 0..25 {
            session.add_message("user", &format!("q{}", i));
            session.add_message("assistant", &format!("a{}", i));
        }
        manager.save(&session).await.unwrap();

        let reloaded = SessionManager::new(dir.path().join("sessions"));
        assert_eq!(reloaded.load_all().await.unwrap(), 1);
        let restored = reloaded.get("telegram:42").await.unwrap();
        assert_eq!(restored.history, session.history);
    }

    #[tokio::test]
    async fn test_save_trims_to_most_recent() {
        let dir = TempDir::new().unwrap();
        let manager = SessionManager::new(dir.path());

        let mut session = manager.get_or_create("k").await;
        for i in 0..70 {
            session.add_message("user", &format!("m{}", i));
        }
        manager.save(&session).await.unwrap();

        let reloaded = SessionManager::new(dir.path());
        reloaded.load_all().await.unwrap();
        let restored = reloaded.get("k").await.unwrap();
        assert_eq!(restored.len(), MAX_HISTORY_SIZE);
        assert_eq!(restored.history[0], "user: m20");
        assert_eq!(manager.get("k").await.unwrap().len(), MAX_HISTORY_SIZE);
    }

    #[tokio::test]
    async fn test_load_all_skips_corrupt_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let manager = SessionManager::new(dir.path());
        let mut good = Session::new("slack:general");
        good.add_message("user", "ok");
        manager.save(&good).await.unwrap();

        let reloaded = SessionManager::new(dir.path());
        assert_eq!(reloaded.load_all().await.unwrap(), 1);
        assert_eq!(reloaded.list().await, vec!["slack:general".to_string()]);
    }

    #[tokio::test]
    async fn test_load_all_memory_manager() {
        let manager = SessionManager::new_memory();
        assert_eq!(manager.load_all().await.unwrap(), 0);
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("telegram:123"), "telegram%3A123");
        assert_eq!(sanitize_key("a/b\\c"), "a%2Fb%5Cc");
        assert_eq!(sanitize_key("100%"), "100%25");
        assert_eq!(sanitize_key("plain"), "plain");
    }

    #[tokio::test]
    async fn test_clone_shares_table() {
        let manager = SessionManager::new_memory();
        let clone = manager.clone();
        manager.get_or_create("shared").await;
        assert!(clone.get("shared").await.is_some());
    }
}
