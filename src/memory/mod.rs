//! Workspace note store (markdown memory).
//!
//! Layout under `<workspace>/memory/`:
//! - `YYYY-MM-DD.md`: one file of bullet notes per local day
//! - `MEMORY.md`: long-term memory, rewritten as a whole
//!
//! Everything is plain text. Missing files read as empty.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PicoError, Result};

/// File name of the long-term memory document.
pub const LONG_TERM_FILE: &str = "MEMORY.md";

/// A retrievable note used when assembling prompt context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// `short` for daily notes, `long` for long-term memory
    pub kind: String,
    pub text: String,
}

impl MemoryItem {
    pub fn new(kind: &str, text: &str) -> Self {
        Self {
            kind: kind.to_string(),
            text: text.to_string(),
        }
    }
}

/// Orders memory items by relevance to a query.
pub trait Ranker: Send + Sync {
    fn rank(&self, query: &str, items: &[MemoryItem], top_k: usize) -> Vec<MemoryItem>;
}

/// Word-overlap ranker. Ties keep their original order.
#[derive(Debug, Default, Clone)]
pub struct SimpleRanker;

impl SimpleRanker {
    pub fn new() -> Self {
        Self
    }
}

impl Ranker for SimpleRanker {
    fn rank(&self, query: &str, items: &[MemoryItem], top_k: usize) -> Vec<MemoryItem> {
        let words: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
            .map(str::to_lowercase)
            .collect();

        let mut scored: Vec<(usize, &MemoryItem)> = items
            .iter()
            .map(|item| {
                let text = item.text.to_lowercase();
                let score = words.iter().filter(|w| text.contains(w.as_str())).count();
                (score, item)
            })
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(top_k)
            .map(|(_, item)| item.clone())
            .collect()
    }
}

/// File-backed note store rooted at `<workspace>/memory`.
#[derive(Debug, Clone)]
pub struct NoteStore {
    dir: PathBuf,
}

impl NoteStore {
    /// Create a store for `workspace`. The directory is created lazily on write.
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            dir: workspace.as_ref().join("memory"),
        }
    }

    /// Directory holding the note files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn day_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.md", day.format("%Y-%m-%d")))
    }

    fn today_path(&self) -> PathBuf {
        self.day_path(Local::now().date_naive())
    }

    fn long_term_path(&self) -> PathBuf {
        self.dir.join(LONG_TERM_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PicoError::Memory(format!("cannot create {}: {}", self.dir.display(), e))
        })
    }

    /// Append one bullet line to today's note.
    pub fn append_today(&self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PicoError::Memory("note text is empty".into()));
        }
        self.ensure_dir()?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.today_path())?;
        writeln!(file, "- {}", text)?;
        Ok(())
    }

    /// Today's note, empty if none has been written.
    pub fn read_today(&self) -> Result<String> {
        read_or_empty(&self.today_path())
    }

    /// Long-term memory, empty if the file does not exist.
    pub fn read_long_term(&self) -> Result<String> {
        read_or_empty(&self.long_term_path())
    }

    /// Replace long-term memory with `text`.
    pub fn write_long_term(&self, text: &str) -> Result<()> {
        self.ensure_dir()?;
        fs::write(self.long_term_path(), text)?;
        Ok(())
    }

    /// Append a paragraph to long-term memory.
    pub fn append_long_term(&self, text: &str) -> Result<()> {
        let current = self.read_long_term()?;
        let updated = if current.trim().is_empty() {
            text.to_string()
        } else {
            format!("{}\n{}", current.trim_end(), text)
        };
        self.write_long_term(&updated)
    }

    /// Up to `n` recent items: newest daily notes first, then long-term lines.
    pub fn recent(&self, n: usize) -> Vec<MemoryItem> {
        if n == 0 {
            return Vec::new();
        }
        let mut items: Vec<MemoryItem> = self
            .read_today()
            .unwrap_or_default()
            .lines()
            .rev()
            .filter_map(note_line)
            .map(|t| MemoryItem::new("short", t))
            .take(n)
            .collect();

        if items.len() < n {
            let remaining = n - items.len();
            items.extend(
                self.read_long_term()
                    .unwrap_or_default()
                    .lines()
                    .filter_map(note_line)
                    .take(remaining)
                    .map(|t| MemoryItem::new("long", t)),
            );
        }
        items
    }

    /// Concatenated notes for the last `days` days, newest first, each under
    /// a `## YYYY-MM-DD` heading. Days without notes are omitted.
    pub fn recent_days(&self, days: usize) -> Result<String> {
        let today = Local::now().date_naive();
        let mut sections = Vec::new();
        for offset in 0..days.max(1) {
            let day = today - Duration::days(offset as i64);
            let content = read_or_empty(&self.day_path(day))?;
            if !content.trim().is_empty() {
                sections.push(format!("## {}\n{}", day.format("%Y-%m-%d"), content.trim_end()));
            }
        }
        Ok(sections.join("\n\n"))
    }

    /// Long-term memory and today's notes formatted for prompt injection.
    pub fn memory_context(&self) -> Result<String> {
        let long_term = self.read_long_term()?;
        let today = self.read_today()?;

        let mut parts = Vec::new();
        if !long_term.trim().is_empty() {
            parts.push(format!("## Long-term memory\n{}", long_term.trim()));
        }
        if !today.trim().is_empty() {
            parts.push(format!("## Today's notes\n{}", today.trim()));
        }
        Ok(parts.join("\n\n"))
    }
}

fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Strip bullet markers; skip blank lines and headings.
fn note_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line)
        .trim();
    (!line.is_empty()).then_some(line)
}
