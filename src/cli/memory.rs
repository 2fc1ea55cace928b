//! Memory CLI command handlers.

use anyhow::{bail, Context, Result};

use picobot::memory::NoteStore;

use super::{load_config, MemoryAction, MemoryTarget};

pub(crate) fn cmd_memory(action: MemoryAction) -> Result<()> {
    let config = load_config(None)?;
    let store = NoteStore::new(config.workspace_path());
    run_action(&store, action)
}

fn run_action(store: &NoteStore, action: MemoryAction) -> Result<()> {
    match action {
        MemoryAction::Read { target } => {
            let content = match target {
                MemoryTarget::Today => store.read_today(),
                MemoryTarget::Long => store.read_long_term(),
            }
            .with_context(|| "Failed to read memory")?;

            if content.trim().is_empty() {
                println!("(empty)");
            } else {
                println!("{}", content.trim_end());
            }
        }
        MemoryAction::Append { target, content } => {
            match target {
                MemoryTarget::Today => store.append_today(&content),
                MemoryTarget::Long => store.append_long_term(&content),
            }
            .with_context(|| "Failed to append to memory")?;
            println!("Appended.");
        }
        MemoryAction::Write { target, content } => {
            if target != MemoryTarget::Long {
                bail!("only long-term memory can be rewritten (use 'append' for today)");
            }
            store
                .write_long_term(&content)
                .with_context(|| "Failed to write long-term memory")?;
            println!("Long-term memory updated.");
        }
        MemoryAction::Recent { days } => {
            let notes = store
                .recent_days(days)
                .with_context(|| "Failed to read recent notes")?;
            if notes.trim().is_empty() {
                println!("No notes in the last {} day(s).", days);
            } else {
                println!("{}", notes.trim_end());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_then_read_long() {
        let dir = TempDir::new().unwrap();
        let store = NoteStore::new(dir.path());
        run_action(
            &store,
            MemoryAction::Append {
                target: MemoryTarget::Long,
                content: "likes tea".into(),
            },
        )
        .unwrap();
        assert!(store.read_long_term().unwrap().contains("likes tea"));
    }

    #[test]
    fn test_write_today_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = NoteStore::new(dir.path());
        let result = run_action(
            &store,
            MemoryAction::Write {
                target: MemoryTarget::Today,
                content: "x".into(),
            },
        );
        assert!(result.is_err());
    }
}
