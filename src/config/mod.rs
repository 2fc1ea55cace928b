//! Configuration management for Picobot
//!
//! Configuration is loaded from `~/.picobot/config.json` with environment
//! variable overrides. `onboard` writes a default file and bootstraps the
//! workspace.

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PicoError, Result};

/// Workspace bootstrap files and their initial content.
const WORKSPACE_TEMPLATES: &[(&str, &str)] = &[
    (
        "AGENTS.md",
        "# Agents\n\nYou are Picobot, a personal assistant. Keep answers short, use tools when they help, and tell the user what you did.\n",
    ),
    (
        "SOUL.md",
        "# Soul\n\nFriendly, direct and honest. Admit when you do not know something.\n",
    ),
    (
        "USER.md",
        "# User\n\nNotes about the user go here (name, timezone, preferences).\n",
    ),
    (
        "TOOLS.md",
        "# Tools\n\n- `message`: send a message to the current chat\n- `filesystem`: read, write and list files in the workspace\n- `exec`: run a program given as an argument array\n- `web`: fetch a URL\n- `cron`: schedule reminders (`add`, `list`, `cancel`)\n- `write_memory`: store notes for today or long-term memory\n- `create_skill`, `list_skills`, `read_skill`, `delete_skill`: manage skills\n",
    ),
    (
        "HEARTBEAT.md",
        "# Heartbeat\n\nTasks listed here are reviewed periodically. Leave the file empty to disable.\n",
    ),
    (
        "memory/MEMORY.md",
        "# Long-term memory\n\n",
    ),
];

const EXAMPLE_SKILL: &str = "---\nname: example\ndescription: Template showing how a skill is written\n---\n\n# Example skill\n\nDescribe when the skill applies and the steps to follow.\n";

impl Config {
    /// Returns the Picobot configuration directory path (~/.picobot)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".picobot")
    }

    /// Returns the path to the config file (~/.picobot/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                PicoError::Config(format!("invalid config {}: {}", path.display(), e))
            })?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = get("PICOBOT_MODEL") {
            self.agents.defaults.model = val;
        }
        if let Some(val) = get("PICOBOT_WORKSPACE") {
            self.agents.defaults.workspace = val;
        }
        if let Some(val) = get("PICOBOT_MAX_TOOL_ITERATIONS") {
            if let Ok(v) = val.trim().parse() {
                self.agents.defaults.max_tool_iterations = v;
            }
        }
        if let Some(val) = get("PICOBOT_OPENAI_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.providers.openai.api_key = Some(val);
        }
        if let Some(val) = get("PICOBOT_OPENAI_API_BASE") {
            self.providers.openai.api_base = Some(val);
        }
        if let Some(val) = get("PICOBOT_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Save configuration to a specific path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the expanded workspace path (resolves ~ to home directory)
    pub fn workspace_path(&self) -> PathBuf {
        expand_home(&self.agents.defaults.workspace)
    }

    /// Write a default config if none exists and bootstrap the workspace.
    ///
    /// Returns the config path and workspace path.
    pub fn onboard() -> Result<(PathBuf, PathBuf)> {
        Self::onboard_at(&Self::path())
    }

    /// [`onboard`](Self::onboard) against an explicit config path.
    pub fn onboard_at(path: &Path) -> Result<(PathBuf, PathBuf)> {
        let config = if path.exists() {
            Self::load_from_path(path)?
        } else {
            let config = Config::default();
            config.save(path)?;
            info!(path = %path.display(), "Wrote default config");
            config
        };

        let workspace = config.workspace_path();
        initialize_workspace(&workspace)?;
        Ok((path.to_path_buf(), workspace))
    }
}

/// Create the workspace layout. Existing files are left untouched.
pub fn initialize_workspace(workspace: &Path) -> Result<()> {
    std::fs::create_dir_all(workspace)?;

    for (name, content) in WORKSPACE_TEMPLATES {
        let path = workspace.join(name);
        if path.exists() {
            continue;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        debug!(path = %path.display(), "Created workspace file");
    }

    let example = workspace.join("skills").join("example");
    std::fs::create_dir_all(&example)?;
    let skill_file = example.join("SKILL.md");
    if !skill_file.exists() {
        std::fs::write(skill_file, EXAMPLE_SKILL)?;
    }

    Ok(())
}

/// Expand ~ to home directory in a path string
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.agents.defaults.workspace, "~/.picobot/workspace");
        assert!(config.agents.defaults.model.is_empty());
        assert_eq!(config.agents.defaults.max_tool_iterations, 20);
        assert_eq!(config.agents.defaults.heartbeat_interval_secs, 60);
        assert_eq!(config.bus_capacity, 200);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.providers.openai.api_key.is_none());
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{"agents": {"defaults": {"model": "gpt-4o"}}, "providers": {"openai": {"api_key": "sk-x"}}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.agents.defaults.model, "gpt-4o");
        assert_eq!(config.agents.defaults.max_tool_iterations, 20);
        assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-x"));
        assert_eq!(config.bus_capacity(), 200);
    }

    #[test]
    fn test_logging_format_deserialize() {
        let cfg: LoggingConfig = serde_json::from_str(r#"{"format":"json","level":"debug"}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.level, "debug");

        let cfg: LoggingConfig = serde_json::from_str(r#"{"format":"pretty"}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::Pretty);
        assert_eq!(cfg.level, "info");
        assert!(cfg.file.is_none());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PICOBOT_MODEL", "test-model"),
            ("PICOBOT_MAX_TOOL_ITERATIONS", "7"),
            ("OPENAI_API_KEY", "sk-fallback"),
            ("PICOBOT_OPENAI_API_BASE", "http://localhost:11434/v1"),
            ("PICOBOT_WORKSPACE", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.agents.defaults.model, "test-model");
        assert_eq!(config.agents.defaults.max_tool_iterations, 7);
        assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(
            config.providers.openai.api_base.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(config.agents.defaults.workspace, "~/.picobot/workspace");
    }

    #[test]
    fn test_prefixed_key_wins_over_fallback() {
        let mut config = Config::default();
        config.apply_overrides_from(|k| match k {
            "PICOBOT_OPENAI_API_KEY" => Some("sk-primary".into()),
            "OPENAI_API_KEY" => Some("sk-fallback".into()),
            _ => None,
        });
        assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-primary"));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/ws"), home.join("ws"));
            assert_eq!(expand_home("~"), home);
        }
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel"), PathBuf::from("rel"));
    }

    #[test]
    fn test_config_path() {
        assert!(Config::path().ends_with(".picobot/config.json"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.agents.defaults.workspace = dir.path().to_string_lossy().to_string();
        config.bus_capacity = 32;
        config.save(&path).unwrap();

        let raw: Config =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.bus_capacity, 32);
        assert_eq!(raw.agents.defaults.workspace, config.agents.defaults.workspace);
    }

    #[test]
    fn test_load_invalid_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(PicoError::Config(_))
        ));
    }

    #[test]
    fn test_initialize_workspace_creates_files() {
        let dir = TempDir::new().unwrap();
        initialize_workspace(dir.path()).unwrap();

        for name in [
            "AGENTS.md",
            "SOUL.md",
            "USER.md",
            "TOOLS.md",
            "HEARTBEAT.md",
            "memory/MEMORY.md",
            "skills/example/SKILL.md",
        ] {
            let content = std::fs::read_to_string(dir.path().join(name)).unwrap();
            assert!(!content.is_empty(), "{name} should not be empty");
        }
    }

    #[test]
    fn test_initialize_workspace_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("SOUL.md"), "custom").unwrap();
        initialize_workspace(dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("SOUL.md")).unwrap(),
            "custom"
        );
    }

    #[test]
    fn test_onboard_at_writes_config_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let workspace = dir.path().join("ws");

        let mut seeded = Config::default();
        seeded.agents.defaults.workspace = workspace.to_string_lossy().to_string();
        seeded.save(&path).unwrap();

        let (cfg_path, ws) = Config::onboard_at(&path).unwrap();
        assert_eq!(cfg_path, path);
        assert!(ws.join("HEARTBEAT.md").exists());
    }
}
