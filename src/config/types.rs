//! Configuration type definitions for Picobot
//!
//! Every struct is `#[serde(default)]`, so a partial file fills the gaps with
//! the defaults defined here.

use serde::{Deserialize, Serialize};

/// Main configuration struct for Picobot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent configuration (workspace, model, iterations)
    pub agents: AgentConfig,
    /// LLM provider configurations
    pub providers: ProvidersConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Capacity of each message bus queue
    pub bus_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agents: AgentConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Agent configuration container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Default agent settings
    pub defaults: AgentDefaults,
}

/// Default agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Workspace directory path (`~/` is expanded)
    pub workspace: String,
    /// Model to use; empty selects the provider default
    pub model: String,
    /// Maximum provider calls per turn
    pub max_tool_iterations: usize,
    /// Seconds between heartbeat checks
    pub heartbeat_interval_secs: u64,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            workspace: "~/.picobot/workspace".to_string(),
            model: String::new(),
            max_tool_iterations: 20,
            heartbeat_interval_secs: 60,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// LLM provider configurations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// OpenAI-compatible endpoint (OpenAI, OpenRouter, Ollama, vLLM, ...)
    pub openai: ProviderConfig,
}

/// Generic provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key for authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output
    #[default]
    Compact,
    /// Multi-line human-readable output
    Pretty,
    /// JSON lines for log aggregators
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
    /// Append logs to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            file: None,
        }
    }
}

/// Default bus queue capacity.
pub const DEFAULT_BUS_CAPACITY: usize = 200;

impl Config {
    /// Bus capacity, never zero.
    pub fn bus_capacity(&self) -> usize {
        if self.bus_capacity == 0 {
            DEFAULT_BUS_CAPACITY
        } else {
            self.bus_capacity
        }
    }
}
