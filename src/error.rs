//! Error types for Picobot
//!
//! One crate-wide error enum built with `thiserror`. Tool failures are
//! rendered into model-visible text by the agent loop, so their `Display`
//! output matters as much as the variant itself.

use thiserror::Error;

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for Picobot operations.
#[derive(Error, Debug)]
pub enum PicoError {
    /// Configuration-related errors (unreadable file, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors (transport failures, non-success status, malformed responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool execution errors (invalid arguments, execution failures)
    #[error("{0}")]
    Tool(String),

    /// Requested tool is not registered
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Channel errors (routing, adapter failures)
    #[error("Channel error: {0}")]
    Channel(String),

    /// A bounded bus queue had no free capacity
    #[error("{0} buffer full")]
    BusFull(String),

    /// Message bus channel closed
    #[error("Bus error: channel closed")]
    BusClosed,

    /// Session persistence errors
    #[error("Session error: {0}")]
    Session(String),

    /// Note store errors
    #[error("Memory error: {0}")]
    Memory(String),

    /// A deadline elapsed
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PicoError {
    /// Returns `true` when a non-blocking publish found the queue full.
    pub fn is_bus_full(&self) -> bool {
        matches!(self, PicoError::BusFull(_))
    }
}

/// A specialized `Result` type for Picobot operations.
pub type Result<T> = std::result::Result<T, PicoError>;
