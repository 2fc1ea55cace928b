//! Providers module - LLM backends behind one trait
//!
//! Each backend implements [`LLMProvider`]; the agent loop only ever sees
//! the normalized [`Message`], [`ToolDefinition`] and [`LLMResponse`] types.
//!
//! # Example
//!
//! ```
//! use picobot::providers::{LLMProvider, Message, StubProvider};
//!
//! # tokio_test::block_on(async {
//! let provider = StubProvider::new();
//! let response = provider.chat(&[Message::user("Hello!")], &[], "").await.unwrap();
//! assert_eq!(response.content, "(stub) Echo: Hello!");
//! # });
//! ```

pub mod openai;
pub mod stub;
mod types;

use std::sync::Arc;

use tracing::info;

use crate::config::Config;

pub use openai::OpenAIProvider;
pub use stub::StubProvider;
pub use types::{LLMProvider, LLMResponse, Message, Role, ToolCall, ToolDefinition};

/// Build the provider selected by configuration.
///
/// An OpenAI-compatible provider when an API key is set, the echoing stub
/// otherwise.
pub fn provider_from_config(config: &Config) -> Arc<dyn LLMProvider> {
    let openai = &config.providers.openai;
    match openai.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let base = openai.api_base.as_deref().unwrap_or(openai::OPENAI_API_URL);
            info!(provider = "openai", api_base = %base, "Using OpenAI-compatible provider");
            Arc::new(OpenAIProvider::with_base_url(key, base))
        }
        _ => {
            info!(provider = "stub", "No API key configured, using stub provider");
            Arc::new(StubProvider::new())
        }
    }
}
