//! Offline provider that echoes the most recent user message.

use async_trait::async_trait;

use crate::error::Result;

use super::{LLMProvider, LLMResponse, Message, Role, ToolDefinition};

/// Provider used when no API key is configured. Never calls tools.
#[derive(Debug, Default, Clone)]
pub struct StubProvider;

impl StubProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LLMProvider for StubProvider {
    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
        _model: &str,
    ) -> Result<LLMResponse> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if last_user.is_empty() {
            return Ok(LLMResponse::text("(stub) Hello from StubProvider"));
        }
        Ok(LLMResponse::text(&format!("(stub) Echo: {}", last_user)))
    }

    fn default_model(&self) -> &str {
        "stub-model"
    }

    fn name(&self) -> &str {
        "stub"
    }
}
