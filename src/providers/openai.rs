//! OpenAI-compatible provider
//!
//! Talks to any endpoint implementing the Chat Completions API (OpenAI,
//! OpenRouter, local gateways). Tool-call arguments stay JSON strings end to
//! end; the agent loop parses them.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PicoError, Result};

use super::{LLMProvider, LLMResponse, Message, Role, ToolCall, ToolDefinition};

/// Default API base when none is configured.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

const DEFAULT_MODEL: &str = "gpt-4o-mini";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    r#type: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    r#type: &'static str,
    function: WireFunctionDef<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Provider
// ============================================================================

/// Provider for OpenAI-compatible Chat Completions endpoints.
pub struct OpenAIProvider {
    api_key: String,
    api_base: String,
    client: Client,
}

impl OpenAIProvider {
    /// Create a provider against the public OpenAI endpoint.
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, OPENAI_API_URL)
    }

    /// Create a provider against a custom base URL. A trailing slash is ignored.
    pub fn with_base_url(api_key: &str, api_base: &str) -> Self {
        Self::with_client(api_key, api_base, Client::new())
    }

    /// Create a provider with a preconfigured HTTP client.
    pub fn with_client(api_key: &str, api_base: &str, client: Client) -> Self {
        let api_base = if api_base.trim().is_empty() {
            OPENAI_API_URL
        } else {
            api_base.trim_end_matches('/')
        };
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.to_string(),
            client,
        }
    }
}

fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn convert_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
    messages
        .iter()
        .map(|msg| {
            let tool_calls = msg.tool_calls.as_ref().map(|tcs| {
                tcs.iter()
                    .map(|tc| WireToolCall {
                        id: &tc.id,
                        r#type: "function",
                        function: WireFunctionCall {
                            name: &tc.name,
                            arguments: &tc.arguments,
                        },
                    })
                    .collect::<Vec<_>>()
            });

            // Assistant turns carrying only tool calls send a null content.
            let content = if msg.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(msg.content.as_str())
            };

            WireMessage {
                role: role_str(&msg.role),
                content,
                tool_calls,
                tool_call_id: msg.tool_call_id.as_deref(),
            }
        })
        .collect()
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<WireTool<'_>> {
    tools
        .iter()
        .map(|t| WireTool {
            r#type: "function",
            function: WireFunctionDef {
                name: &t.name,
                description: &t.description,
                parameters: &t.parameters,
            },
        })
        .collect()
}

fn convert_response(response: ChatResponse) -> LLMResponse {
    let Some(choice) = response.choices.into_iter().next() else {
        return LLMResponse::text("");
    };

    let content = choice.message.content.unwrap_or_default();
    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| {
            let arguments = if tc.function.arguments.trim().is_empty() {
                "{}".to_string()
            } else {
                tc.function.arguments
            };
            ToolCall::new(&tc.id, &tc.function.name, &arguments)
        })
        .collect();

    LLMResponse::with_tools(&content, tool_calls)
}

/// Prefer the structured `error.message` when the body carries one.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Error for a non-success HTTP status.
fn status_error(status: u16, body: &str) -> PicoError {
    PicoError::Provider(format!("{}: {}", status, error_detail(body)))
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
    ) -> Result<LLMResponse> {
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };
        let request = ChatRequest {
            model,
            messages: convert_messages(messages),
            tools: convert_tools(tools),
        };

        debug!(
            model = %model,
            messages = messages.len(),
            tools = tools.len(),
            "OpenAI chat request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PicoError::Provider(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PicoError::Provider(format!("failed to parse response: {}", e)))?;

        Ok(convert_response(parsed))
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn name(&self) -> &str {
        "openai"
    }
}
