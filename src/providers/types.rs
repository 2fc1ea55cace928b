//! Provider types for Picobot
//!
//! The `LLMProvider` trait and the normalized message, tool-definition and
//! response types every provider translates to and from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Definition of a tool exposed to the model as a callable function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The unique name of the tool
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    ///
    /// # Example
    /// ```
    /// use picobot::providers::ToolDefinition;
    /// use serde_json::json;
    ///
    /// let tool = ToolDefinition::new(
    ///     "web",
    ///     "Fetch a URL",
    ///     json!({"type": "object", "properties": {"url": {"type": "string"}}}),
    /// );
    /// assert_eq!(tool.name, "web");
    /// ```
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Role of a message participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned call identifier
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments as a JSON string
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    /// Parse the arguments into a specific type.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.arguments)
    }
}

/// A single message in the prompt sent to the model.
///
/// Rebuilt every turn; never persisted verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: &str) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    pub fn system(content: &str) -> Self {
        Self::with_role(Role::System, content)
    }

    /// A tool result answering the call with `tool_call_id`.
    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// An assistant message that carries tool calls.
    pub fn assistant_with_tools(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::with_role(Role::Assistant, content)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|tc| !tc.is_empty())
            .unwrap_or(false)
    }
}

/// Normalized response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Text content (may be empty when tool calls are present)
    pub content: String,
    /// Tool calls in the order the model returned them
    pub tool_calls: Vec<ToolCall>,
}

impl LLMResponse {
    /// A text-only response that ends a turn.
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_calls: vec![],
        }
    }

    /// A response requesting tool calls.
    pub fn with_tools(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.to_string(),
            tool_calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Trait implemented by every LLM backend.
///
/// Providers must accept an empty tool list and must be able to return a
/// response without tool calls to terminate a turn. Retries, if any, are the
/// provider's business; the agent loop never retries a failed call.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send one chat completion request.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
    ) -> Result<LLMResponse>;

    /// Model used when none is configured.
    fn default_model(&self) -> &str;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_response_text() {
        let response = LLMResponse::text("Hello, world!");
        assert_eq!(response.content, "Hello, world!");
        assert!(!response.has_tool_calls());
    }

    #[test]
    fn test_llm_response_with_tools() {
        let call = ToolCall::new("call_1", "web", r#"{"url": "https://example.com"}"#);
        let response = LLMResponse::with_tools("", vec![call]);

        assert!(response.has_tool_calls());
        assert_eq!(response.tool_calls[0].name, "web");
    }

    #[test]
    fn test_tool_call_parse_arguments() {
        #[derive(Deserialize)]
        struct Args {
            url: String,
        }

        let call = ToolCall::new("call_1", "web", r#"{"url": "https://example.com"}"#);
        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.url, "https://example.com");
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi").role, Role::User);
        assert_eq!(Message::system("s").role, Role::System);

        let result = Message::tool_result("call_1", "sent");
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));

        let with_tools =
            Message::assistant_with_tools("", vec![ToolCall::new("c", "message", "{}")]);
        assert!(with_tools.has_tool_calls());
        assert!(!Message::assistant("done").has_tool_calls());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("ok")).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        assert!(!json.contains("tool_calls"));
        assert_eq!(Role::Tool.to_string(), "tool");
    }

    #[test]
    fn test_tool_definition_serialization() {
        let def = ToolDefinition::new("spawn", "Spawn a subagent", serde_json::json!({}));
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains("\"name\":\"spawn\""));
    }
}
