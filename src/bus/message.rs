//! Message types carried by the bus
//!
//! Channel adapters and the scheduler produce `InboundMessage`s; the agent
//! loop and tools produce `OutboundMessage`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message arriving from a channel adapter or a synthetic producer
/// (scheduler, heartbeat).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The channel this message came from (e.g., "telegram", "cli")
    pub channel: String,
    /// Unique identifier of the sender
    pub sender_id: String,
    /// Unique identifier of the chat/conversation
    pub chat_id: String,
    /// The text content of the message
    pub content: String,
    /// When the message was produced
    pub timestamp: DateTime<Utc>,
    /// Media references (URLs or local paths)
    #[serde(default)]
    pub media: Vec<String>,
    /// Additional metadata key-value pairs
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A reply headed back to a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The channel to send this message through
    pub channel: String,
    /// The chat/conversation to send to
    pub chat_id: String,
    /// The text content to send
    pub content: String,
    /// Optional message ID to reply to
    pub reply_to: Option<String>,
    /// Media references to attach
    #[serde(default)]
    pub media: Vec<String>,
    /// Additional metadata key-value pairs
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    /// Creates a new inbound message stamped with the current time.
    ///
    /// # Example
    /// ```
    /// use picobot::bus::message::InboundMessage;
    ///
    /// let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello, bot!");
    /// assert_eq!(msg.session_key(), "telegram:chat456");
    /// ```
    pub fn new(channel: &str, sender_id: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
            media: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Adds a media reference (builder pattern).
    pub fn with_media(mut self, media: &str) -> Self {
        self.media.push(media.to_string());
        self
    }

    /// Adds a metadata key-value pair (builder pattern).
    ///
    /// # Example
    /// ```
    /// use picobot::bus::message::InboundMessage;
    ///
    /// let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello")
    ///     .with_metadata("message_id", "12345");
    /// assert_eq!(msg.metadata.get("message_id"), Some(&"12345".to_string()));
    /// ```
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Session key for this conversation (`channel:chat_id`).
    pub fn session_key(&self) -> String {
        format!("{}:{}", self.channel, self.chat_id)
    }

    /// Checks if this message has any media attached.
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

impl OutboundMessage {
    /// Creates a new outbound message.
    pub fn new(channel: &str, chat_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            chat_id: chat_id.to_string(),
            content: content.to_string(),
            reply_to: None,
            media: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Sets the message ID to reply to (builder pattern).
    pub fn with_reply(mut self, message_id: &str) -> Self {
        self.reply_to = Some(message_id.to_string());
        self
    }

    /// Adds a media reference (builder pattern).
    pub fn with_media(mut self, media: &str) -> Self {
        self.media.push(media.to_string());
        self
    }

    /// Creates an outbound message addressed back to the origin of `msg`.
    ///
    /// # Example
    /// ```
    /// use picobot::bus::message::{InboundMessage, OutboundMessage};
    ///
    /// let inbound = InboundMessage::new("telegram", "user123", "chat456", "Hello");
    /// let response = OutboundMessage::reply_to(&inbound, "Hello back!");
    /// assert_eq!(response.chat_id, "chat456");
    /// ```
    pub fn reply_to(msg: &InboundMessage, content: &str) -> Self {
        let mut out = Self::new(&msg.channel, &msg.chat_id, content);
        if let Some(id) = msg.metadata.get("message_id") {
            out.reply_to = Some(id.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_message_creation() {
        let before = Utc::now();
        let msg = InboundMessage::new("telegram", "user123", "chat456", "Hello");
        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.sender_id, "user123");
        assert_eq!(msg.chat_id, "chat456");
        assert_eq!(msg.content, "Hello");
        assert_eq!(msg.session_key(), "telegram:chat456");
        assert!(msg.timestamp >= before);
        assert!(!msg.has_media());
        assert!(msg.metadata.is_empty());
    }

    #[test]
    fn test_inbound_message_with_media() {
        let msg = InboundMessage::new("discord", "user1", "channel1", "Check this")
            .with_media("https://example.com/image.png");

        assert!(msg.has_media());
        assert_eq!(msg.media, vec!["https://example.com/image.png".to_string()]);
    }

    #[test]
    fn test_outbound_message_creation() {
        let msg = OutboundMessage::new("telegram", "chat456", "Response");
        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.content, "Response");
        assert!(msg.reply_to.is_none());
        assert!(msg.media.is_empty());
    }

    #[test]
    fn test_outbound_reply_to_inbound() {
        let inbound = InboundMessage::new("telegram", "user123", "chat456", "Hello")
            .with_metadata("message_id", "42");
        let response = OutboundMessage::reply_to(&inbound, "Hello back!");

        assert_eq!(response.channel, "telegram");
        assert_eq!(response.chat_id, "chat456");
        assert_eq!(response.content, "Hello back!");
        assert_eq!(response.reply_to.as_deref(), Some("42"));
    }

    #[test]
    fn test_message_deserializes_without_optional_fields() {
        let json = r#"{
            "channel": "telegram",
            "sender_id": "u",
            "chat_id": "c",
            "content": "hi",
            "timestamp": "2024-01-01T00:00:00Z"
        }"#;
        let msg: InboundMessage = serde_json::from_str(json).expect("Failed to deserialize");
        assert!(msg.media.is_empty());
        assert!(msg.metadata.is_empty());
    }
}
