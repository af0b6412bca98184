use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receiver id that matches every subscriber on the broker.
pub const WILDCARD_RECEIVER: &str = "*";

/// Kind of message exchanged between the orchestrator and agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A request expecting a correlated response.
    Request,
    /// A reply to a request, threaded by conversation id.
    Response,
    /// A one-way informational message.
    Notification,
    /// An error reply to a request.
    Error,
    /// A task dispatched by the orchestrator to its assigned agent.
    TaskExecution,
}

impl MessageType {
    /// Whether a message of this type expects a correlated reply.
    pub fn expects_reply(&self) -> bool {
        matches!(self, MessageType::Request | MessageType::TaskExecution)
    }
}

/// A message exchanged between agents or components. Immutable once created;
/// the broker appends every published message to its history log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    pub message_id: Uuid,
    /// Id of the sender.
    pub sender_id: String,
    /// Id of the receiver, or [`WILDCARD_RECEIVER`].
    pub receiver_id: String,
    /// Opaque structured payload.
    pub content: serde_json::Value,
    /// Kind of message.
    pub message_type: MessageType,
    /// Correlation key threading a request to its reply.
    pub conversation_id: Uuid,
    /// UTC timestamp of creation.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message opening a fresh conversation.
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: serde_json::Value,
        message_type: MessageType,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            content,
            message_type,
            conversation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a [`MessageType::Request`] message.
    pub fn request(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self::new(sender_id, receiver_id, content, MessageType::Request)
    }

    /// Creates a [`MessageType::Notification`] message.
    pub fn notification(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self::new(sender_id, receiver_id, content, MessageType::Notification)
    }

    /// Creates a [`MessageType::TaskExecution`] message.
    pub fn task_execution(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self::new(sender_id, receiver_id, content, MessageType::TaskExecution)
    }

    /// Creates a [`MessageType::Response`] reply to `original`, addressed to
    /// its sender and carrying the same conversation id.
    pub fn response_to(
        original: &Message,
        sender_id: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            receiver_id: original.sender_id.clone(),
            content,
            message_type: MessageType::Response,
            conversation_id: original.conversation_id,
            timestamp: Utc::now(),
        }
    }

    /// Creates a [`MessageType::Error`] reply to `original`, addressed to its
    /// sender and carrying the same conversation id.
    pub fn error_to(
        original: &Message,
        sender_id: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            sender_id: sender_id.into(),
            receiver_id: original.sender_id.clone(),
            content,
            message_type: MessageType::Error,
            conversation_id: original.conversation_id,
            timestamp: Utc::now(),
        }
    }
}
