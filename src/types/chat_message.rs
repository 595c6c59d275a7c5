use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The local user.
    Human,

    /// The assistant, as decoded from the response stream.
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::Human => write!(f, "human"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Delivery state of a message.
///
/// Assistant messages are always `Sent`: they only exist once a frame
/// carrying them was applied. Human messages move from `Pending` through
/// `Streaming` to one of the terminal states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum MessageStatus {
    /// Appended locally, waiting for the send gate or the session.
    Pending,

    /// Submitted; the response stream is being applied.
    Streaming,

    /// Delivered and the response stream completed.
    Sent,

    /// The send failed; the reason is shown next to the message.
    Failed(String),

    /// The send was cancelled before its stream completed.
    Cancelled,
}

impl MessageStatus {
    /// Returns true once the message will not change state on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MessageStatus::Sent | MessageStatus::Failed(_) | MessageStatus::Cancelled
        )
    }

    /// Returns true if the user may retry the message.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MessageStatus::Failed(_) | MessageStatus::Cancelled)
    }
}

/// A single entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author of the message.
    pub role: MessageRole,

    /// The message text.
    pub content: String,

    /// Delivery state.
    pub status: MessageStatus,
}

impl ChatMessage {
    /// Create a pending human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Human,
            content: content.into(),
            status: MessageStatus::Pending,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            status: MessageStatus::Sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn role_serialization() {
        assert_eq!(to_value(MessageRole::Human).unwrap(), json!("human"));
        assert_eq!(to_value(MessageRole::Assistant).unwrap(), json!("assistant"));
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn constructors() {
        let human = ChatMessage::human("Write a README");
        assert_eq!(human.role, MessageRole::Human);
        assert_eq!(human.status, MessageStatus::Pending);

        let assistant = ChatMessage::assistant("Sure");
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert_eq!(assistant.status, MessageStatus::Sent);
    }

    #[test]
    fn status_serialization() {
        let message = ChatMessage {
            role: MessageRole::Human,
            content: "hi".to_string(),
            status: MessageStatus::Failed("HTTP 500".to_string()),
        };
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "role": "human",
                "content": "hi",
                "status": {"state": "failed", "reason": "HTTP 500"}
            })
        );
        assert_eq!(
            to_value(MessageStatus::Sent).unwrap(),
            json!({"state": "sent"})
        );
    }

    #[test]
    fn status_predicates() {
        assert!(!MessageStatus::Pending.is_terminal());
        assert!(!MessageStatus::Streaming.is_terminal());
        assert!(MessageStatus::Sent.is_terminal());
        assert!(MessageStatus::Cancelled.is_retryable());
        assert!(MessageStatus::Failed("x".to_string()).is_retryable());
        assert!(!MessageStatus::Sent.is_retryable());
    }
}
