use serde::{Deserialize, Serialize};

/// Body of a message-submit request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCreateParams {
    /// The human message text.
    pub content: String,

    /// The document artifact as it stood when the message was sent.
    ///
    /// Omitted from the wire when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub artifact: String,
}

impl MessageCreateParams {
    /// Create a new `MessageCreateParams`.
    pub fn new(content: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            artifact: artifact.into(),
        }
    }
}
