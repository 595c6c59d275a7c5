use serde::{Deserialize, Serialize};

/// One decoded unit of a message response stream.
///
/// Both fields are optional; the server also sends empty strings for the
/// field it has nothing new for, so consumers should go through
/// [`StreamFrame::message_text`] and [`StreamFrame::artifact_text`], which
/// treat an empty string as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Assistant text to append as a new message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Full replacement for the document artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

impl StreamFrame {
    /// A frame carrying only assistant text.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            artifact: None,
        }
    }

    /// A frame carrying only an artifact replacement.
    pub fn artifact(artifact: impl Into<String>) -> Self {
        Self {
            message: None,
            artifact: Some(artifact.into()),
        }
    }

    /// The assistant text, if present and non-empty.
    pub fn message_text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    /// The artifact replacement, if present and non-empty.
    pub fn artifact_text(&self) -> Option<&str> {
        self.artifact.as_deref().filter(|a| !a.is_empty())
    }

    /// Returns true if applying this frame changes nothing.
    pub fn is_empty(&self) -> bool {
        self.message_text().is_none() && self.artifact_text().is_none()
    }
}
