//! Folding decoded frames into conversation state.
//!
//! Frames are applied one at a time as they arrive. A frame's artifact
//! replaces the document wholesale and a frame's message becomes one new
//! assistant message; nothing is merged, smoothed or coalesced.

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, MessageRole, MessageStatus, StreamFrame};

/// The messages and the document artifact of one conversation.
///
/// Messages are append-only: the role and content of an appended message
/// never change, only the delivery status of human messages does. Starting
/// a new conversation drops them all at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    artifact: String,
    #[serde(default)]
    generation: u64,
}

/// What applying one frame changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEffect {
    /// Index of the assistant message appended by the frame.
    pub appended: Option<usize>,
    /// True if the artifact now holds a different value.
    pub artifact_changed: bool,
}

impl FrameEffect {
    /// True if the frame left the state untouched.
    pub fn is_noop(&self) -> bool {
        self.appended.is_none() && !self.artifact_changed
    }
}

impl ConversationState {
    /// Creates an empty conversation with an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty conversation around an existing document.
    pub fn with_artifact(artifact: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            artifact: artifact.into(),
            generation: 0,
        }
    }

    /// Counts how often the conversation was restarted.
    ///
    /// A message index is only meaningful together with the generation it
    /// was handed out in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops every message and starts a new generation; the document stays.
    pub fn restart(&mut self) {
        self.messages.clear();
        self.generation += 1;
    }

    /// All messages in display order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The message at `index`.
    pub fn message(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    /// The current document body.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Appends a pending human message and returns its index.
    pub fn push_human(&mut self, content: impl Into<String>) -> usize {
        self.messages.push(ChatMessage::human(content));
        self.messages.len() - 1
    }

    /// Updates the delivery status of a human message.
    ///
    /// Returns false if `index` does not name a human message.
    pub fn set_status(&mut self, index: usize, status: MessageStatus) -> bool {
        match self.messages.get_mut(index) {
            Some(message) if message.role == MessageRole::Human => {
                message.status = status;
                true
            }
            _ => false,
        }
    }

    /// Replaces the document with a local edit.
    ///
    /// Unlike a frame, a local edit may empty the document.
    pub fn set_artifact(&mut self, artifact: impl Into<String>) {
        self.artifact = artifact.into();
    }
}

/// Applies one frame to `state`.
///
/// A non-empty artifact replaces the document; a non-empty message appends
/// one assistant message. Empty or absent fields change nothing.
pub fn reconcile(state: &mut ConversationState, frame: &StreamFrame) -> FrameEffect {
    let mut effect = FrameEffect::default();
    if let Some(artifact) = frame.artifact_text()
        && state.artifact != artifact
    {
        state.artifact = artifact.to_string();
        effect.artifact_changed = true;
    }
    if let Some(message) = frame.message_text() {
        state.messages.push(ChatMessage::assistant(message));
        effect.appended = Some(state.messages.len() - 1);
    }
    effect
}
