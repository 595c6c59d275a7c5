//! Pushing conversation changes out to the UI collaborators.
//!
//! This module provides the [`ConversationView`] trait the orchestrator reports
//! through, and a plain-text implementation for terminals.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::types::{ChatMessage, MessageRole, MessageStatus};

/// ANSI escape code for dim text (used for status lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for document updates).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for failed sends).
const ANSI_RED: &str = "\x1b[31m";

/// Receives every change the orchestrator makes to the conversation.
///
/// The message list collaborator renders `message_appended` and
/// `message_status`; the editor collaborator renders `artifact_replaced`.
/// Calls for one send arrive in the order the changes were made. Methods
/// take `&self` because queued sends share the view.
pub trait ConversationView: Send + Sync {
    /// A message was appended at `index`.
    fn message_appended(&self, index: usize, message: &ChatMessage) {
        _ = index;
        _ = message;
    }

    /// The delivery status of the human message at `index` changed.
    fn message_status(&self, index: usize, status: &MessageStatus) {
        _ = index;
        _ = status;
    }

    /// A frame replaced the document.
    fn artifact_replaced(&self, artifact: &str) {
        _ = artifact;
    }

    /// Every message was dropped and the next send starts a new session.
    fn conversation_restarted(&self) {}
}

impl ConversationView for () {}

/// Plain text view with optional ANSI styling.
///
/// Human messages are not echoed since the user just typed them; assistant
/// messages, failures and document updates are printed to stdout.
pub struct PlainTextRenderer {
    use_color: bool,
    lock: Mutex<()>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            use_color,
            lock: Mutex::new(()),
        }
    }

    /// Print an error message.
    pub fn print_error(&self, error: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    /// Print an informational message.
    pub fn print_info(&self, info: &str) {
        self.write_line(&self.dim(info));
    }

    fn dim(&self, text: &str) -> String {
        if self.use_color {
            format!("{ANSI_DIM}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn write_line(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
        let _ = stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationView for PlainTextRenderer {
    fn message_appended(&self, _index: usize, message: &ChatMessage) {
        if message.role != MessageRole::Assistant {
            return;
        }
        let label = if self.use_color {
            format!("{ANSI_CYAN}Assistant:{ANSI_RESET}")
        } else {
            "Assistant:".to_string()
        };
        self.write_line(&format!("{label} {}", message.content));
    }

    fn message_status(&self, index: usize, status: &MessageStatus) {
        match status {
            MessageStatus::Failed(reason) => {
                self.print_error(&format!("message #{index} was not sent: {reason} (/retry)"));
            }
            MessageStatus::Cancelled => {
                self.write_line(&self.dim(&format!("[message #{index} cancelled]")));
            }
            MessageStatus::Pending | MessageStatus::Streaming | MessageStatus::Sent => {}
        }
    }

    fn conversation_restarted(&self) {
        self.write_line(&self.dim("[new conversation; the document was kept]"));
    }

    fn artifact_replaced(&self, artifact: &str) {
        let summary = format!(
            "[document updated: {} lines, {} bytes]",
            artifact.lines().count(),
            artifact.len()
        );
        if self.use_color {
            self.write_line(&format!("{ANSI_GREEN}{summary}{ANSI_RESET}"));
        } else {
            self.write_line(&summary);
        }
    }
}
