//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to manage the document and the session without sending
//! messages to the service.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Print the current document.
    ShowDocument,

    /// Replace the document with the contents of a file.
    OpenDocument(String),

    /// Write the current document to a file.
    WriteDocument(String),

    /// Re-send a failed or cancelled message.
    /// `None` picks the most recent one.
    Retry(Option<usize>),

    /// Drop the conversation and its session; the document is kept.
    NewSession,

    /// Show the current session.
    ShowSession,

    /// List every message with its delivery status.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use composer::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/open notes.md").is_some());
/// assert!(parse_command("Tighten the intro").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "doc" | "document" => ChatCommand::ShowDocument,
        "open" => match argument {
            Some(path) => ChatCommand::OpenDocument(path.to_string()),
            None => ChatCommand::Invalid("/open requires a file path".to_string()),
        },
        "write" => match argument {
            Some(path) => ChatCommand::WriteDocument(path.to_string()),
            None => ChatCommand::Invalid("/write requires a file path".to_string()),
        },
        "retry" => match argument {
            None => ChatCommand::Retry(None),
            Some(arg) => match arg.parse::<usize>() {
                Ok(index) => ChatCommand::Retry(Some(index)),
                Err(_) => ChatCommand::Invalid("/retry expects a message number".to_string()),
            },
        },
        "new" => ChatCommand::NewSession,
        "session" => ChatCommand::ShowSession,
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /doc                   Print the current document
  /open <file>           Replace the document with a file's contents
  /write <file>          Save the current document to a file
  /retry [n]             Re-send message n (default: the last failed one)
  /new                   Start a new conversation (keeps the document)
  /session               Show the current session
  /history               List messages with their delivery status
  /help                  Show this help message
  /quit                  Exit the chat

Press Ctrl+C while a reply is streaming to cancel it."#
}
