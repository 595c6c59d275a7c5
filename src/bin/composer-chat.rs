//! Interactive chat for co-editing a document with an assistant.
//!
//! Each line typed is sent to the Composer service together with the current
//! document. Replies stream back as assistant messages and document
//! rewrites, and are printed as they arrive.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local server, starting from an empty document
//! composer-chat
//!
//! # Point at another server and seed the document from a file
//! composer-chat --base-url http://composer.internal:8080/ --document README.md
//!
//! # Continue an existing session
//! composer-chat --session 42
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/doc` - Print the current document
//! - `/retry [n]` - Re-send a failed message
//! - `/new` - Start a new conversation in a new session
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use composer::chat::{ChatArgs, ChatCommand, ChatConfig, help_text, parse_command};
use composer::{
    ChatSession, Composer, ConversationState, MessageStatus, PlainTextRenderer, SendOrchestrator,
    SendOutcome,
};

/// Main entry point for the composer-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let (args, _) = ChatArgs::from_command_line_relaxed("composer-chat [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = Composer::with_options(config.base_url.clone(), Some(config.timeout))?;
    let renderer = Arc::new(PlainTextRenderer::with_color(config.use_color));
    let mut orchestrator =
        SendOrchestrator::new(Arc::new(client.clone())).with_view(renderer.clone());
    if let Some(path) = &config.document_path {
        orchestrator = orchestrator.with_document(std::fs::read_to_string(path)?);
    }
    let orchestrator = Arc::new(orchestrator);

    if let Some(id) = &config.session_id {
        let session = orchestrator.sessions().resume(id).await?;
        renderer.print_info(&format!("Resumed {}", describe_session(&session)));
    }

    // Ctrl+C at the prompt is handled by rustyline; while a reply streams it
    // reaches this handler and cancels the send.
    let cancel_target = Arc::clone(&orchestrator);
    ctrlc::set_handler(move || {
        cancel_target.cancel();
    })?;

    let mut rl = DefaultEditor::new()?;

    println!("Composer Chat ({})", client.base_url());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::ShowDocument => {
                            let document = orchestrator.document();
                            if document.is_empty() {
                                renderer.print_info("(the document is empty)");
                            } else {
                                println!("{document}");
                            }
                        }
                        ChatCommand::OpenDocument(path) => match std::fs::read_to_string(&path) {
                            Ok(document) => {
                                orchestrator.update_document(document);
                                renderer.print_info(&format!("Document loaded from {}", path));
                            }
                            Err(err) => {
                                renderer.print_error(&format!("Failed to read {}: {}", path, err))
                            }
                        },
                        ChatCommand::WriteDocument(path) => {
                            match std::fs::write(&path, orchestrator.document()) {
                                Ok(()) => {
                                    renderer.print_info(&format!("Document written to {}", path))
                                }
                                Err(err) => renderer
                                    .print_error(&format!("Failed to write {}: {}", path, err)),
                            }
                        }
                        ChatCommand::Retry(index) => {
                            let Some(index) = index.or_else(|| orchestrator.last_retryable())
                            else {
                                renderer.print_info("Nothing to retry.");
                                continue;
                            };
                            show_outcome(&renderer, orchestrator.retry(index).await);
                        }
                        ChatCommand::NewSession => {
                            orchestrator.new_conversation().await;
                        }
                        ChatCommand::ShowSession => match orchestrator.sessions().current() {
                            Some(session) => renderer.print_info(&describe_session(&session)),
                            None => renderer.print_info("No session yet."),
                        },
                        ChatCommand::History => print_history(&orchestrator.snapshot()),
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                show_outcome(&renderer, orchestrator.send(line).await);
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn show_outcome(renderer: &PlainTextRenderer, result: composer::Result<SendOutcome>) {
    match result {
        Ok(SendOutcome::Completed(report)) => {
            if report.malformed_frames > 0 {
                renderer.print_info(&format!(
                    "[skipped {} malformed frame(s)]",
                    report.malformed_frames
                ));
            }
            if report.assistant_messages == 0 && report.artifact_updates == 0 {
                renderer.print_info("[no reply]");
            }
        }
        Ok(SendOutcome::Ignored) => {}
        // Failures and cancellations were already shown against the message.
        Err(err) if err.is_validation() => renderer.print_error(&err.to_string()),
        Err(_) => {}
    }
}

fn describe_session(session: &ChatSession) -> String {
    match &session.title {
        Some(title) => format!("session {} ({})", session.id, title),
        None => format!("session {}", session.id),
    }
}

fn print_history(state: &ConversationState) {
    if state.messages().is_empty() {
        println!("    (no messages)");
        return;
    }
    for (index, message) in state.messages().iter().enumerate() {
        println!(
            "    #{index} {} [{}]: {}",
            message.role,
            describe_status(&message.status),
            message.content
        );
    }
}

fn describe_status(status: &MessageStatus) -> String {
    match status {
        MessageStatus::Pending => "pending".to_string(),
        MessageStatus::Streaming => "streaming".to_string(),
        MessageStatus::Sent => "sent".to_string(),
        MessageStatus::Failed(reason) => format!("failed: {reason}"),
        MessageStatus::Cancelled => "cancelled".to_string(),
    }
}
