//! The single entry point for user-initiated sends.
//!
//! A send appends the human message immediately, then waits its turn: sends
//! are serialized through a FIFO gate so that the frames of two responses
//! never interleave. Once admitted, it makes sure a session exists, submits
//! the message with the document as it stands at that moment, and applies
//! each decoded frame as it arrives.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::ChatApi;
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::frames::process_frames;
use crate::observability::{
    SEND_CANCELLATIONS, SEND_FAILURES, SEND_QUEUE_WAIT, SEND_REQUESTS, STREAM_DURATION,
};
use crate::reconcile::{ConversationState, reconcile};
use crate::render::ConversationView;
use crate::session::SessionManager;
use crate::types::{
    ChatMessage, ChatSession, MessageCreateParams, MessageRole, MessageStatus, StreamFrame,
};

/// Result of a send that was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The input was empty or whitespace; nothing happened.
    Ignored,
    /// The response stream ran to completion.
    Completed(SendReport),
}

/// Summary of one completed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Index of the human message in the conversation.
    pub message_index: usize,
    /// The session the message went to.
    pub session: ChatSession,
    /// Frames decoded, malformed ones excluded.
    pub frames: usize,
    /// Assistant messages appended.
    pub assistant_messages: usize,
    /// Frames that changed the document.
    pub artifact_updates: usize,
    /// Segments that could not be decoded and were skipped.
    pub malformed_frames: usize,
}

impl SendReport {
    fn new(message_index: usize, session: ChatSession) -> Self {
        Self {
            message_index,
            session,
            frames: 0,
            assistant_messages: 0,
            artifact_updates: 0,
            malformed_frames: 0,
        }
    }
}

/// A human message's position, valid within one conversation generation.
#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    generation: u64,
}

impl Slot {
    fn new(index: usize, generation: u64) -> Self {
        Self { index, generation }
    }
}

/// Coordinates session, submit, decode and reconcile for every send.
pub struct SendOrchestrator {
    api: Arc<dyn ChatApi>,
    sessions: SessionManager,
    state: Mutex<ConversationState>,
    view: Arc<dyn ConversationView>,
    logger: Option<Arc<dyn ClientLogger>>,
    gate: tokio::sync::Mutex<()>,
    cancel: Mutex<CancellationToken>,
}

impl SendOrchestrator {
    /// Creates an orchestrator with an empty conversation and no view.
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self {
            sessions: SessionManager::new(Arc::clone(&api)),
            api,
            state: Mutex::new(ConversationState::new()),
            view: Arc::new(()),
            logger: None,
            gate: tokio::sync::Mutex::new(()),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Reports every change to `view`.
    pub fn with_view(mut self, view: Arc<dyn ConversationView>) -> Self {
        self.view = view;
        self
    }

    /// Attaches a client logger.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.sessions = self.sessions.with_logger(Arc::clone(&logger));
        self.logger = Some(logger);
        self
    }

    /// Seeds the document.
    pub fn with_document(self, document: impl Into<String>) -> Self {
        self.lock_state().set_artifact(document);
        self
    }

    /// The session manager, for resuming or resetting the session.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// A copy of the conversation as it stands.
    pub fn snapshot(&self) -> ConversationState {
        self.lock_state().clone()
    }

    /// The current document body.
    pub fn document(&self) -> String {
        self.lock_state().artifact().to_string()
    }

    /// Records a local edit from the editor; the next send carries it.
    pub fn update_document(&self, document: impl Into<String>) {
        self.lock_state().set_artifact(document);
    }

    /// Discards the conversation and its session once earlier sends finish.
    ///
    /// Sends queued before this call are delivered first, in order. The next
    /// send creates a fresh session. The document is kept so the new
    /// conversation can pick up where the old one left it. Returns the
    /// session that was let go, if any.
    pub async fn new_conversation(&self) -> Option<ChatSession> {
        let _turn = self.gate.lock().await;
        let previous = self.sessions.reset();
        self.lock_state().restart();
        tracing::debug!(
            session_id = ?previous.as_ref().map(|s| s.id.as_str()),
            "conversation restarted"
        );
        self.view.conversation_restarted();
        previous
    }

    /// Cancels every in-flight and queued send.
    ///
    /// Sends started after this call are unaffected.
    pub fn cancel(&self) {
        let token = std::mem::replace(&mut *self.lock_cancel(), CancellationToken::new());
        token.cancel();
    }

    /// Sends a human message and applies the response as it streams in.
    ///
    /// Whitespace-only input is ignored without touching the conversation or
    /// the network.
    ///
    /// # Errors
    ///
    /// Session, submit and transport failures leave the human message in place
    /// with status [`MessageStatus::Failed`] and are returned. Cancellation
    /// marks it [`MessageStatus::Cancelled`] and returns [`Error::Abort`].
    /// Frames applied before a failure stay applied.
    pub async fn send(&self, message: &str) -> Result<SendOutcome> {
        if message.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let (slot, appended) = {
            let mut state = self.lock_state();
            let index = state.push_human(message);
            let slot = Slot::new(index, state.generation());
            (slot, state.messages()[index].clone())
        };
        self.view.message_appended(slot.index, &appended);
        self.deliver(slot, message.to_string()).await
    }

    /// Re-sends a failed or cancelled human message in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `index` is not a retryable human
    /// message; otherwise behaves like [`send`](Self::send).
    pub async fn retry(&self, index: usize) -> Result<SendOutcome> {
        let (slot, content) = {
            let mut state = self.lock_state();
            let content = match state.message(index) {
                Some(message)
                    if message.role == MessageRole::Human && message.status.is_retryable() =>
                {
                    message.content.clone()
                }
                Some(_) => {
                    return Err(Error::validation(
                        format!("message #{index} is not a failed human message"),
                        Some("index".to_string()),
                    ));
                }
                None => {
                    return Err(Error::validation(
                        format!("no message #{index}"),
                        Some("index".to_string()),
                    ));
                }
            };
            state.set_status(index, MessageStatus::Pending);
            (Slot::new(index, state.generation()), content)
        };
        self.view.message_status(index, &MessageStatus::Pending);
        self.deliver(slot, content).await
    }

    /// Index of the most recent retryable human message.
    pub fn last_retryable(&self) -> Option<usize> {
        self.lock_state()
            .messages()
            .iter()
            .rposition(|m| m.role == MessageRole::Human && m.status.is_retryable())
    }

    async fn deliver(&self, slot: Slot, content: String) -> Result<SendOutcome> {
        SEND_REQUESTS.click();
        let token = self.lock_cancel().clone();

        let queued = Instant::now();
        let _turn = tokio::select! {
            biased;
            _ = token.cancelled() => {
                return self.finish(slot, Err(Error::abort("send cancelled while queued")));
            }
            turn = self.gate.lock() => turn,
        };
        SEND_QUEUE_WAIT.add(queued.elapsed().as_secs_f64());

        // Indices from before a restart point into a different conversation.
        if self.lock_state().generation() != slot.generation {
            return self.finish(slot, Err(Error::abort("conversation was restarted")));
        }
        let result = self.stream_into(slot, content, &token).await;
        self.finish(slot, result)
    }

    async fn stream_into(
        &self,
        slot: Slot,
        content: String,
        token: &CancellationToken,
    ) -> Result<SendReport> {
        // Creation runs to completion even when cancelled; the session is kept.
        let session = self.sessions.ensure_session().await?;
        if token.is_cancelled() {
            return Err(Error::abort("send cancelled before submit"));
        }

        let artifact = self.document();
        let params = MessageCreateParams::new(content, artifact);
        if let Some(logger) = &self.logger {
            logger.log_submit(&session, &params);
        }
        self.set_status(slot, MessageStatus::Streaming);

        let body = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::abort("send cancelled before response")),
            body = self.api.submit_message(&session, &params) => body?,
        };

        let started = Instant::now();
        let mut frames = std::pin::pin!(process_frames(body));
        let mut report = SendReport::new(slot.index, session);
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::abort("send cancelled mid-stream")),
                next = frames.next() => next,
            };
            let Some(frame) = next else {
                break;
            };
            match frame {
                Ok(frame) => {
                    if token.is_cancelled() {
                        return Err(Error::abort("send cancelled mid-stream"));
                    }
                    if let Some(logger) = &self.logger {
                        logger.log_frame(&report.session, &frame);
                    }
                    report.frames += 1;
                    self.apply(&frame, &mut report);
                }
                Err(err) if err.is_malformed_frame() => {
                    tracing::warn!(
                        session_id = %report.session.id,
                        error = %err,
                        "skipping malformed frame"
                    );
                    if let Some(logger) = &self.logger {
                        logger.log_malformed_frame(&report.session, &err);
                    }
                    report.malformed_frames += 1;
                }
                Err(err) => return Err(err),
            }
        }
        STREAM_DURATION.add(started.elapsed().as_secs_f64());
        Ok(report)
    }

    fn apply(&self, frame: &StreamFrame, report: &mut SendReport) {
        let (appended, artifact) = {
            let mut state = self.lock_state();
            let effect = reconcile(&mut state, frame);
            let appended: Option<(usize, ChatMessage)> = effect
                .appended
                .and_then(|i| state.message(i).cloned().map(|m| (i, m)));
            let artifact = effect
                .artifact_changed
                .then(|| state.artifact().to_string());
            (appended, artifact)
        };
        tracing::debug!(
            message_index = report.message_index,
            appended = appended.is_some(),
            artifact_changed = artifact.is_some(),
            "applied frame"
        );
        if let Some(artifact) = artifact {
            report.artifact_updates += 1;
            self.view.artifact_replaced(&artifact);
        }
        if let Some((i, message)) = appended {
            report.assistant_messages += 1;
            self.view.message_appended(i, &message);
        }
    }

    fn finish(&self, slot: Slot, result: Result<SendReport>) -> Result<SendOutcome> {
        match result {
            Ok(report) => {
                self.set_status(slot, MessageStatus::Sent);
                Ok(SendOutcome::Completed(report))
            }
            Err(err) if err.is_abort() => {
                SEND_CANCELLATIONS.click();
                tracing::debug!(message_index = slot.index, "send cancelled");
                self.set_status(slot, MessageStatus::Cancelled);
                Err(err)
            }
            Err(err) => {
                SEND_FAILURES.click();
                tracing::warn!(message_index = slot.index, error = %err, "send failed");
                self.set_status(slot, MessageStatus::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    fn set_status(&self, slot: Slot, status: MessageStatus) {
        let updated = {
            let mut state = self.lock_state();
            state.generation() == slot.generation && state.set_status(slot.index, status.clone())
        };
        if updated {
            self.view.message_status(slot.index, &status);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cancel(&self) -> MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
