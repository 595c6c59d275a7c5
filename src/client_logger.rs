//! Logging trait for Composer client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every session, submit and decoded frame passing through a
//! [`SendOrchestrator`](crate::SendOrchestrator).

use crate::{ChatSession, Error, MessageCreateParams, StreamFrame};

/// A trait for logging Composer client operations.
///
/// All methods have empty default bodies so implementors only override what
/// they care about.
///
/// # Example
///
/// ```rust,ignore
/// use composer::{ChatSession, ClientLogger, StreamFrame};
/// use std::sync::Mutex;
///
/// struct FrameRecorder {
///     frames: Mutex<Vec<StreamFrame>>,
/// }
///
/// impl ClientLogger for FrameRecorder {
///     fn log_frame(&self, session: &ChatSession, frame: &StreamFrame) {
///         self.frames.lock().unwrap().push(frame.clone());
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Called once when a new session has been created on the server.
    fn log_session_created(&self, session: &ChatSession) {
        _ = session;
    }

    /// Called before a message is submitted.
    fn log_submit(&self, session: &ChatSession, params: &MessageCreateParams) {
        _ = session;
        _ = params;
    }

    /// Called for every frame, before it is applied.
    fn log_frame(&self, session: &ChatSession, frame: &StreamFrame) {
        _ = session;
        _ = frame;
    }

    /// Called for every segment that could not be decoded.
    fn log_malformed_frame(&self, session: &ChatSession, error: &Error) {
        _ = session;
        _ = error;
    }
}
