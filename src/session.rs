//! Lazy ownership of the chat session.
//!
//! A session is a server-side resource, so it is created on the first real
//! send and never speculatively. Concurrent callers share one creation
//! request; a failed creation is not remembered and the next call retries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::ChatApi;
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::observability::{SESSION_CREATION_FAILURES, SESSION_CREATIONS, SESSION_REUSES};
use crate::types::ChatSession;

/// Owns the identity of the current chat session.
pub struct SessionManager {
    api: Arc<dyn ChatApi>,
    current: Mutex<Option<ChatSession>>,
    creating: tokio::sync::Mutex<()>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl SessionManager {
    /// Creates a manager that holds no session yet.
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self {
            api,
            current: Mutex::new(None),
            creating: tokio::sync::Mutex::new(()),
            logger: None,
        }
    }

    /// Reports every session this manager creates to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Returns the held session, creating one if none is held.
    ///
    /// The held session is returned without touching the network. Otherwise
    /// exactly one caller issues the creation request while the others wait
    /// for its result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionCreationFailed`] if the server refuses or the
    /// request never completes. Nothing is cached in that case.
    pub async fn ensure_session(&self) -> Result<ChatSession> {
        if let Some(session) = self.current() {
            SESSION_REUSES.click();
            return Ok(session);
        }

        let _creating = self.creating.lock().await;
        // Another caller may have finished creating while we waited.
        if let Some(session) = self.current() {
            SESSION_REUSES.click();
            return Ok(session);
        }

        match self.api.create_session().await {
            Ok(session) => {
                SESSION_CREATIONS.click();
                tracing::debug!(session_id = %session.id, "chat session created");
                if let Some(logger) = &self.logger {
                    logger.log_session_created(&session);
                }
                *self.lock() = Some(session.clone());
                Ok(session)
            }
            Err(err) => {
                SESSION_CREATION_FAILURES.click();
                tracing::warn!(error = %err, "chat session creation failed");
                if err.is_session_creation_failed() {
                    Err(err)
                } else {
                    Err(Error::session_creation_failed(err.to_string(), None))
                }
            }
        }
    }

    /// Adopts an existing server-side session instead of creating one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a session is already held: a
    /// conversation keeps the session it started with.
    pub async fn resume(&self, id: &str) -> Result<ChatSession> {
        let _creating = self.creating.lock().await;
        if let Some(held) = self.current() {
            return Err(Error::validation(
                format!("already in session {}", held.id),
                Some("id".to_string()),
            ));
        }
        let session = self.api.get_session(id).await?;
        tracing::debug!(session_id = %session.id, "chat session resumed");
        *self.lock() = Some(session.clone());
        Ok(session)
    }

    /// The held session, if any.
    pub fn current(&self) -> Option<ChatSession> {
        self.lock().clone()
    }

    /// Forgets the held session so the next send creates a fresh one.
    ///
    /// Only valid together with discarding the conversation the session
    /// belonged to.
    pub(crate) fn reset(&self) -> Option<ChatSession> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ChatSession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
