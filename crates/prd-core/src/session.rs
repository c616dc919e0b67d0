//! Chat session
//!
//! Caller-facing driver of one document conversation. A [`ChatSession`]
//! owns the live state, the pipeline, the checkpoint list and the running
//! conversation summary, and serialises turns and checkpoint operations.

use crate::config::PrdConfig;
use crate::error::PrdError;
use crate::orchestrator::{Orchestrator, TurnOptions, TurnResult};
use crate::router::Router;
use chrono::Utc;
use parking_lot::Mutex;
use prd_checkpoint::{Checkpoint, CheckpointManager};
use prd_diff::DiffReview;
use prd_generation::{
    CancellationToken, GenerationBackend, GenerationClient, StreamCallbacks, TypingPacer,
};
use prd_state::{
    ContentPart, GenerationStatus, Message, SectionCatalog, SessionState, SharedSession,
};
use std::sync::Arc;

/// File attached to a user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown in the conversation
    pub name: String,
    /// Image data or URL sent to the backend
    pub url: String,
}

impl Attachment {
    /// Create attachment
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Mirrors streamed tokens into the session's generation status
struct StatusCallbacks<'a> {
    session: &'a SharedSession,
    forward: Option<&'a dyn StreamCallbacks>,
}

impl StreamCallbacks for StatusCallbacks<'_> {
    fn on_token(&self, token: &str, is_first: bool) {
        self.session.update(|s| s.conversation.status.append_token(token, is_first));
        if let Some(forward) = self.forward {
            forward.on_token(token, is_first);
        }
    }

    fn on_chunk(&self, raw: &str, is_first: bool) {
        if let Some(forward) = self.forward {
            forward.on_chunk(raw, is_first);
        }
    }

    fn on_complete(&self, full_text: &str) {
        self.session.update(|s| s.conversation.status.streaming_content = full_text.to_string());
        if let Some(forward) = self.forward {
            forward.on_complete(full_text);
        }
    }

    fn on_error(&self, message: &str) {
        self.session.update(|s| s.conversation.status = Default::default());
        if let Some(forward) = self.forward {
            forward.on_error(message);
        }
    }
}

/// Ends a turn: clears the in-flight token and the transient status,
/// also when the turn future is dropped
struct TurnGuard<'a> {
    session: &'a SharedSession,
    current: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        *self.current.lock() = None;
        self.session.update(|s| s.conversation.status = GenerationStatus::default());
    }
}

/// One document conversation
pub struct ChatSession {
    session: SharedSession,
    orchestrator: Orchestrator,
    checkpoints: CheckpointManager,
    config: PrdConfig,
    turn: tokio::sync::Mutex<()>,
    current: Mutex<Option<CancellationToken>>,
    summary: Mutex<String>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("config", &self.config)
            .field("in_turn", &self.current.lock().is_some())
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    /// Fresh session opened by the assistant greeting
    #[must_use]
    pub fn new(
        catalog: SectionCatalog,
        backend: Arc<dyn GenerationBackend>,
        config: PrdConfig,
    ) -> Self {
        let state = SessionState::from_catalog(&catalog);
        Self::with_state(catalog, state, backend, config)
    }

    /// Session over an existing state
    #[must_use]
    pub fn with_state(
        catalog: SectionCatalog,
        state: SessionState,
        backend: Arc<dyn GenerationBackend>,
        config: PrdConfig,
    ) -> Self {
        let session = SharedSession::with_state(catalog, state);
        let client =
            GenerationClient::new(backend).with_pacer(TypingPacer::new(config.pacing.clone()));
        Self {
            orchestrator: Orchestrator::new(session.clone(), client, &config.pipeline),
            checkpoints: CheckpointManager::new(session.clone()),
            session,
            config,
            turn: tokio::sync::Mutex::new(()),
            current: Mutex::new(None),
            summary: Mutex::new(String::new()),
        }
    }

    /// Replace the relevance router
    #[must_use]
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.orchestrator = self.orchestrator.with_router(router);
        self
    }

    /// Live state handle
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SharedSession {
        &self.session
    }

    /// Diff review surface
    #[inline]
    #[must_use]
    pub fn review(&self) -> &DiffReview {
        self.orchestrator.review()
    }

    /// Checkpoint list and restoration queries
    #[inline]
    #[must_use]
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Effective configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PrdConfig {
        &self.config
    }

    /// Running conversation summary
    #[must_use]
    pub fn summary(&self) -> String {
        self.summary.lock().clone()
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Send a user message and run one turn
    ///
    /// # Errors
    /// [`PrdError::Busy`] while another turn runs, or a checkpoint error
    /// from the pre-turn snapshot.
    pub async fn send_message(
        &self,
        text: &str,
        attachments: &[Attachment],
    ) -> Result<TurnResult, PrdError> {
        self.send_message_with(text, attachments, None).await
    }

    /// [`Self::send_message`] with reply tokens forwarded to `callbacks`
    ///
    /// # Errors
    /// See [`Self::send_message`].
    pub async fn send_message_with(
        &self,
        text: &str,
        attachments: &[Attachment],
        callbacks: Option<&dyn StreamCallbacks>,
    ) -> Result<TurnResult, PrdError> {
        let _turn = self.turn.try_lock().map_err(|_| PrdError::Busy)?;

        if let Some(len) = self.checkpoints.begin_turn() {
            tracing::info!(messages = len, "continuing from restored checkpoint");
        }
        self.checkpoints.create()?;
        self.autosave().await;

        let token = CancellationToken::new();
        *self.current.lock() = Some(token.clone());
        let _guard = TurnGuard {
            session: &self.session,
            current: &self.current,
        };

        let window = self.config.pipeline.history_window;
        let recent = self.session.update(|s| {
            let recent = s.conversation.recent(window);
            s.conversation.status = GenerationStatus::started();
            s.conversation
                .push(Message::user(display_text(text, attachments)).with_timestamp(Utc::now()));
            recent
        });

        let mut messages = recent;
        messages.push(Message::user(user_parts(text, attachments)));

        let status = StatusCallbacks {
            session: &self.session,
            forward: callbacks,
        };
        let log = |line: &str| self.session.update(|s| s.conversation.status.append_thinking(line));
        let summary = self.summary();

        let result = self
            .orchestrator
            .process_turn(
                &messages,
                TurnOptions {
                    callbacks: Some(&status),
                    cancel: Some(&token),
                    log: Some(&log),
                    summary: &summary,
                },
            )
            .await;

        *self.summary.lock() = result.updated_summary.clone();
        self.session.update(|s| {
            s.conversation
                .push(Message::assistant(result.response.clone()).with_timestamp(Utc::now()));
        });

        tracing::info!(
            outcome = ?result.outcome,
            sections = result.section_updates.len(),
            diffs = result.diffs.len(),
            "turn finished"
        );
        Ok(result)
    }

    /// Abort the turn in flight
    ///
    /// Returns false when no turn is running or it was already cancelled.
    /// The turn stays busy until it has wound down.
    pub fn cancel(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                tracing::info!("turn cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Show the checkpoint recorded at `conversation_len` messages
    ///
    /// # Errors
    /// [`PrdError::Checkpoint`] when there is no such checkpoint.
    pub async fn restore(&self, conversation_len: usize) -> Result<Checkpoint, PrdError> {
        let _turn = self.turn.lock().await;
        Ok(self.checkpoints.restore_by_turn_index(conversation_len)?)
    }

    /// Undo the active restoration
    ///
    /// # Errors
    /// [`PrdError::Checkpoint`] without an active restoration.
    pub async fn undo(&self) -> Result<(), PrdError> {
        let _turn = self.turn.lock().await;
        Ok(self.checkpoints.undo()?)
    }

    /// Load the checkpoint list from the configured file
    ///
    /// Returns how many checkpoints were loaded; zero without a path.
    ///
    /// # Errors
    /// [`PrdError::Checkpoint`] when the file cannot be read or decoded.
    pub async fn load_checkpoints(&self) -> Result<usize, PrdError> {
        let _turn = self.turn.lock().await;
        match &self.config.checkpoint.path {
            Some(path) => Ok(self.checkpoints.load_from(path).await?),
            None => Ok(0),
        }
    }

    async fn autosave(&self) {
        let checkpoint = &self.config.checkpoint;
        let (Some(path), true) = (&checkpoint.path, checkpoint.autosave) else {
            return;
        };
        if let Err(e) = self.checkpoints.save_to(path).await {
            tracing::warn!(path = %path.display(), error = %e, "checkpoint autosave failed");
        }
    }
}

/// Message text as shown in the conversation
fn display_text(text: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return text.to_string();
    }
    let names = attachments
        .iter()
        .map(|a| format!("- {}", a.name))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{text}\n\nAttached files:\n{names}")
}

/// Message content sent to the pipeline
fn user_parts(text: &str, attachments: &[Attachment]) -> Vec<ContentPart> {
    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if !text.trim().is_empty() {
        parts.push(ContentPart::text(text));
    }
    parts.extend(attachments.iter().map(|a| ContentPart::image(a.url.clone())));
    parts
}
