//! Generation client
//!
//! Wraps a [`GenerationBackend`] with:
//! - request logging and prediction statistics
//! - JSON reply parsing for classifier-style calls
//! - the streaming driver: chunk/token/complete/error callbacks, typing
//!   pacing and cooperative cancellation

use crate::backend::GenerationBackend;
use crate::callbacks::StreamCallbacks;
use crate::error::GenerationError;
use crate::pacer::TypingPacer;
use crate::types::{Completion, GenerationOptions, GenerationRequest, StreamEvent};
use futures::StreamExt;
use prd_state::Message;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Front door to the generation capability
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    pacer: TypingPacer,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}

impl GenerationClient {
    /// Client without pacing
    #[must_use]
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            pacer: TypingPacer::disabled(),
        }
    }

    /// With token pacing
    #[inline]
    #[must_use]
    pub fn with_pacer(mut self, pacer: TypingPacer) -> Self {
        self.pacer = pacer;
        self
    }

    /// Request the whole reply at once
    ///
    /// # Errors
    /// Whatever the backend reports.
    pub async fn complete(
        &self,
        system_prompt: impl Into<String>,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<Completion, GenerationError> {
        let label = options.label.clone();
        tracing::debug!(
            label = %label,
            messages = messages.len(),
            prediction = options.prediction.is_some(),
            "generation request"
        );

        let request = GenerationRequest {
            system_prompt: system_prompt.into(),
            messages,
            options,
        };
        match self.backend.complete(request).await {
            Ok(completion) => {
                if let Some(usage) = completion.usage {
                    tracing::debug!(
                        label = %label,
                        accepted = usage.accepted_prediction_tokens,
                        rejected = usage.rejected_prediction_tokens,
                        "prediction stats"
                    );
                }
                Ok(completion)
            }
            Err(e) => {
                tracing::error!(label = %label, error = %e, "generation failed");
                Err(e)
            }
        }
    }

    /// Request a reply and parse it as JSON
    ///
    /// # Errors
    /// [`GenerationError::Parse`] when the reply is not valid JSON for `T`,
    /// otherwise whatever the backend reports.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system_prompt: impl Into<String>,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> Result<T, GenerationError> {
        let completion = self.complete(system_prompt, messages, options).await?;
        parse_json_reply(&completion.text)
    }

    /// Stream a reply through `callbacks`, returning the full text
    ///
    /// Cancelling `cancel` ends the stream with
    /// [`GenerationError::Cancelled`] and no `on_error` call. Other failures
    /// are reported through `on_error` before being returned.
    ///
    /// # Errors
    /// [`GenerationError::Cancelled`] or whatever the backend reports.
    pub async fn stream(
        &self,
        system_prompt: impl Into<String>,
        messages: Vec<Message>,
        callbacks: &dyn StreamCallbacks,
        options: GenerationOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, GenerationError> {
        let never = CancellationToken::new();
        let cancel = cancel.unwrap_or(&never);
        let label = options.label.clone();

        let result = self
            .drive_stream(system_prompt.into(), messages, callbacks, options, cancel)
            .await;

        match &result {
            Ok(full) => tracing::debug!(label = %label, chars = full.len(), "stream complete"),
            Err(GenerationError::Cancelled) => tracing::info!(label = %label, "stream cancelled"),
            Err(e) => {
                tracing::error!(label = %label, error = %e, "stream failed");
                callbacks.on_error(&e.to_string());
            }
        }
        result
    }

    async fn drive_stream(
        &self,
        system_prompt: String,
        messages: Vec<Message>,
        callbacks: &dyn StreamCallbacks,
        options: GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let request = GenerationRequest {
            system_prompt,
            messages,
            options,
        };
        let mut events = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GenerationError::Cancelled),
            opened = self.backend.stream(request) => opened?,
        };

        let mut full = String::new();
        let mut first_chunk = true;
        let mut first_token = true;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(GenerationError::Cancelled),
                next = events.next() => next,
            };
            let Some(event) = next else { break };
            let StreamEvent { raw, delta } = event?;

            callbacks.on_chunk(&raw, first_chunk);
            first_chunk = false;
            if delta.is_empty() {
                continue;
            }

            let slices = self.pacer.slices(&delta);
            let paced = slices.len() > 1;
            for slice in slices {
                full.push_str(&slice);
                callbacks.on_token(&slice, first_token);
                first_token = false;
                if paced {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(GenerationError::Cancelled),
                        () = tokio::time::sleep(self.pacer.next_delay()) => {}
                    }
                }
            }
        }

        callbacks.on_complete(&full);
        Ok(full)
    }
}

/// Parse a JSON reply, tolerating a surrounding fenced code block
///
/// # Errors
/// [`GenerationError::Parse`] when the text is not valid JSON for `T`.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| GenerationError::Parse(e.to_string()))
}
