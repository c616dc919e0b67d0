//! Testing utilities for the PRD Forge workspace
//!
//! Scripted generation backends and document fixtures shared by the
//! integration tests and the CLI simulator.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use prd_generation::{
    Completion, EventStream, GenerationBackend, GenerationError, GenerationRequest, StreamEvent,
};
use prd_state::{SectionCatalog, SectionHistory, SharedSession};
use std::sync::Arc;

type ReplyFn = dyn Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync;

/// What a scripted backend does for a request
#[derive(Clone)]
pub enum Reply {
    /// Answer with this text
    Text(String),
    /// Answer computed from the request
    With(Arc<ReplyFn>),
    /// Fail with this error
    Fail(GenerationError),
    /// Never answer
    Hang,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, GenerationError> + Send + Sync + 'static,
    {
        Self::With(Arc::new(f))
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(GenerationError::Backend(message.into()))
    }
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::With(_) => f.write_str("With(..)"),
            Self::Fail(e) => f.debug_tuple("Fail").field(e).finish(),
            Self::Hang => f.write_str("Hang"),
        }
    }
}

/// Backend answering by request label
///
/// Rules match when the label contains their key. Later rules win, so
/// presets can be overridden with [`ScriptedBackend::on`].
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    rules: Vec<(String, Reply)>,
    fallback: Option<Reply>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stage answers plausibly; the router answers `related`
    pub fn prd(related: bool) -> Self {
        Self::new()
            .on(
                "Summary Generation",
                Reply::with(|r| Ok(format!("Latest update: {}", first_line(r)))),
            )
            .on("Conversation Summary", Reply::text("The user is describing their product."))
            .on(
                "Conversation Agent",
                Reply::text("Thanks, I've noted that. What else should we capture?"),
            )
            .on("Section Generation", Reply::with(|r| Ok(section_reply(&first_line(r)))))
            .on("Router Agent", Reply::text(format!("{{\"is_prd_section_related\": {related}}}")))
    }

    /// Add a rule for labels containing `key`
    #[must_use]
    pub fn on(mut self, key: impl Into<String>, reply: Reply) -> Self {
        self.rules.push((key.into(), reply));
        self
    }

    /// Reply for labels no rule matches
    #[must_use]
    pub fn otherwise(mut self, reply: Reply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Requests received so far
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests whose label contains `key`
    pub fn count(&self, key: &str) -> usize {
        self.calls.lock().iter().filter(|r| r.options.label.contains(key)).count()
    }

    fn reply_for(&self, request: &GenerationRequest) -> Reply {
        self.calls.lock().push(request.clone());
        self.rules
            .iter()
            .rev()
            .find(|(key, _)| request.options.label.contains(key.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Reply::text("ok"))
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn complete(&self, request: GenerationRequest) -> Result<Completion, GenerationError> {
        match self.reply_for(&request) {
            Reply::Text(text) => Ok(Completion::text(text)),
            Reply::With(f) => f(&request).map(Completion::text),
            Reply::Fail(e) => Err(e),
            Reply::Hang => futures::future::pending().await,
        }
    }

    async fn stream(&self, request: GenerationRequest) -> Result<EventStream, GenerationError> {
        let text = match self.reply_for(&request) {
            Reply::Text(text) => text,
            Reply::With(f) => f(&request)?,
            Reply::Fail(e) => return Err(e),
            Reply::Hang => return Ok(stream::pending().boxed()),
        };
        let events: Vec<Result<StreamEvent, GenerationError>> = text
            .split_inclusive(' ')
            .map(|word| Ok(StreamEvent::delta(word)))
            .collect();
        Ok(stream::iter(events).boxed())
    }
}

/// Backend failing every request
#[derive(Debug, Clone, Default)]
pub struct FailingBackend;

#[async_trait]
impl GenerationBackend for FailingBackend {
    async fn complete(&self, _request: GenerationRequest) -> Result<Completion, GenerationError> {
        Err(GenerationError::Backend("backend unavailable".into()))
    }

    async fn stream(&self, _request: GenerationRequest) -> Result<EventStream, GenerationError> {
        Err(GenerationError::Backend("backend unavailable".into()))
    }
}

/// First line of the latest message of `request`
pub fn first_line(request: &GenerationRequest) -> String {
    request
        .messages
        .last()
        .map(|m| m.text())
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Section body with a two-star rating and three open Next Steps
pub fn section_reply(info: &str) -> String {
    rated_section(
        info,
        "★★☆☆☆",
        &["Name the project owner", "Add a target date", "Estimate the budget"],
    )
}

/// Section body with rating `stars` and the given open Next Steps
pub fn rated_section(body: &str, stars: &str, next_steps: &[&str]) -> String {
    let steps = next_steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{body}\n\n⭐ Provided Information Rating: {stars}\nSome details are still missing.\n\n\
         📈 Next Steps:\n{steps}"
    )
}

/// History whose last generated content carries `stars`
pub fn history_rated(stars: &str) -> SectionHistory {
    SectionHistory::default()
        .with_generated(rated_section("# Section", stars, &[]), chrono::Utc::now())
}

/// Fresh session over the default catalog
pub fn prd_session() -> SharedSession {
    SharedSession::new(SectionCatalog::prd_default())
}
