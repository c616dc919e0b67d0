//! Turn orchestration
//!
//! One turn runs through these steps:
//! 1. route the messages
//! 2. build the document context
//! 3. select sections, summarize and generate each of them concurrently
//! 4. submit the results as pending diffs
//! 5. reply through the conversational agent
//!
//! Live section content is never written here; it changes only when a
//! diff is resolved. Every failure after routing becomes an apology reply.

use crate::completion::{incomplete_items, rating_of};
use crate::config::{PipelineConfig, RouterKind};
use crate::context::conversation_context;
use crate::conversation::{ConversationAgent, ConversationRequest};
use crate::error::PrdError;
use crate::generator::{SectionGenerator, SectionOutcome};
use crate::router::{ModelRouter, Router, RuleRouter};
use crate::selector::{SectionInput, SectionSelector};
use crate::summary::SectionSummarizer;
use crate::transition::{detect_transition, focus_section, TransitionTarget};
use chrono::Utc;
use futures::future::join_all;
use prd_diff::{DiffReview, ProposedUpdate};
use prd_generation::{CancellationToken, GenerationClient, GenerationError, StreamCallbacks};
use prd_state::{Message, Role, SectionDiff, SectionHistory, SectionId, SharedSession, StateError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reply when a turn fails
pub const APOLOGY_REPLY: &str =
    "I'm sorry, I encountered an error processing your request. Please try again.";
/// Reply when a turn is cancelled
pub const CANCELLED_REPLY: &str = "Message generation was cancelled.";
/// Update summary when a relevant turn changed nothing
pub const NO_UPDATES: &str =
    "I analyzed your message but didn't find specific PRD content to update.";

/// Receives pipeline progress lines
pub type LogCallback<'a> = dyn Fn(&str) + Send + Sync + 'a;

/// Per-turn options
#[derive(Clone, Copy, Default)]
pub struct TurnOptions<'a> {
    /// Stream the reply through these callbacks
    pub callbacks: Option<&'a dyn StreamCallbacks>,
    /// Abort signal of the turn
    pub cancel: Option<&'a CancellationToken>,
    /// Progress log sink
    pub log: Option<&'a LogCallback<'a>>,
    /// Running conversation summary before this turn
    pub summary: &'a str,
}

/// Generated content of one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionUpdate {
    /// Section updated
    pub section_id: SectionId,
    /// Generated content, or the previous content on fallback
    pub content: String,
    /// Information the section was given
    pub relevant_info: String,
    /// Section summary after this turn
    pub chat_summary: String,
    /// How generation ended
    pub outcome: SectionOutcome,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum TurnOutcome {
    /// Reply produced
    Completed,
    /// Aborted through the cancellation token
    Cancelled,
    /// Pipeline error; the reply is an apology
    Failed(String),
}

/// Everything a turn produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    /// Assistant reply
    pub response: String,
    /// Per-section generation results
    pub section_updates: Vec<SectionUpdate>,
    /// Diffs recorded this turn
    pub diffs: Vec<SectionDiff>,
    /// Transition request found in the latest message
    pub transition: Option<TransitionTarget>,
    /// Section the transition lands on
    pub focus_section: Option<SectionId>,
    /// How the turn ended
    pub outcome: TurnOutcome,
    /// Running conversation summary after this turn
    pub updated_summary: String,
}

impl TurnResult {
    fn apology(error: &PrdError, summary: &str) -> Self {
        Self {
            response: APOLOGY_REPLY.to_string(),
            section_updates: Vec::new(),
            diffs: Vec::new(),
            transition: None,
            focus_section: None,
            outcome: TurnOutcome::Failed(error.to_string()),
            updated_summary: summary.to_string(),
        }
    }
}

struct Progress<'a> {
    log: Option<&'a LogCallback<'a>>,
}

impl Progress<'_> {
    fn emit(&self, line: &str) {
        tracing::info!(stage = "orchestrator", "{line}");
        if let Some(log) = self.log {
            log(line);
        }
    }
}

/// Drives the pipeline for one session
pub struct Orchestrator {
    session: SharedSession,
    router: Arc<dyn Router>,
    selector: SectionSelector,
    summarizer: SectionSummarizer,
    generator: SectionGenerator,
    agent: ConversationAgent,
    review: DiffReview,
    cancel_sections: bool,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("selector", &self.selector)
            .field("cancel_sections", &self.cancel_sections)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Pipeline over `session`, with the router chosen by `config`
    #[must_use]
    pub fn new(session: SharedSession, client: GenerationClient, config: &PipelineConfig) -> Self {
        let catalog = session.catalog_arc();
        let router: Arc<dyn Router> = match config.router {
            RouterKind::Model => Arc::new(ModelRouter::new(client.clone(), config)),
            RouterKind::Rules => Arc::new(RuleRouter::new(Arc::clone(&catalog))),
        };
        Self {
            router,
            selector: SectionSelector::new(config.selection),
            summarizer: SectionSummarizer::new(client.clone(), config),
            generator: SectionGenerator::new(client.clone(), catalog, config),
            agent: ConversationAgent::new(client, config),
            review: DiffReview::new(session.clone()),
            cancel_sections: config.cancel_sections,
            session,
        }
    }

    /// Replace the router
    #[inline]
    #[must_use]
    pub fn with_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = router;
        self
    }

    /// Live session
    #[inline]
    #[must_use]
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Diff review surface of the session
    #[inline]
    #[must_use]
    pub fn review(&self) -> &DiffReview {
        &self.review
    }

    /// Run one turn over `messages`, latest last
    ///
    /// Never fails: errors become [`APOLOGY_REPLY`] with no section
    /// updates, cancellation becomes [`CANCELLED_REPLY`] keeping the
    /// updates already computed.
    pub async fn process_turn(&self, messages: &[Message], options: TurnOptions<'_>) -> TurnResult {
        let progress = Progress { log: options.log };
        let started = std::time::Instant::now();

        let result = self.run(messages, options, &progress).await;
        let elapsed = started.elapsed().as_millis();
        match result {
            Ok(result) => {
                progress.emit(&format!("🕒 Total processing time: {elapsed}ms"));
                result
            }
            Err(e) => {
                tracing::error!(stage = "orchestrator", error = %e, "turn failed");
                progress.emit(&format!("❌ Error: {e}"));
                progress.emit(&format!("🕒 Total processing time (with error): {elapsed}ms"));
                TurnResult::apology(&e, options.summary)
            }
        }
    }

    async fn run(
        &self,
        messages: &[Message],
        options: TurnOptions<'_>,
        progress: &Progress<'_>,
    ) -> Result<TurnResult, PrdError> {
        progress.emit("🧭 Step 1: Routing message...");
        let decision = self.router.route(messages).await;
        progress.emit(&format!("📝 Is PRD related: {}", decision.is_prd_section_related));

        progress.emit("📄 Generating document context...");
        let catalog = self.session.catalog();
        let document_context = self.session.read(|s| conversation_context(catalog, &s.document));
        progress.emit("📄 Document context generated");

        let transition = messages.last().and_then(|m| detect_transition(catalog, m));

        let mut result = TurnResult {
            response: String::new(),
            section_updates: Vec::new(),
            diffs: Vec::new(),
            transition: transition.clone(),
            focus_section: None,
            outcome: TurnOutcome::Completed,
            updated_summary: options.summary.to_string(),
        };

        let update_summary = if decision.is_prd_section_related {
            self.update_sections(messages, options, progress, &mut result).await?;
            if options.cancel.is_some_and(CancellationToken::is_cancelled) {
                return Ok(cancelled(result));
            }

            progress.emit("📄 Step 5: Generating update summary...");
            self.update_summary(&result.section_updates)
        } else {
            progress.emit("💬 Not PRD related, getting simple conversation response...");
            String::new()
        };

        if let Some(target) = &transition {
            progress.emit(&format!("Detected transition request to: {}", describe(target)));
            result.focus_section =
                self.session.read(|s| focus_section(catalog, &s.document, target));
            if let (TransitionTarget::Next, Some(id)) = (target, &result.focus_section) {
                progress.emit(&format!("Selected next section: {id}"));
            }
        }

        if decision.is_prd_section_related {
            progress.emit("🗣️ Step 6: Getting conversation response...");
        }
        let reply = self
            .agent
            .respond(ConversationRequest {
                messages,
                document_context: &document_context,
                previous_summary: options.summary,
                update_summary: &update_summary,
                callbacks: options.callbacks,
                cancel: options.cancel,
            })
            .await;

        match reply {
            Ok(reply) => {
                result.response = reply.response;
                result.updated_summary = reply.updated_summary;
                Ok(result)
            }
            Err(GenerationError::Cancelled) => Ok(cancelled(result)),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_sections(
        &self,
        messages: &[Message],
        options: TurnOptions<'_>,
        progress: &Progress<'_>,
        result: &mut TurnResult,
    ) -> Result<(), PrdError> {
        progress.emit("🔍 Step 2: Identifying sections to update...");
        let selection = self
            .selector
            .select_sections(self.session.catalog(), messages, result.transition.as_ref());
        let selected: Vec<(SectionId, SectionInput)> =
            selection.into_iter().filter(|(_, input)| input.should_update).collect();
        let ids: Vec<&str> = selected.iter().map(|(id, _)| id.as_str()).collect();
        progress.emit(&format!(
            "📝 Sections to update: {}",
            serde_json::to_string(&ids).unwrap_or_default()
        ));

        progress.emit("✏️ Step 3: Updating sections...");
        let cancel = if self.cancel_sections { options.cancel } else { None };
        let tasks = selected
            .iter()
            .map(|(id, input)| self.update_section(id, &input.relevant_info, cancel, progress));
        let outputs = join_all(tasks).await;
        progress.emit("📝 All section updates completed ");

        let generated: Vec<(SectionId, SectionHistory)> = outputs
            .iter()
            .filter_map(|(update, history)| history.clone().map(|h| (update.section_id.clone(), h)))
            .collect();
        self.session.try_update(|state| {
            for (id, history) in generated {
                state
                    .document
                    .section(id.as_str())
                    .ok_or_else(|| StateError::UnknownSection(id.clone()))?;
                state.document.set_history(id, history);
            }
            Ok::<_, StateError>(())
        })?;

        let updates: Vec<SectionUpdate> = outputs.into_iter().map(|(update, _)| update).collect();
        let proposed: Vec<ProposedUpdate> = updates
            .iter()
            .filter(|u| u.outcome.is_generated())
            .map(|u| ProposedUpdate::new(u.section_id.clone(), u.content.clone()))
            .collect();
        result.diffs = self.review.submit(&proposed);

        if result.diffs.is_empty() {
            progress.emit("💾 Step 4: Updating section histories...");
            let now = Utc::now();
            self.session.try_update(|state| {
                for update in updates.iter().filter(|u| u.outcome.is_generated()) {
                    state
                        .document
                        .section(update.section_id.as_str())
                        .ok_or_else(|| StateError::UnknownSection(update.section_id.clone()))?;
                    state.document.set_history(
                        update.section_id.clone(),
                        SectionHistory {
                            last_content: Some(update.content.clone()),
                            last_update: Some(now),
                            last_relevant_info: update.relevant_info.clone(),
                            chat_summary: update.chat_summary.clone(),
                        },
                    );
                }
                Ok::<_, StateError>(())
            })?;
            progress.emit("📝 Section histories updated");
        }

        result.section_updates = updates;
        Ok(())
    }

    async fn update_section(
        &self,
        section_id: &SectionId,
        relevant_info: &str,
        cancel: Option<&CancellationToken>,
        progress: &Progress<'_>,
    ) -> (SectionUpdate, Option<SectionHistory>) {
        progress.emit(&format!("Starting update for section: {section_id}"));
        let history = self.session.read(|s| s.document.history_of(section_id.as_str()));

        let chat_summary = self
            .summarizer
            .summarize(Role::System, relevant_info, Some(&history.chat_summary))
            .await;
        progress.emit(&format!("Summary for {section_id}"));

        let prompt_history = SectionHistory {
            chat_summary: chat_summary.clone(),
            ..history.clone()
        };
        let generated = self
            .generator
            .generate(section_id, relevant_info, &prompt_history, cancel)
            .await;
        progress.emit(&format!("Markdown for {section_id}"));
        progress.emit(&format!("Completed update for section {section_id}"));

        // only the generated content is recorded here
        let written = generated.history.map(|h| SectionHistory {
            last_relevant_info: history.last_relevant_info.clone(),
            chat_summary: history.chat_summary.clone(),
            ..h
        });
        let update = SectionUpdate {
            section_id: generated.section_id,
            content: generated.content,
            relevant_info: relevant_info.to_string(),
            chat_summary,
            outcome: generated.outcome,
        };
        (update, written)
    }

    fn update_summary(&self, updates: &[SectionUpdate]) -> String {
        if updates.is_empty() {
            return NO_UPDATES.to_string();
        }
        let catalog = self.session.catalog();
        let entries = updates
            .iter()
            .map(|update| {
                let rating = rating_of(&update.content).unwrap_or("N/A");
                let missing = incomplete_items(&update.content);
                let top: Vec<&str> = missing.iter().take(2).map(String::as_str).collect();
                format!(
                    "- {}: Added info about \"{}\"\n  Current Rating: {rating}\n  \
                     Top Missing Items: {}",
                    catalog.title_or_id(update.section_id.as_str()),
                    update.relevant_info,
                    top.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("Sections updated:\n{entries}")
    }
}

fn cancelled(mut result: TurnResult) -> TurnResult {
    tracing::info!(stage = "orchestrator", "turn cancelled");
    result.response = CANCELLED_REPLY.to_string();
    result.outcome = TurnOutcome::Cancelled;
    result
}

fn describe(target: &TransitionTarget) -> &str {
    match target {
        TransitionTarget::Section(id) => id.as_str(),
        TransitionTarget::Next => "next",
    }
}
