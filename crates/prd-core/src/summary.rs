//! Rolling summaries
//!
//! - [`SectionSummarizer`]: per-section memory of what the user said,
//!   always ending in a `Latest update:` entry
//! - [`ConversationSummarizer`]: digest of recent chat history and the
//!   running summary of the whole conversation
//!
//! Neither fails: every backend error falls back to a crude local summary.

use crate::config::PipelineConfig;
use crate::prompts::{
    CONVERSATION_SUMMARY_PROMPT, LATEST_UPDATE_MARKER, SECTION_SUMMARY_PROMPT,
    UPDATED_SUMMARY_PROMPT,
};
use prd_generation::{GenerationClient, GenerationOptions};
use prd_state::{Message, Role};

/// Per-message character limit in formatted histories
pub const MESSAGE_CHAR_LIMIT: usize = 2500;
/// Prompt length above which the running-summary inputs are cut
pub const SUMMARY_PROMPT_LIMIT: usize = 8000;
/// Upper bound of the fallback running summary
pub const FALLBACK_SUMMARY_LIMIT: usize = 4000;
const FALLBACK_EXCERPT: usize = 200;

/// First `max` characters of `text`
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `text` cut to `max` characters with `...` appended when cut
#[must_use]
pub fn ellipsize(text: &str, max: usize) -> String {
    let cut = truncate_chars(text, max);
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// `role: content` per message, joined by blank lines
#[must_use]
pub fn format_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = if m.role == Role::User { "user" } else { "assistant" };
            format!("{role}: {}", ellipsize(&m.text(), MESSAGE_CHAR_LIMIT))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Summarizes messages for one section
#[derive(Debug, Clone)]
pub struct SectionSummarizer {
    client: GenerationClient,
    temperature: f32,
    max_tokens: u32,
}

impl SectionSummarizer {
    /// Create summarizer
    #[must_use]
    pub fn new(client: GenerationClient, config: &PipelineConfig) -> Self {
        Self {
            client,
            temperature: config.summary_temperature,
            max_tokens: config.summary_max_tokens,
        }
    }

    /// Merge `message` into `previous`
    ///
    /// The result always carries a `Latest update:` entry.
    pub async fn summarize(&self, role: Role, message: &str, previous: Option<&str>) -> String {
        let previous = previous.filter(|p| !p.is_empty());
        let to_summarize = match previous {
            Some(prev) => format!("Previous summary: {prev}\nNew message: {message}"),
            None => message.to_string(),
        };
        let prefix = previous.map(|p| format!("{p}\n")).unwrap_or_default();

        let request = Message::user(format!(
            "Please summarize this {role} message following the rules exactly: {to_summarize}"
        ));
        let options = GenerationOptions::new("Summary Generation", self.temperature)
            .with_max_tokens(self.max_tokens);

        match self.client.complete(SECTION_SUMMARY_PROMPT, vec![request], options).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                if completion.text.contains(LATEST_UPDATE_MARKER) {
                    completion.text
                } else {
                    format!("{prefix}{LATEST_UPDATE_MARKER} {}", completion.text.trim())
                }
            }
            Ok(_) => format!("{prefix}{LATEST_UPDATE_MARKER} {message}"),
            Err(e) => {
                tracing::warn!(
                    stage = "summary",
                    error = %e,
                    "section summary failed, using fallback"
                );
                format!("{prefix}{LATEST_UPDATE_MARKER} {message}")
            }
        }
    }
}

/// Summarizes the conversation as a whole
#[derive(Debug, Clone)]
pub struct ConversationSummarizer {
    client: GenerationClient,
    recent_temperature: f32,
    update_temperature: f32,
    max_tokens: u32,
}

impl ConversationSummarizer {
    /// Create summarizer
    #[must_use]
    pub fn new(client: GenerationClient, config: &PipelineConfig) -> Self {
        Self {
            client,
            recent_temperature: config.conversation_summary_temperature,
            update_temperature: config.summary_temperature,
            max_tokens: config.conversation_summary_max_tokens,
        }
    }

    /// Digest of `messages`; empty when there is nothing to summarize
    pub async fn summarize_recent(&self, messages: &[Message]) -> String {
        let history = format_history(messages);
        if history.trim().is_empty() {
            return String::new();
        }

        let prompt = CONVERSATION_SUMMARY_PROMPT.replace("{chat_history}", &history);
        let options =
            GenerationOptions::new("Conversation Summary Generation", self.recent_temperature)
                .with_max_tokens(self.max_tokens);

        match self.client.complete(prompt, Vec::new(), options).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                completion.text.trim().to_string()
            }
            other => {
                if let Err(e) = other {
                    tracing::error!(
                        stage = "conversation_summary",
                        error = %e,
                        "failed to generate conversation summary"
                    );
                }
                let excerpt = ellipsize(&history, MESSAGE_CHAR_LIMIT);
                format!("Summary failed. Recent history:\n{excerpt}")
            }
        }
    }

    /// Fold the latest exchange into the running summary
    pub async fn update(&self, previous: Option<&str>, user: &str, assistant: &str) -> String {
        let previous = previous
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or("No previous summary.");

        let mut prompt = fill_update_prompt(previous, user, assistant);
        if prompt.chars().count() > SUMMARY_PROMPT_LIMIT {
            tracing::warn!(
                chars = prompt.chars().count(),
                "running summary prompt too long, truncating inputs"
            );
            let scaffold = UPDATED_SUMMARY_PROMPT.chars().count()
                - "{previous_summary}{user_message}{assistant_response}".chars().count();
            let third = SUMMARY_PROMPT_LIMIT.saturating_sub(scaffold) / 3;
            prompt = fill_update_prompt(
                truncate_chars(previous, third),
                truncate_chars(user, third),
                truncate_chars(assistant, third),
            );
        }

        let options = GenerationOptions::new("Update Conversation Summary", self.update_temperature)
            .with_max_tokens(self.max_tokens);
        match self.client.complete(prompt, Vec::new(), options).await {
            Ok(completion) if !completion.text.trim().is_empty() => {
                completion.text.trim().to_string()
            }
            other => {
                if let Err(e) = other {
                    tracing::error!(
                        stage = "conversation_summary",
                        error = %e,
                        "failed to update conversation summary"
                    );
                }
                let fallback = format!(
                    "{previous}\n\n[Update Failed] Last Exchange:\nUser: {}...\nAssistant: {}...",
                    truncate_chars(user, FALLBACK_EXCERPT),
                    truncate_chars(assistant, FALLBACK_EXCERPT),
                );
                truncate_chars(&fallback, FALLBACK_SUMMARY_LIMIT).to_string()
            }
        }
    }
}

fn fill_update_prompt(previous: &str, user: &str, assistant: &str) -> String {
    UPDATED_SUMMARY_PROMPT
        .replace("{previous_summary}", previous)
        .replace("{user_message}", user)
        .replace("{assistant_response}", assistant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prd_generation::{Completion, GenerationError, MockGenerationBackend};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn client_replying(reply: Result<&'static str, GenerationError>) -> GenerationClient {
        let mut backend = MockGenerationBackend::new();
        backend
            .expect_complete()
            .returning(move |_| reply.clone().map(Completion::text));
        GenerationClient::new(Arc::new(backend))
    }

    #[test]
    fn truncation_is_char_based() {
        assert_eq!(truncate_chars("★★★☆☆", 2), "★★");
        assert_eq!(ellipsize("abcdef", 3), "abc...");
        assert_eq!(ellipsize("abc", 3), "abc");
    }

    #[tokio::test]
    async fn section_summary_keeps_marked_reply() {
        let summarizer = SectionSummarizer::new(
            client_replying(Ok("Bikes app\nLatest update: adds GPS")),
            &PipelineConfig::default(),
        );
        let summary = summarizer.summarize(Role::User, "GPS tracking", Some("Bikes app")).await;
        assert_eq!(summary, "Bikes app\nLatest update: adds GPS");
    }

    #[tokio::test]
    async fn section_summary_normalises_unmarked_reply() {
        let summarizer =
            SectionSummarizer::new(client_replying(Ok("  adds GPS  ")), &PipelineConfig::default());
        let summary = summarizer.summarize(Role::User, "GPS tracking", Some("Bikes app")).await;
        assert_eq!(summary, "Bikes app\nLatest update: adds GPS");
    }

    #[tokio::test]
    async fn section_summary_falls_back_on_error() {
        let summarizer = SectionSummarizer::new(
            client_replying(Err(GenerationError::Backend("down".into()))),
            &PipelineConfig::default(),
        );
        assert_eq!(
            summarizer.summarize(Role::User, "GPS tracking", None).await,
            "Latest update: GPS tracking"
        );
    }

    #[tokio::test]
    async fn recent_summary_of_nothing_is_empty() {
        let summarizer =
            ConversationSummarizer::new(client_replying(Ok("unused")), &PipelineConfig::default());
        assert_eq!(summarizer.summarize_recent(&[]).await, "");
    }

    #[tokio::test]
    async fn recent_summary_fallback_quotes_history() {
        let summarizer = ConversationSummarizer::new(
            client_replying(Err(GenerationError::EmptyResponse)),
            &PipelineConfig::default(),
        );
        let summary = summarizer
            .summarize_recent(&[Message::user("hello"), Message::assistant("hi")])
            .await;
        assert_eq!(summary, "Summary failed. Recent history:\nuser: hello\n\nassistant: hi");
    }

    #[tokio::test]
    async fn running_summary_fallback_is_capped() {
        let summarizer = ConversationSummarizer::new(
            client_replying(Err(GenerationError::Backend("down".into()))),
            &PipelineConfig::default(),
        );
        let long = "x".repeat(5000);
        let summary = summarizer.update(Some(&long), "question", "answer").await;
        assert_eq!(summary.chars().count(), FALLBACK_SUMMARY_LIMIT);

        let summary = summarizer.update(None, "question", "answer").await;
        assert_eq!(
            summary,
            "No previous summary.\n\n[Update Failed] Last Exchange:\n\
             User: question...\nAssistant: answer..."
        );
    }

    #[tokio::test]
    async fn long_running_summary_prompt_is_truncated() {
        let mut backend = MockGenerationBackend::new();
        backend.expect_complete().returning(|request| {
            assert!(request.system_prompt.chars().count() <= SUMMARY_PROMPT_LIMIT);
            Ok(Completion::text("merged"))
        });
        let summarizer = ConversationSummarizer::new(
            GenerationClient::new(Arc::new(backend)),
            &PipelineConfig::default(),
        );
        let huge = "y".repeat(9000);
        assert_eq!(summarizer.update(Some("prev"), &huge, "ok").await, "merged");
    }
}
