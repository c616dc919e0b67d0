//! Section generation
//!
//! Regenerates one section from its template, history and the relevant
//! info of the turn. Never fails: on any error the previous content is
//! returned and the outcome says why.

use crate::config::PipelineConfig;
use crate::error::PrdError;
use crate::prompts::section_prompt;
use crate::repair::{
    contains_overview_info, count_pending, enhance_relevant_info, lingering_completed_items,
    update_placeholders,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use prd_generation::{CancellationToken, GenerationClient, GenerationError, GenerationOptions};
use prd_state::{Message, SectionCatalog, SectionHistory, SectionId, StateError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static HEADING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^# .*$").expect("valid heading regex"));

/// How a section generation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum SectionOutcome {
    /// New content was produced
    Generated,
    /// Generation failed; previous content was kept
    Fallback(String),
    /// Generation was cancelled; previous content was kept
    Cancelled,
}

impl SectionOutcome {
    /// Whether new content was produced
    #[inline]
    #[must_use]
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated)
    }
}

/// Result of one section generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSection {
    /// Section generated
    pub section_id: SectionId,
    /// New content, or the previous content on failure
    pub content: String,
    /// How generation ended
    pub outcome: SectionOutcome,
    /// History to store; present only when content was generated
    pub history: Option<SectionHistory>,
}

/// Generates section content through the generation capability
#[derive(Debug, Clone)]
pub struct SectionGenerator {
    client: GenerationClient,
    catalog: Arc<SectionCatalog>,
    temperature: f32,
    max_tokens: u32,
    prediction_threshold: usize,
}

impl SectionGenerator {
    /// Create generator
    #[must_use]
    pub fn new(
        client: GenerationClient,
        catalog: Arc<SectionCatalog>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            client,
            catalog,
            temperature: config.section_temperature,
            max_tokens: config.section_max_tokens,
            prediction_threshold: config.prediction_threshold,
        }
    }

    /// Regenerate `section_id`
    ///
    /// With `cancel`, a cancelled token abandons the call and keeps the
    /// previous content.
    pub async fn generate(
        &self,
        section_id: &SectionId,
        relevant_info: &str,
        history: &SectionHistory,
        cancel: Option<&CancellationToken>,
    ) -> GeneratedSection {
        let previous = history.last_content_or_empty().to_string();

        let attempt = self.try_generate(section_id, relevant_info, history);
        let result = match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(PrdError::Generation(GenerationError::Cancelled)),
                result = attempt => result,
            },
            None => attempt.await,
        };

        match result {
            Ok(content) => GeneratedSection {
                section_id: section_id.clone(),
                history: Some(history.with_generated(content.clone(), Utc::now())),
                content,
                outcome: SectionOutcome::Generated,
            },
            Err(e) if e.is_cancelled() => {
                tracing::info!(
                    section_id = %section_id,
                    stage = "generation",
                    "section generation cancelled"
                );
                GeneratedSection {
                    section_id: section_id.clone(),
                    content: previous,
                    outcome: SectionOutcome::Cancelled,
                    history: None,
                }
            }
            Err(e) => {
                tracing::error!(
                    section_id = %section_id,
                    stage = "generation",
                    error = %e,
                    "section generation failed, keeping previous content"
                );
                GeneratedSection {
                    section_id: section_id.clone(),
                    content: previous,
                    outcome: SectionOutcome::Fallback(e.to_string()),
                    history: None,
                }
            }
        }
    }

    async fn try_generate(
        &self,
        section_id: &SectionId,
        relevant_info: &str,
        history: &SectionHistory,
    ) -> Result<String, PrdError> {
        let spec = self
            .catalog
            .get(section_id.as_str())
            .ok_or_else(|| StateError::UnknownSection(section_id.clone()))?;

        let enhanced = enhance_relevant_info(section_id.as_str(), relevant_info, history);
        let prompt = section_prompt(&spec.template, history);
        let prediction = history
            .last_content
            .clone()
            .filter(|c| c.chars().count() > self.prediction_threshold);
        let label = format!("{section_id} Section Generation");
        let options = GenerationOptions::new(label, self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_prediction(prediction);

        let completion = self
            .client
            .complete(prompt, vec![Message::user(enhanced)], options)
            .await?;
        let mut content = normalize_heading(spec.title(), &completion.text);

        let repairable = match section_id.as_str() {
            "project-overview" => contains_overview_info(relevant_info),
            "problem-statement" => true,
            _ => false,
        };
        let pending = count_pending(&content);
        if repairable && pending > 0 {
            tracing::warn!(
                section_id = %section_id,
                stage = "repair",
                pending,
                "[PENDING] placeholders remain despite provided info"
            );
            content = update_placeholders(&content, relevant_info);
        }

        if let Some(last) = history.last_content.as_deref() {
            let lingering = lingering_completed_items(last, &content);
            if !lingering.is_empty() {
                tracing::warn!(
                    section_id = %section_id,
                    stage = "verify",
                    count = lingering.len(),
                    "completed items were not removed from Next Steps"
                );
            }
        }

        Ok(content)
    }
}

/// Drop every top-level heading and put back exactly one `# title`
#[must_use]
pub fn normalize_heading(title: &str, text: &str) -> String {
    let body = HEADING_LINE.replace_all(text, "");
    format!("# {title}\n{}", body.trim())
}
