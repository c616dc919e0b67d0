//! Pipeline configuration
//!
//! [`PrdConfig`] groups pipeline, pacing and checkpoint settings. Every
//! field has a default, so a TOML file only needs the keys it changes.

use crate::error::PrdError;
use prd_generation::PacingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How sections are chosen for a relevant turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every section receives the whole latest message
    #[default]
    TotalFanOut,
    /// Sections whose triggers match, plus any transition target
    TriggerBased,
}

/// Which router decides relevance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterKind {
    /// Ask the generation backend
    #[default]
    Model,
    /// Keyword rules over the catalog triggers
    Rules,
}

/// Settings of one turn of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Section selection policy
    pub selection: SelectionPolicy,
    /// Relevance router
    pub router: RouterKind,
    /// Earlier messages sent along with a new user message
    pub history_window: usize,
    /// Previous content longer than this is passed as a prediction hint
    pub prediction_threshold: usize,
    /// Router temperature
    pub router_temperature: f32,
    /// Router token limit
    pub router_max_tokens: u32,
    /// Per-section summary temperature
    pub summary_temperature: f32,
    /// Per-section summary token limit
    pub summary_max_tokens: u32,
    /// Section generation temperature
    pub section_temperature: f32,
    /// Section generation token limit
    pub section_max_tokens: u32,
    /// Conversational reply temperature
    pub conversation_temperature: f32,
    /// Conversation summary temperature
    pub conversation_summary_temperature: f32,
    /// Conversation summary token limit
    pub conversation_summary_max_tokens: u32,
    /// Propagate cancellation into section generation
    pub cancel_sections: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionPolicy::TotalFanOut,
            router: RouterKind::Model,
            history_window: 9,
            prediction_threshold: 100,
            router_temperature: 0.0,
            router_max_tokens: 1500,
            summary_temperature: 0.3,
            summary_max_tokens: 2000,
            section_temperature: 0.7,
            section_max_tokens: 4000,
            conversation_temperature: 0.8,
            conversation_summary_temperature: 0.4,
            conversation_summary_max_tokens: 1000,
            cancel_sections: false,
        }
    }
}

/// Checkpoint persistence settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// File the checkpoint list is saved to
    pub path: Option<PathBuf>,
    /// Save after every checkpoint creation
    pub autosave: bool,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrdConfig {
    /// Turn pipeline
    pub pipeline: PipelineConfig,
    /// Streamed token pacing
    pub pacing: PacingConfig,
    /// Checkpoint persistence
    pub checkpoint: CheckpointConfig,
}

impl PrdConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With selection policy
    #[inline]
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.pipeline.selection = selection;
        self
    }

    /// With router
    #[inline]
    #[must_use]
    pub fn with_router(mut self, router: RouterKind) -> Self {
        self.pipeline.router = router;
        self
    }

    /// With section cancellation
    #[inline]
    #[must_use]
    pub fn with_cancel_sections(mut self, cancel: bool) -> Self {
        self.pipeline.cancel_sections = cancel;
        self
    }

    /// With pacing
    #[inline]
    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    /// With checkpoint file
    #[inline]
    #[must_use]
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint.path = Some(path.into());
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// [`PrdError::Config`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self, PrdError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// [`PrdError::Config`] when the file is unreadable or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PrdError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// [`PrdError::Config`] if a value cannot be represented.
    pub fn to_toml_string(&self) -> Result<String, PrdError> {
        toml::to_string_pretty(self).map_err(|e| PrdError::Config(e.to_string()))
    }
}
