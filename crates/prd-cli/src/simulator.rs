//! Seeded session simulator
//!
//! Drives a [`ChatSession`] over a scripted backend with a random mix of
//! turns, diff resolutions and checkpoint restores, checking after every
//! operation that:
//! - sections stay in catalog order
//! - pending proposals never touch live content
//! - the three diff maps track the same sections
//! - accepting writes the proposed content, rejecting keeps the pre-episode content
//! - every turn is preceded by a checkpoint
//! - undo brings back exactly the state replaced by a restore

use prd_core::{ChatSession, PrdConfig, PrdError};
use prd_state::{SectionCatalog, SessionState};
use prd_test_utils::{first_line, Reply, ScriptedBackend};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

const RELATED_MESSAGES: &[&str] = &[
    "We need a CSV export for invoices",
    "We need the scope to exclude mobile",
    "We need a budget of $500k",
    "We need SSO for enterprise customers",
    "We need this live by Q3",
];

const CHATTER: &[&str] = &["Thanks!", "hello", "What do you think so far?", "ok"];

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Operations to run
    pub total_operations: u64,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Session configuration
    pub session: PrdConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 200,
            stop_on_first_violation: true,
            session: PrdConfig::default(),
        }
    }
}

/// One simulated user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedOperation {
    /// Send a chat message
    Send(String),
    /// Accept the n-th pending diff
    AcceptOne(usize),
    /// Reject the n-th pending diff
    RejectOne(usize),
    /// Accept every pending diff
    AcceptAll,
    /// Reject every pending diff
    RejectAll,
    /// Restore the n-th checkpoint
    Restore(usize),
    /// Undo the active restoration
    Undo,
}

/// A broken invariant
#[derive(Debug, Clone)]
pub enum Violation {
    /// Document sections no longer follow the catalog
    SectionOrderBroken { operation: SimulatedOperation },
    /// Live content of a pending section differs from its pre-episode content
    LiveContentTouched {
        operation: SimulatedOperation,
        section_id: String,
    },
    /// Diff maps disagree on which sections are pending
    DiffMapsDiverged { operation: SimulatedOperation },
    /// Accepted section does not carry the proposed content
    AcceptNotApplied { section_id: String },
    /// Rejected section does not carry its pre-episode content
    RejectNotRestored { section_id: String },
    /// Diffs remain after resolving all of them
    PendingAfterResolveAll { operation: SimulatedOperation },
    /// No checkpoint exists for the state before a turn
    MissingCheckpoint { conversation_len: usize },
    /// Conversation did not grow by one exchange
    ConversationLength { expected: usize, actual: usize },
    /// Restored document differs from the checkpoint's
    RestoreMismatch { conversation_len: usize },
    /// Undo did not reinstate the pre-restore state
    UndoMismatch,
    /// An operation failed where it should have succeeded
    UnexpectedError {
        operation: SimulatedOperation,
        error: String,
    },
}

/// Counters collected during a run
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    pub operations: u64,
    pub turns: u64,
    pub diffs_proposed: u64,
    pub diffs_accepted: u64,
    pub diffs_rejected: u64,
    pub restores: u64,
    pub undos: u64,
}

/// Final report from the simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: SimulatorStats,
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// Whether no invariant was broken
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== PRD Forge Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Operations: {}\n", self.stats.operations));
        report.push_str(&format!("Turns: {}\n", self.stats.turns));
        report.push_str(&format!("Diffs Proposed: {}\n", self.stats.diffs_proposed));
        report.push_str(&format!("Diffs Accepted: {}\n", self.stats.diffs_accepted));
        report.push_str(&format!("Diffs Rejected: {}\n", self.stats.diffs_rejected));
        report.push_str(&format!("Restores: {}\n", self.stats.restores));
        report.push_str(&format!("Undos: {}\n", self.stats.undos));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

/// Backend whose router flags messages containing "need" as document content
#[must_use]
pub fn simulation_backend() -> ScriptedBackend {
    ScriptedBackend::prd(true).on(
        "Router Agent",
        Reply::with(|r| {
            let related = first_line(r).contains("need");
            Ok(format!("{{\"is_prd_section_related\": {related}}}"))
        }),
    )
}

struct Run {
    chat: ChatSession,
    catalog: SectionCatalog,
    stats: SimulatorStats,
    violations: Vec<Violation>,
    pre_restore: Option<SessionState>,
}

/// Run the simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let catalog = SectionCatalog::prd_default();
    let backend = Arc::new(simulation_backend());
    let chat = ChatSession::new(catalog.clone(), backend, config.session.clone());

    let mut run = Run {
        chat,
        catalog,
        stats: SimulatorStats::default(),
        violations: Vec::new(),
        pre_restore: None,
    };

    tracing::info!(seed = config.seed, operations = config.total_operations, "simulation started");
    for _ in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &run);
        let before = run.violations.len();
        run.execute(&operation).await;
        run.check_state(&operation);
        run.stats.operations += 1;

        if run.violations.len() > before {
            tracing::warn!(?operation, "invariant violated");
            if config.stop_on_first_violation {
                break;
            }
        }
    }
    tracing::info!(violations = run.violations.len(), "simulation finished");

    SimulatorReport {
        config,
        stats: run.stats,
        violations: run.violations,
    }
}

fn generate_operation(rng: &mut StdRng, run: &Run) -> SimulatedOperation {
    let pending = run.chat.review().pending_diffs().len();
    let checkpoints = run.chat.checkpoints().checkpoints().len();

    match rng.random_range(0..100) {
        0..=34 => {
            let pool = if rng.random_bool(0.7) { RELATED_MESSAGES } else { CHATTER };
            SimulatedOperation::Send(pool[rng.random_range(0..pool.len())].to_string())
        }
        35..=49 if pending > 0 => SimulatedOperation::AcceptOne(rng.random_range(0..pending)),
        50..=64 if pending > 0 => SimulatedOperation::RejectOne(rng.random_range(0..pending)),
        65..=72 => SimulatedOperation::AcceptAll,
        73..=79 => SimulatedOperation::RejectAll,
        80..=91 if checkpoints > 0 => SimulatedOperation::Restore(rng.random_range(0..checkpoints)),
        92..=99 => SimulatedOperation::Undo,
        _ => SimulatedOperation::AcceptAll,
    }
}

impl Run {
    async fn execute(&mut self, operation: &SimulatedOperation) {
        match operation {
            SimulatedOperation::Send(text) => self.send(operation, text).await,
            SimulatedOperation::AcceptOne(index) => self.resolve_one(operation, *index, true),
            SimulatedOperation::RejectOne(index) => self.resolve_one(operation, *index, false),
            SimulatedOperation::AcceptAll | SimulatedOperation::RejectAll => {
                self.resolve_all(operation)
            }
            SimulatedOperation::Restore(index) => self.restore(operation, *index).await,
            SimulatedOperation::Undo => self.undo(operation).await,
        }
    }

    async fn send(&mut self, operation: &SimulatedOperation, text: &str) {
        let current = self.chat.state().read(|s| s.conversation.len());
        let start_len = self
            .chat
            .checkpoints()
            .restored()
            .map_or(current, |r| r.checkpoint.conversation_len().min(current));

        match self.chat.send_message(text, &[]).await {
            Ok(result) => {
                self.stats.turns += 1;
                self.stats.diffs_proposed += result.diffs.len() as u64;
                self.pre_restore = None;
            }
            Err(e) => return self.unexpected(operation, &e),
        }

        if !self.chat.checkpoints().has_checkpoint_at(start_len) {
            self.violations.push(Violation::MissingCheckpoint {
                conversation_len: start_len,
            });
        }
        let actual = self.chat.state().read(|s| s.conversation.len());
        if actual != start_len + 2 {
            self.violations.push(Violation::ConversationLength {
                expected: start_len + 2,
                actual,
            });
        }
    }

    fn resolve_one(&mut self, operation: &SimulatedOperation, index: usize, accept: bool) {
        let state = self.chat.state().snapshot();
        let Some(diff) = state.pending_diffs().into_iter().nth(index) else {
            return;
        };
        let id = diff.section_id.as_str();
        let expected = if accept {
            state.diff.pending_changes.get(id).cloned()
        } else {
            state.diff.previous_content.get(id).cloned()
        };

        let review = self.chat.review();
        let outcome = if accept { review.accept_one(id) } else { review.reject_one(id) };
        if let Err(e) = outcome {
            return self.unexpected(operation, &PrdError::from(e));
        }

        let after = self.chat.state().snapshot();
        let applied = after.document.content(id).map(str::to_string) == expected
            && !after.diff.is_pending(id);
        match (accept, applied) {
            (true, true) => self.stats.diffs_accepted += 1,
            (false, true) => self.stats.diffs_rejected += 1,
            (true, false) => self.violations.push(Violation::AcceptNotApplied {
                section_id: id.to_string(),
            }),
            (false, false) => self.violations.push(Violation::RejectNotRestored {
                section_id: id.to_string(),
            }),
        }
    }

    fn resolve_all(&mut self, operation: &SimulatedOperation) {
        let accept = *operation == SimulatedOperation::AcceptAll;
        let review = self.chat.review();
        let outcome = if accept { review.accept_all() } else { review.reject_all() };
        match outcome {
            Ok(n) if accept => self.stats.diffs_accepted += n as u64,
            Ok(n) => self.stats.diffs_rejected += n as u64,
            Err(e) => return self.unexpected(operation, &PrdError::from(e)),
        }

        let diff = self.chat.state().read(|s| s.diff.clone());
        if diff.has_pending()
            || !diff.pending_changes.is_empty()
            || !diff.previous_content.is_empty()
        {
            self.violations.push(Violation::PendingAfterResolveAll {
                operation: operation.clone(),
            });
        }
    }

    async fn restore(&mut self, operation: &SimulatedOperation, index: usize) {
        let Some(target) = self.chat.checkpoints().checkpoints().into_iter().nth(index) else {
            return;
        };
        let before = self.chat.state().snapshot();
        let conversation_len = target.conversation_len();

        match self.chat.restore(conversation_len).await {
            Ok(checkpoint) => {
                self.stats.restores += 1;
                self.pre_restore.get_or_insert(before);
                if self.chat.state().read(|s| s.document != checkpoint.state().document) {
                    self.violations.push(Violation::RestoreMismatch { conversation_len });
                }
            }
            Err(e) => self.unexpected(operation, &e),
        }
    }

    async fn undo(&mut self, operation: &SimulatedOperation) {
        let result = self.chat.undo().await;
        match (self.pre_restore.take(), result) {
            (Some(expected), Ok(())) => {
                self.stats.undos += 1;
                if self.chat.state().snapshot() != expected {
                    self.violations.push(Violation::UndoMismatch);
                }
            }
            (None, Err(e)) if e.is_not_found() => {}
            (_, Err(e)) => self.unexpected(operation, &e),
            (None, Ok(())) => self.violations.push(Violation::UnexpectedError {
                operation: operation.clone(),
                error: "undo succeeded without a restoration".into(),
            }),
        }
    }

    fn check_state(&mut self, operation: &SimulatedOperation) {
        let state = self.chat.state().snapshot();

        let in_order = state
            .document
            .sections
            .iter()
            .map(|s| &s.id)
            .eq(self.catalog.ids());
        if !in_order {
            self.violations.push(Violation::SectionOrderBroken {
                operation: operation.clone(),
            });
        }

        let diff = &state.diff;
        let same_keys = diff.pending_diffs.keys().eq(diff.pending_changes.keys())
            && diff.pending_diffs.keys().eq(diff.previous_content.keys());
        if !same_keys {
            self.violations.push(Violation::DiffMapsDiverged {
                operation: operation.clone(),
            });
        }

        for (id, previous) in &diff.previous_content {
            if state.document.content(id.as_str()) != Some(previous.as_str()) {
                self.violations.push(Violation::LiveContentTouched {
                    operation: operation.clone(),
                    section_id: id.to_string(),
                });
            }
        }
    }

    fn unexpected(&mut self, operation: &SimulatedOperation, error: &PrdError) {
        self.violations.push(Violation::UnexpectedError {
            operation: operation.clone(),
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn seeded_run_passes() {
        let report = run_simulator(SimulatorConfig {
            seed: 7,
            total_operations: 60,
            ..SimulatorConfig::default()
        })
        .await;
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.operations, 60);
        assert!(report.stats.turns > 0);
    }

    #[tokio::test]
    async fn same_seed_same_stats() {
        let config = SimulatorConfig {
            seed: 11,
            total_operations: 40,
            ..SimulatorConfig::default()
        };
        let a = run_simulator(config.clone()).await;
        let b = run_simulator(config).await;
        assert_eq!(format!("{:?}", a.stats), format!("{:?}", b.stats));
    }

    #[test]
    fn report_text_shows_result() {
        let report = SimulatorReport {
            config: SimulatorConfig::default(),
            stats: SimulatorStats::default(),
            violations: vec![Violation::UndoMismatch],
        };
        let text = report.generate_text();
        assert!(text.contains("1. UndoMismatch"));
        assert!(text.ends_with("=== Result: FAIL ===\n"));
    }
}
