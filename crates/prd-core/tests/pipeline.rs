//! Turn pipeline against scripted backends

use prd_core::{
    Orchestrator, PipelineConfig, SectionOutcome, SelectionPolicy, TransitionTarget, TurnOptions,
    TurnOutcome, APOLOGY_REPLY, CANCELLED_REPLY, TROUBLE_REPLY,
};
use prd_generation::{CancellationToken, GenerationBackend, GenerationClient, NoopCallbacks};
use prd_state::{Message, SectionHistory, SectionId, SharedSession, INITIAL_PLACEHOLDER};
use prd_test_utils::{prd_session, rated_section, FailingBackend, Reply, ScriptedBackend};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(
    session: &SharedSession,
    backend: impl GenerationBackend + 'static,
    config: &PipelineConfig,
) -> Orchestrator {
    Orchestrator::new(session.clone(), GenerationClient::new(Arc::new(backend)), config)
}

#[tokio::test]
async fn relevant_turn_proposes_one_diff_per_section() {
    let session = prd_session();
    let before = session.snapshot();
    let orchestrator =
        orchestrator(&session, ScriptedBackend::prd(true), &PipelineConfig::default());

    let result = orchestrator
        .process_turn(&[Message::user("Add a requirement: export to CSV")], TurnOptions::default())
        .await;

    assert_eq!(result.outcome, TurnOutcome::Completed);
    assert_eq!(result.section_updates.len(), session.catalog().len());
    assert_eq!(result.diffs.len(), session.catalog().len());
    for diff in &result.diffs {
        assert_eq!(
            Some(diff.old_content.as_str()),
            before.document.content(diff.section_id.as_str()),
            "old content of {}",
            diff.section_id
        );
    }

    let after = session.snapshot();
    assert_eq!(after.document.sections, before.document.sections);
    assert!(after.diff.show_diff);
    assert_eq!(orchestrator.review().pending_diffs().len(), session.catalog().len());
}

#[tokio::test]
async fn failed_generation_keeps_last_content() {
    let session = prd_session();
    session.update(|s| {
        s.document.set_history(
            SectionId::new("scope"),
            SectionHistory::default()
                .with_generated("# Scope of the Project\nBilling only", chrono::Utc::now()),
        );
    });
    let before = session.snapshot();
    let backend = ScriptedBackend::prd(true).on("Section Generation", Reply::fail("timeout"));

    let result = orchestrator(&session, backend, &PipelineConfig::default())
        .process_turn(&[Message::user("Add invoicing to scope")], TurnOptions::default())
        .await;

    assert!(result.diffs.is_empty());
    assert!(result
        .section_updates
        .iter()
        .all(|u| matches!(u.outcome, SectionOutcome::Fallback(_))));
    let after = session.snapshot();
    for id in session.catalog().ids() {
        assert_eq!(
            after.document.history_of(id.as_str()).last_content,
            before.document.history_of(id.as_str()).last_content,
            "history of {id}"
        );
    }
    assert_eq!(after.document.sections, before.document.sections);
}

#[tokio::test]
async fn failing_router_never_updates_sections() {
    let session = prd_session();
    let backend = ScriptedBackend::prd(true).on("Router Agent", Reply::fail("classifier down"));
    let result = orchestrator(&session, backend, &PipelineConfig::default())
        .process_turn(&[Message::user("Budget is $500k")], TurnOptions::default())
        .await;
    assert!(result.section_updates.is_empty());
    assert!(result.diffs.is_empty());
}

#[tokio::test]
async fn unavailable_backend_degrades_to_fixed_reply() {
    let session = prd_session();
    let before = session.snapshot();
    let result = orchestrator(&session, FailingBackend, &PipelineConfig::default())
        .process_turn(
            &[Message::user("Budget is $500k")],
            TurnOptions {
                summary: "so far",
                ..TurnOptions::default()
            },
        )
        .await;

    assert_eq!(result.response, TROUBLE_REPLY);
    assert!(result.section_updates.is_empty());
    assert_eq!(result.updated_summary, "so far");
    assert_eq!(session.snapshot(), before);
}

#[tokio::test]
async fn history_tracks_last_generated_content() {
    let session = prd_session();
    let orchestrator =
        orchestrator(&session, ScriptedBackend::prd(true), &PipelineConfig::default());
    let result = orchestrator
        .process_turn(&[Message::user("Scope covers billing")], TurnOptions::default())
        .await;
    let generated = result
        .section_updates
        .iter()
        .find(|u| u.section_id.as_str() == "scope")
        .map(|u| u.content.clone())
        .unwrap();

    orchestrator.review().reject_all().unwrap();

    let state = session.snapshot();
    let history = state.document.history_of("scope");
    assert_eq!(history.last_content.as_deref(), Some(generated.as_str()));
    assert!(history.last_relevant_info.is_empty(), "diff path leaves relevant info unwritten");
    assert_eq!(
        state.document.content("scope"),
        Some(format!("# Scope of the Project\n{INITIAL_PLACEHOLDER}").as_str())
    );
}

#[tokio::test]
async fn unchanged_content_writes_full_history() {
    let session = prd_session();
    let backend =
        ScriptedBackend::prd(true).on("Section Generation", Reply::text(INITIAL_PLACEHOLDER));
    let result = orchestrator(&session, backend, &PipelineConfig::default())
        .process_turn(&[Message::user("Nothing new really")], TurnOptions::default())
        .await;

    assert!(result.diffs.is_empty());
    let history = session.snapshot().document.history_of("scope");
    assert_eq!(history.last_relevant_info, "Nothing new really");
    assert!(history.chat_summary.starts_with("Latest update:"));
    assert!(history.chat_summary.ends_with("Nothing new really"));
}

#[tokio::test]
async fn transition_focuses_least_complete_section() {
    let session = prd_session();
    session.update(|s| {
        for id in ["project-overview", "problem-statement"] {
            s.document.set_history(
                SectionId::new(id),
                SectionHistory::default()
                    .with_generated(rated_section("x", "★★★★☆", &[]), chrono::Utc::now()),
            );
        }
    });

    let result = orchestrator(&session, ScriptedBackend::prd(false), &PipelineConfig::default())
        .process_turn(&[Message::user("Looks good, next section please")], TurnOptions::default())
        .await;

    assert_eq!(result.transition, Some(TransitionTarget::Next));
    assert_eq!(result.focus_section, Some(SectionId::new("scope")));
}

#[tokio::test]
async fn trigger_policy_updates_matching_and_targeted_sections() {
    let session = prd_session();
    let config = PipelineConfig {
        selection: SelectionPolicy::TriggerBased,
        ..PipelineConfig::default()
    };
    let result = orchestrator(&session, ScriptedBackend::prd(true), &config)
        .process_turn(
            &[Message::user("Let's talk about scope: we exclude mobile")],
            TurnOptions::default(),
        )
        .await;

    let ids: Vec<&str> = result.section_updates.iter().map(|u| u.section_id.as_str()).collect();
    assert_eq!(ids, vec!["scope"]);
    assert_eq!(result.focus_section, Some(SectionId::new("scope")));
}

#[tokio::test]
async fn cancelling_the_reply_keeps_section_updates() {
    let session = prd_session();
    let backend = ScriptedBackend::prd(true).on("Conversation Agent", Reply::Hang);
    let orchestrator = orchestrator(&session, backend, &PipelineConfig::default());
    let token = CancellationToken::new();

    let trigger = token.clone();
    let cancel_later = async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    };
    let messages = [Message::user("Add CSV export")];
    let turn = orchestrator.process_turn(
        &messages,
        TurnOptions {
            callbacks: Some(&NoopCallbacks),
            cancel: Some(&token),
            summary: "before",
            ..TurnOptions::default()
        },
    );
    let (result, ()) = tokio::join!(turn, cancel_later);

    assert_eq!(result.response, CANCELLED_REPLY);
    assert_eq!(result.outcome, TurnOutcome::Cancelled);
    assert_eq!(result.section_updates.len(), session.catalog().len());
    assert_eq!(result.updated_summary, "before");
}

#[tokio::test]
async fn cancellable_sections_report_cancelled_outcomes() {
    let session = prd_session();
    let before = session.snapshot();
    let backend = ScriptedBackend::prd(true).on("Section Generation", Reply::Hang);
    let config = PipelineConfig {
        cancel_sections: true,
        ..PipelineConfig::default()
    };
    let token = CancellationToken::new();
    token.cancel();

    let result = orchestrator(&session, backend, &config)
        .process_turn(
            &[Message::user("Add CSV export")],
            TurnOptions {
                cancel: Some(&token),
                ..TurnOptions::default()
            },
        )
        .await;

    assert_eq!(result.response, CANCELLED_REPLY);
    assert!(result.section_updates.iter().all(|u| u.outcome == SectionOutcome::Cancelled));
    assert!(result.diffs.is_empty());
    assert_eq!(session.snapshot().document, before.document);
}

#[tokio::test]
async fn apology_is_not_used_for_ordinary_turns() {
    let session = prd_session();
    let result = orchestrator(&session, ScriptedBackend::prd(false), &PipelineConfig::default())
        .process_turn(&[Message::user("hello")], TurnOptions::default())
        .await;
    assert_ne!(result.response, APOLOGY_REPLY);
    assert_eq!(result.updated_summary, "The user is describing their product.");
}
