//! Session-level turn flow: checkpoints, cancellation and restoration

use prd_core::{Attachment, ChatSession, PrdConfig, PrdError, TurnOutcome, CANCELLED_REPLY};
use prd_state::{GenerationStatus, MessageContent, Role, SectionCatalog, GREETING};
use prd_test_utils::{Reply, ScriptedBackend};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn chat(backend: ScriptedBackend) -> ChatSession {
    ChatSession::new(SectionCatalog::prd_default(), Arc::new(backend), PrdConfig::new())
}

async fn wait_until_busy(chat: &ChatSession) {
    while !chat.is_busy() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn turn_appends_exchange_and_checkpoints_before_it() {
    let chat = chat(ScriptedBackend::prd(true));
    let result = chat.send_message("We need a CSV export", &[]).await.unwrap();

    let state = chat.state().snapshot();
    assert_eq!(state.conversation.len(), 3);
    assert_eq!(state.conversation.messages[0].text(), GREETING);
    assert_eq!(state.conversation.messages[1].text(), "We need a CSV export");
    assert_eq!(state.conversation.messages[2].role, Role::Assistant);
    assert_eq!(state.conversation.messages[2].text(), result.response);
    assert_eq!(state.conversation.status, Default::default());

    assert!(chat.checkpoints().has_checkpoint_at(1));
    assert_eq!(chat.review().pending_diffs().len(), 8);
    assert_eq!(chat.summary(), "The user is describing their product.");
    assert!(!chat.is_busy());
}

#[tokio::test]
async fn attachments_are_sent_as_parts_and_listed_for_display() {
    let backend = Arc::new(ScriptedBackend::prd(false));
    let chat = ChatSession::new(SectionCatalog::prd_default(), backend.clone(), PrdConfig::new());

    let mockup = Attachment::new("mock.png", "data:image/png;base64,AAAA");
    chat.send_message("Here is the mockup", &[mockup]).await.unwrap();

    let shown = chat.state().snapshot().conversation.messages[1].text();
    assert_eq!(shown, "Here is the mockup\n\nAttached files:\n- mock.png");

    let router_call = backend
        .calls()
        .into_iter()
        .find(|r| r.options.label == "Router Agent")
        .unwrap();
    let latest = router_call.messages.last().unwrap();
    assert!(matches!(&latest.content, MessageContent::Parts(parts) if parts.len() == 2));
    assert_eq!(router_call.messages.len(), 2, "greeting plus the new message");
}

#[tokio::test]
async fn cancel_ends_the_turn_with_the_cancelled_reply() {
    let chat = chat(ScriptedBackend::prd(false).on("Conversation Agent", Reply::Hang));

    let canceller = async {
        wait_until_busy(&chat).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(chat.cancel());
        assert!(chat.is_busy(), "busy until the turn winds down");
        assert!(!chat.cancel(), "already cancelled");
    };
    let (result, ()) = tokio::join!(chat.send_message("hello", &[]), canceller);
    let result = result.unwrap();

    assert_eq!(result.response, CANCELLED_REPLY);
    assert_eq!(result.outcome, TurnOutcome::Cancelled);
    let state = chat.state().snapshot();
    assert_eq!(state.conversation.messages.last().unwrap().text(), CANCELLED_REPLY);
    assert!(!state.conversation.status.is_loading);
    assert!(!chat.cancel(), "nothing left to cancel");
}

#[tokio::test]
async fn dropped_turn_resets_transient_flags() {
    let chat = chat(ScriptedBackend::prd(false).on("Conversation Agent", Reply::Hang));

    let turn = chat.send_message("hello", &[]);
    assert!(tokio::time::timeout(Duration::from_millis(50), turn).await.is_err());

    assert!(!chat.is_busy());
    assert!(!chat.cancel());
    assert_eq!(chat.state().snapshot().conversation.status, GenerationStatus::default());
}

#[tokio::test]
async fn second_message_during_a_turn_is_rejected() {
    let chat = chat(ScriptedBackend::prd(false).on("Conversation Agent", Reply::Hang));

    let intruder = async {
        wait_until_busy(&chat).await;
        let second = chat.send_message("again", &[]).await;
        assert!(matches!(second, Err(PrdError::Busy)));
        chat.cancel();
    };
    let (first, ()) = tokio::join!(chat.send_message("first", &[]), intruder);
    assert_eq!(first.unwrap().outcome, TurnOutcome::Cancelled);
}

#[tokio::test]
async fn sending_after_restore_continues_from_the_checkpoint() {
    let chat = chat(ScriptedBackend::prd(true));
    chat.send_message("We need a CSV export", &[]).await.unwrap();
    chat.review().accept_all().unwrap();
    let accepted = chat.state().snapshot().document;
    chat.send_message("Also PDF export", &[]).await.unwrap();
    assert_eq!(chat.state().snapshot().conversation.len(), 5);

    let checkpoint = chat.restore(3).await.unwrap();
    assert_eq!(checkpoint.conversation_len(), 3);
    let restored = chat.state().snapshot();
    assert_eq!(restored.document, accepted);
    assert!(restored.diff.pending_diffs.is_empty());
    assert_eq!(restored.conversation.len(), 5, "later messages stay visible until the next turn");
    assert!(chat.checkpoints().is_after_restored(4));

    chat.send_message("Actually, Excel export", &[]).await.unwrap();
    let state = chat.state().snapshot();
    assert_eq!(state.conversation.len(), 5);
    assert_eq!(state.conversation.messages[3].text(), "Actually, Excel export");
    assert!(chat.checkpoints().restored().is_none());
}

#[tokio::test]
async fn undo_brings_back_the_state_before_restore() {
    let chat = chat(ScriptedBackend::prd(true));
    chat.send_message("We need a CSV export", &[]).await.unwrap();
    let before = chat.state().snapshot();

    chat.restore(1).await.unwrap();
    assert!(chat.review().pending_diffs().is_empty());
    chat.undo().await.unwrap();

    assert_eq!(chat.state().snapshot(), before);
    assert!(chat.undo().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn checkpoints_persist_to_the_configured_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoints.json");
    let mut config = PrdConfig::new().with_checkpoint_path(&path);
    config.checkpoint.autosave = true;

    let backend = Arc::new(ScriptedBackend::prd(false));
    let chat = ChatSession::new(SectionCatalog::prd_default(), backend, config.clone());
    chat.send_message("hello", &[]).await.unwrap();
    chat.send_message("again", &[]).await.unwrap();
    assert!(path.exists());

    let backend = Arc::new(ScriptedBackend::prd(false));
    let reopened = ChatSession::new(SectionCatalog::prd_default(), backend, config);
    assert_eq!(reopened.load_checkpoints().await.unwrap(), 2);
    assert!(reopened.checkpoints().has_checkpoint_at(3));
}
