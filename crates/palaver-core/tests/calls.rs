//! Call session state machine: legal transitions, guards, and the
//! missed-call sweep.

mod common;

use common::*;
use palaver_core::{Chat, ChatError};
use palaver_shared::{CallKind, CallStatus, ChatConfig, ParticipantRole};
use palaver_store::Database;

fn chat_with_ring_timeout(secs: i64) -> Chat {
    Chat::with_config(
        Database::in_memory().unwrap(),
        ChatConfig {
            ring_timeout_secs: secs,
            ..ChatConfig::default()
        },
    )
}

#[test]
fn initiating_rings_every_member() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    register(&chat, "carol");
    let conversation = group(&chat, "alice", "trio", &["bob", "carol"]);

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Video)
        .unwrap();
    assert!(!started.room_id.is_empty());

    for name in ["alice", "bob", "carol"] {
        let active = chat.active_calls(Some(&auth(name))).unwrap();
        assert_eq!(active.len(), 1);
        let entry = &active[0];
        assert_eq!(entry.call.id, started.call_id);
        assert_eq!(entry.call.status, CallStatus::Ringing);
        assert_eq!(entry.call.kind, CallKind::Video);
        assert_eq!(entry.initiator.username, "alice");
        assert_eq!(entry.conversation.id, conversation);
        let expected_role = if name == "alice" {
            ParticipantRole::Initiator
        } else {
            ParticipantRole::Participant
        };
        assert_eq!(entry.participation.role, expected_role);
    }
}

#[test]
fn initiating_requires_membership() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    register(&chat, "carol");
    let conversation = befriend(&chat, "alice", "bob");

    assert!(matches!(
        chat.initiate_call(Some(&auth("carol")), &conversation, CallKind::Audio),
        Err(ChatError::NotMember)
    ));
}

#[test]
fn an_active_call_blocks_a_second_one() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();
    chat.answer_call(Some(&auth("bob")), &started.call_id)
        .unwrap();

    assert!(matches!(
        chat.initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio),
        Err(ChatError::CallInProgress)
    ));
}

#[test]
fn answering_moves_ringing_to_active_once() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    register(&chat, "carol");
    let conversation = befriend(&chat, "alice", "bob");

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();

    // A non-participant cannot answer.
    assert!(matches!(
        chat.answer_call(Some(&auth("carol")), &started.call_id),
        Err(ChatError::NotMember)
    ));

    let room = chat
        .answer_call(Some(&auth("bob")), &started.call_id)
        .unwrap();
    assert_eq!(room, started.room_id);

    let call = chat
        .call(Some(&auth("bob")), &started.call_id)
        .unwrap();
    assert_eq!(call.status, CallStatus::Active);
    assert!(call.answered_at.is_some());

    // Answering again is an illegal transition.
    assert!(matches!(
        chat.answer_call(Some(&auth("bob")), &started.call_id),
        Err(ChatError::InvalidCallState)
    ));
}

#[test]
fn rejecting_a_ringing_call_ends_the_notification() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();
    chat.reject_call(Some(&auth("bob")), &started.call_id)
        .unwrap();

    let call = chat
        .call(Some(&auth("alice")), &started.call_id)
        .unwrap();
    assert_eq!(call.status, CallStatus::Rejected);
    assert!(call.ended_at.is_some());
    assert!(chat.active_calls(Some(&auth("bob"))).unwrap().is_empty());
}

#[test]
fn only_the_initiator_cancels() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();

    assert!(matches!(
        chat.cancel_call(Some(&auth("bob")), &started.call_id),
        Err(ChatError::NotInitiator)
    ));

    chat.cancel_call(Some(&auth("alice")), &started.call_id)
        .unwrap();
    let call = chat
        .call(Some(&auth("alice")), &started.call_id)
        .unwrap();
    assert_eq!(call.status, CallStatus::Cancelled);
}

#[test]
fn ending_an_unanswered_call_has_zero_duration() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();
    chat.end_call(Some(&auth("alice")), &started.call_id)
        .unwrap();

    let call = chat
        .call(Some(&auth("alice")), &started.call_id)
        .unwrap();
    assert_eq!(call.status, CallStatus::Ended);
    assert_eq!(call.duration, Some(0));
}

#[test]
fn terminal_states_admit_no_transition() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();
    chat.answer_call(Some(&auth("bob")), &started.call_id)
        .unwrap();
    chat.end_call(Some(&auth("bob")), &started.call_id).unwrap();

    for result in [
        chat.answer_call(Some(&auth("bob")), &started.call_id).err(),
        chat.reject_call(Some(&auth("bob")), &started.call_id).err(),
        chat.cancel_call(Some(&auth("alice")), &started.call_id).err(),
        chat.end_call(Some(&auth("alice")), &started.call_id).err(),
    ] {
        assert!(matches!(result, Some(ChatError::InvalidCallState)));
    }

    let ended = chat
        .call(Some(&auth("bob")), &started.call_id)
        .unwrap();
    assert_eq!(ended.status, CallStatus::Ended);
    assert!(ended.duration.is_some());
}

#[test]
fn the_sweep_expires_stale_rings_into_missed() {
    let chat = chat_with_ring_timeout(0);
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let started = chat
        .initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();

    assert_eq!(chat.expire_unanswered().unwrap(), 1);

    let call = chat
        .call(Some(&auth("bob")), &started.call_id)
        .unwrap();
    assert_eq!(call.status, CallStatus::Missed);
    assert!(call.ended_at.is_some());
    assert!(chat.active_calls(Some(&auth("bob"))).unwrap().is_empty());

    // Nothing left to expire.
    assert_eq!(chat.expire_unanswered().unwrap(), 0);
}

#[test]
fn the_sweep_leaves_fresh_rings_alone() {
    let chat = chat(); // default 30 s timeout
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    chat.initiate_call(Some(&auth("alice")), &conversation, CallKind::Audio)
        .unwrap();

    assert_eq!(chat.expire_unanswered().unwrap(), 0);
    assert_eq!(chat.active_calls(Some(&auth("bob"))).unwrap().len(), 1);
}
