//! Live-query subscriptions: snapshot-then-updates over the change-event
//! hub.

mod common;

use common::*;
use palaver_core::ChatError;
use palaver_shared::MessageBody;

#[tokio::test]
async fn message_watch_sees_new_messages() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let mut watch = chat
        .watch_messages(Some(&auth("alice")), conversation)
        .unwrap();
    assert!(watch.snapshot().is_empty());

    chat.send_message(Some(&auth("bob")), &conversation, MessageBody::text("hey"), None)
        .unwrap();

    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].sender_name, "bob");
    assert_eq!(watch.snapshot().len(), 1);
}

#[tokio::test]
async fn message_watch_ignores_other_conversations() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    register(&chat, "carol");
    let ab = befriend(&chat, "alice", "bob");
    let ac = befriend(&chat, "alice", "carol");

    let mut watch = chat.watch_messages(Some(&auth("alice")), ab).unwrap();

    // A write in another conversation is filtered; the next relevant write
    // is the one that wakes the query.
    chat.send_message(Some(&auth("carol")), &ac, MessageBody::text("noise"), None)
        .unwrap();
    chat.send_message(Some(&auth("bob")), &ab, MessageBody::text("signal"), None)
        .unwrap();

    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].message.body, MessageBody::text("signal"));
}

#[tokio::test]
async fn request_watch_tracks_the_badge() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");

    let mut watch = chat.watch_received_requests(Some(&auth("bob"))).unwrap();
    assert!(watch.snapshot().is_empty());

    chat.send_friend_request(Some(&auth("alice")), &email("bob"))
        .unwrap();

    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].sender.username, "alice");
}

#[tokio::test]
async fn friends_watch_fires_on_acceptance() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");

    let mut watch = chat.watch_friends(Some(&auth("alice"))).unwrap();

    let request = chat
        .send_friend_request(Some(&auth("alice")), &email("bob"))
        .unwrap();
    chat.accept_request(Some(&auth("bob")), &request).unwrap();

    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].user.username, "bob");
}

#[tokio::test]
async fn typing_watch_is_conversation_scoped() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let mut watch = chat
        .watch_typing_users(Some(&auth("alice")), conversation)
        .unwrap();

    chat.set_typing(Some(&auth("bob")), &conversation, true)
        .unwrap();

    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].username, "bob");
}

#[tokio::test]
async fn call_watch_delivers_the_incoming_ring() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let mut watch = chat.watch_active_calls(Some(&auth("bob"))).unwrap();
    assert!(watch.snapshot().is_empty());

    let started = chat
        .initiate_call(
            Some(&auth("alice")),
            &conversation,
            palaver_shared::CallKind::Audio,
        )
        .unwrap();

    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].call.id, started.call_id);
}

#[tokio::test]
async fn registration_validates_the_caller() {
    let chat = chat();
    register(&chat, "alice");

    assert!(matches!(
        chat.watch_conversations(None),
        Err(ChatError::Unauthorized)
    ));
    assert!(matches!(
        chat.watch_received_requests(Some("auth_ghost")),
        Err(ChatError::NotFound("user"))
    ));
}

#[tokio::test]
async fn conversation_watch_follows_membership() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");

    let mut watch = chat.watch_conversations(Some(&auth("alice"))).unwrap();
    assert!(watch.snapshot().is_empty());

    let request = chat
        .send_friend_request(Some(&auth("alice")), &email("bob"))
        .unwrap();
    chat.accept_request(Some(&auth("bob")), &request).unwrap();

    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);
}
