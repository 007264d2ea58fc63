//! On-disk round trip: state survives closing and reopening the store.

mod common;

use common::*;
use palaver_core::Chat;
use palaver_shared::MessageBody;

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("palaver.db");

    let conversation = {
        let chat = Chat::open_at(&path).unwrap();
        register(&chat, "alice");
        register(&chat, "bob");
        let conversation = befriend(&chat, "alice", "bob");
        chat.send_message(
            Some(&auth("bob")),
            &conversation,
            MessageBody::text("still here"),
            None,
        )
        .unwrap();
        conversation
    };

    // Reopening runs the migration check again and finds everything intact.
    let chat = Chat::open_at(&path).unwrap();
    assert!(chat.user_by_auth(&auth("alice")).unwrap().is_some());

    let listed = chat.messages(Some(&auth("alice")), &conversation).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].message.body, MessageBody::text("still here"));

    let summary = &chat.conversations(Some(&auth("bob"))).unwrap()[0];
    assert_eq!(
        summary.last_message.as_ref().map(|m| m.content.as_str()),
        Some("still here")
    );
}
