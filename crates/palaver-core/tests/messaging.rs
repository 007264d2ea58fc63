//! Message ledger semantics: authorization, replies, edits, deletion, and
//! the last-message pointer.

mod common;

use common::*;
use palaver_core::ChatError;
use palaver_shared::{MessageBody, MessageKind};

#[test]
fn sending_requires_membership_and_identity() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    register(&chat, "carol");
    let conversation = befriend(&chat, "alice", "bob");

    assert!(matches!(
        chat.send_message(None, &conversation, MessageBody::text("x"), None),
        Err(ChatError::Unauthorized)
    ));
    assert!(matches!(
        chat.send_message(
            Some("auth_ghost"),
            &conversation,
            MessageBody::text("x"),
            None
        ),
        Err(ChatError::NotFound("user"))
    ));
    assert!(matches!(
        chat.send_message(
            Some(&auth("carol")),
            &conversation,
            MessageBody::text("x"),
            None
        ),
        Err(ChatError::NotMember)
    ));
}

#[test]
fn replies_must_stay_in_the_conversation() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    register(&chat, "carol");
    let ab = befriend(&chat, "alice", "bob");
    let ac = befriend(&chat, "alice", "carol");

    let target = chat
        .send_message(Some(&auth("bob")), &ab, MessageBody::text("root"), None)
        .unwrap();

    // Reply in the same conversation works and carries the reference.
    chat.send_message(
        Some(&auth("alice")),
        &ab,
        MessageBody::text("answer"),
        Some(target),
    )
    .unwrap();
    let listed = chat.messages(Some(&auth("alice")), &ab).unwrap();
    assert_eq!(listed[0].message.reply_to, Some(target));

    // Cross-conversation and dangling targets are both invalid.
    assert!(matches!(
        chat.send_message(
            Some(&auth("alice")),
            &ac,
            MessageBody::text("answer"),
            Some(target)
        ),
        Err(ChatError::InvalidReply)
    ));
    chat.delete_message(Some(&auth("bob")), &target).unwrap();
    assert!(matches!(
        chat.send_message(
            Some(&auth("alice")),
            &ab,
            MessageBody::text("answer"),
            Some(target)
        ),
        Err(ChatError::InvalidReply)
    ));
}

#[test]
fn editing_is_sender_only_and_sticky() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let message = chat
        .send_message(
            Some(&auth("bob")),
            &conversation,
            MessageBody::text("draft"),
            None,
        )
        .unwrap();

    assert!(matches!(
        chat.edit_message(Some(&auth("alice")), &message, vec!["hijack".into()]),
        Err(ChatError::NotSender)
    ));

    chat.edit_message(Some(&auth("bob")), &message, vec!["v2".into()])
        .unwrap();
    chat.edit_message(Some(&auth("bob")), &message, vec!["v3".into()])
        .unwrap();

    let listed = chat.messages(Some(&auth("alice")), &conversation).unwrap();
    let stored = &listed[0].message;
    assert_eq!(stored.body, MessageBody::text("v3"));
    assert!(stored.is_edited);
    assert_eq!(stored.conversation_id, conversation);
    assert_eq!(stored.sender_id, user_id(&chat, "bob"));
}

#[test]
fn editing_keeps_the_message_kind() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let message = chat
        .send_message(
            Some(&auth("bob")),
            &conversation,
            MessageBody::Image {
                urls: vec!["https://cdn.example/a.png".into()],
            },
            None,
        )
        .unwrap();

    chat.edit_message(
        Some(&auth("bob")),
        &message,
        vec!["https://cdn.example/b.png".into()],
    )
    .unwrap();

    let listed = chat.messages(Some(&auth("bob")), &conversation).unwrap();
    assert_eq!(listed[0].message.body.kind(), MessageKind::Image);
    assert_eq!(
        listed[0].message.body.parts(),
        vec!["https://cdn.example/b.png".to_string()]
    );
}

#[test]
fn deleting_the_last_message_repoints_the_preview() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let first = chat
        .send_message(Some(&auth("bob")), &conversation, MessageBody::text("one"), None)
        .unwrap();
    let second = chat
        .send_message(Some(&auth("bob")), &conversation, MessageBody::text("two"), None)
        .unwrap();

    chat.delete_message(Some(&auth("bob")), &second).unwrap();
    let summary = &chat.conversations(Some(&auth("alice"))).unwrap()[0];
    assert_eq!(
        summary.last_message.as_ref().map(|m| m.content.as_str()),
        Some("one")
    );

    chat.delete_message(Some(&auth("bob")), &first).unwrap();
    let summary = &chat.conversations(Some(&auth("alice"))).unwrap()[0];
    assert!(summary.last_message.is_none());
    assert!(summary.conversation.last_message_id.is_none());
}

#[test]
fn deleting_an_older_message_leaves_the_pointer_alone() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let first = chat
        .send_message(Some(&auth("bob")), &conversation, MessageBody::text("one"), None)
        .unwrap();
    chat.send_message(Some(&auth("bob")), &conversation, MessageBody::text("two"), None)
        .unwrap();

    chat.delete_message(Some(&auth("bob")), &first).unwrap();

    let summary = &chat.conversations(Some(&auth("alice"))).unwrap()[0];
    assert_eq!(
        summary.last_message.as_ref().map(|m| m.content.as_str()),
        Some("two")
    );
}

#[test]
fn deletion_is_sender_only() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let message = chat
        .send_message(Some(&auth("bob")), &conversation, MessageBody::text("keep"), None)
        .unwrap();

    assert!(matches!(
        chat.delete_message(Some(&auth("alice")), &message),
        Err(ChatError::NotSender)
    ));
    assert_eq!(
        chat.messages(Some(&auth("alice")), &conversation)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn listing_joins_sender_info_newest_first() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    chat.send_message(Some(&auth("bob")), &conversation, MessageBody::text("hi"), None)
        .unwrap();
    chat.send_message(
        Some(&auth("alice")),
        &conversation,
        MessageBody::text("hello"),
        None,
    )
    .unwrap();

    let listed = chat.messages(Some(&auth("alice")), &conversation).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].sender_name, "alice");
    assert!(listed[0].is_current_user);
    assert_eq!(listed[1].sender_name, "bob");
    assert!(!listed[1].is_current_user);
}

#[test]
fn media_content_is_returned_verbatim_and_previewed_as_placeholder() {
    let chat = chat();
    register(&chat, "alice");
    register(&chat, "bob");
    let conversation = befriend(&chat, "alice", "bob");

    let urls = vec![
        "https://cdn.example/a.pdf".to_string(),
        "https://cdn.example/b.pdf".to_string(),
    ];
    chat.send_message(
        Some(&auth("bob")),
        &conversation,
        MessageBody::File { urls: urls.clone() },
        None,
    )
    .unwrap();

    let listed = chat.messages(Some(&auth("alice")), &conversation).unwrap();
    assert_eq!(listed[0].message.body.parts(), urls);

    let summary = &chat.conversations(Some(&auth("alice"))).unwrap()[0];
    assert_eq!(
        summary.last_message.as_ref().map(|m| m.content.as_str()),
        Some("[Non-text]")
    );
    assert_eq!(
        summary.last_message.as_ref().map(|m| m.sender.as_str()),
        Some("bob")
    );
}
