#![allow(dead_code)]

use palaver_core::{AuthEvent, Chat};
use palaver_shared::{ConversationId, UserId};

pub fn chat() -> Chat {
    // Run with RUST_LOG=debug to see mutation logs; repeated init attempts
    // across test binaries are fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    Chat::in_memory().unwrap()
}

pub fn auth(name: &str) -> String {
    format!("auth_{name}")
}

pub fn email(name: &str) -> String {
    format!("{name}@example.com")
}

/// Simulate the identity-provider webhook creating a user.
pub fn register(chat: &Chat, name: &str) {
    chat.apply_auth_event(AuthEvent::Created {
        auth_id: auth(name),
        username: name.to_string(),
        img_url: format!("https://cdn.example/{name}.png"),
        email: email(name),
    })
    .unwrap();
}

pub fn user_id(chat: &Chat, name: &str) -> UserId {
    chat.user_by_auth(&auth(name)).unwrap().unwrap().id
}

/// Full request/accept round trip; returns the direct conversation.
pub fn befriend(chat: &Chat, a: &str, b: &str) -> ConversationId {
    let request = chat
        .send_friend_request(Some(&auth(a)), &email(b))
        .unwrap();
    chat.accept_request(Some(&auth(b)), &request).unwrap()
}

/// A group created by `creator` containing the given members.
pub fn group(chat: &Chat, creator: &str, name: &str, members: &[&str]) -> ConversationId {
    let ids: Vec<UserId> = members.iter().map(|m| user_id(chat, m)).collect();
    chat.create_group(Some(&auth(creator)), name, &ids).unwrap()
}
