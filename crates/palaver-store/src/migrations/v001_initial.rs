//! v001 -- Initial schema creation.
//!
//! Creates the ten core tables: `users`, `conversations`,
//! `conversation_members`, `messages`, `requests`, `friends`,
//! `group_leaves`, `typing_status`, `calls`, and `call_participants`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    auth_id    TEXT NOT NULL UNIQUE,         -- external identity-provider id
    username   TEXT NOT NULL,
    img_url    TEXT NOT NULL,
    email      TEXT NOT NULL,
    is_online  INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    last_seen  TEXT,                         -- ISO-8601 / RFC-3339
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    name            TEXT,                       -- group conversations only
    is_group        INTEGER NOT NULL,
    last_message_id TEXT,                       -- pointer maintained by the rules layer
    created_at      TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Conversation members
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversation_members (
    id                TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    member_id         TEXT NOT NULL,              -- FK -> users(id)
    conversation_id   TEXT NOT NULL,              -- FK -> conversations(id)
    last_seen_message TEXT,                       -- read-position pointer
    created_at        TEXT NOT NULL,

    FOREIGN KEY (member_id)       REFERENCES users(id)         ON DELETE CASCADE,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
    UNIQUE (member_id, conversation_id)
);

CREATE INDEX IF NOT EXISTS idx_members_member       ON conversation_members(member_id);
CREATE INDEX IF NOT EXISTS idx_members_conversation ON conversation_members(conversation_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    sender_id       TEXT NOT NULL,              -- FK -> users(id)
    conversation_id TEXT NOT NULL,              -- FK -> conversations(id)
    kind            TEXT NOT NULL,              -- text/image/file/audio/system
    content         TEXT NOT NULL,              -- JSON array of strings
    is_edited       INTEGER NOT NULL DEFAULT 0,
    reply_to        TEXT,                       -- message id in the same conversation
    is_system       INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,

    FOREIGN KEY (sender_id)       REFERENCES users(id)         ON DELETE CASCADE,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, created_at DESC);

-- ----------------------------------------------------------------
-- Friend requests
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS requests (
    id         TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    sender     TEXT NOT NULL,              -- FK -> users(id)
    receiver   TEXT NOT NULL,              -- FK -> users(id)
    created_at TEXT NOT NULL,

    FOREIGN KEY (sender)   REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (receiver) REFERENCES users(id) ON DELETE CASCADE,
    UNIQUE (sender, receiver)
);

CREATE INDEX IF NOT EXISTS idx_requests_receiver ON requests(receiver);
CREATE INDEX IF NOT EXISTS idx_requests_sender   ON requests(sender);

-- ----------------------------------------------------------------
-- Friendships
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS friends (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user1           TEXT NOT NULL,              -- FK -> users(id)
    user2           TEXT NOT NULL,              -- FK -> users(id)
    conversation_id TEXT NOT NULL,              -- FK -> conversations(id)
    created_at      TEXT NOT NULL,

    FOREIGN KEY (user1)           REFERENCES users(id)         ON DELETE CASCADE,
    FOREIGN KEY (user2)           REFERENCES users(id)         ON DELETE CASCADE,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_friends_user1        ON friends(user1);
CREATE INDEX IF NOT EXISTS idx_friends_user2        ON friends(user2);
CREATE INDEX IF NOT EXISTS idx_friends_conversation ON friends(conversation_id);

-- ----------------------------------------------------------------
-- Group leaves (append-only history, username snapshot survives the user)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_leaves (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user_id         TEXT NOT NULL,
    conversation_id TEXT NOT NULL,              -- FK -> conversations(id)
    username        TEXT NOT NULL,
    left_at         TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_group_leaves_conversation ON group_leaves(conversation_id);

-- ----------------------------------------------------------------
-- Typing status
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS typing_status (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user_id         TEXT NOT NULL,              -- FK -> users(id)
    conversation_id TEXT NOT NULL,              -- FK -> conversations(id)
    is_typing       INTEGER NOT NULL,
    last_typing_at  TEXT NOT NULL,

    FOREIGN KEY (user_id)         REFERENCES users(id)         ON DELETE CASCADE,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
    UNIQUE (user_id, conversation_id)
);

CREATE INDEX IF NOT EXISTS idx_typing_conversation ON typing_status(conversation_id);

-- ----------------------------------------------------------------
-- Calls
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS calls (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation_id TEXT NOT NULL,              -- FK -> conversations(id)
    initiator_id    TEXT NOT NULL,
    status          TEXT NOT NULL,              -- ringing/active/ended/rejected/missed/cancelled
    kind            TEXT NOT NULL,              -- audio/video
    room_id         TEXT NOT NULL,              -- opaque id for the media service
    started_at      TEXT NOT NULL,
    answered_at     TEXT,
    ended_at        TEXT,
    duration        INTEGER,                    -- whole seconds, set when the call ends

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_calls_conversation_status ON calls(conversation_id, status);

-- ----------------------------------------------------------------
-- Call participants
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS call_participants (
    id        TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    call_id   TEXT NOT NULL,              -- FK -> calls(id)
    user_id   TEXT NOT NULL,
    role      TEXT NOT NULL,              -- initiator/participant
    joined_at TEXT,
    left_at   TEXT,

    FOREIGN KEY (call_id) REFERENCES calls(id) ON DELETE CASCADE,
    UNIQUE (call_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_call_participants_user ON call_participants(user_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
