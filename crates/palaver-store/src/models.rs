//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a host process over IPC.

use chrono::{DateTime, Utc};
use palaver_shared::{
    CallId, CallKind, CallStatus, ConversationId, MessageBody, MessageId, ParticipantRole,
    RequestId, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user identity, created and updated by identity-provider events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    /// Identifier assigned by the external identity provider.
    pub auth_id: String,
    pub username: String,
    pub img_url: String,
    pub email: String,
    pub is_online: bool,
    /// Refreshed when the user goes offline.
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A direct (2-party) or group (N-party) message thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    /// Group conversations only.
    pub name: Option<String>,
    pub is_group: bool,
    /// Pointer to the most recent message, kept in step with every send and
    /// delete.
    pub last_message_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// The relation linking a user to a conversation, with their read position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub id: Uuid,
    pub member_id: UserId,
    pub conversation_id: ConversationId,
    pub last_seen_message: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single message.  `body` carries the kind-specific payload; editing
/// replaces the payload within the same kind and never moves the message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub conversation_id: ConversationId,
    pub body: MessageBody,
    pub is_edited: bool,
    /// Reply target; always a message in the same conversation.
    pub reply_to: Option<MessageId>,
    /// Authored on behalf of a membership event rather than typed input.
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Friend request
// ---------------------------------------------------------------------------

/// A pending friend request.  At most one per ordered (sender, receiver)
/// pair; deleted on accept/deny/cancel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendRequest {
    pub id: RequestId,
    pub sender: UserId,
    pub receiver: UserId,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Friendship
// ---------------------------------------------------------------------------

/// An accepted relation between two users, always paired with exactly one
/// direct conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Friendship {
    pub id: Uuid,
    pub user1: UserId,
    pub user2: UserId,
    pub conversation_id: ConversationId,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Group leave
// ---------------------------------------------------------------------------

/// Historical record of a user leaving a group.  The username is a snapshot
/// so the record stays readable after the user is gone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupLeave {
    pub id: Uuid,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub username: String,
    pub left_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Typing status
// ---------------------------------------------------------------------------

/// Per-(user, conversation) typing flag.  The stored flag alone is never
/// trusted; readers apply the staleness window to `last_typing_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingStatus {
    pub id: Uuid,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub is_typing: bool,
    pub last_typing_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Call
// ---------------------------------------------------------------------------

/// One call session tied to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Call {
    pub id: CallId,
    pub conversation_id: ConversationId,
    pub initiator_id: UserId,
    pub status: CallStatus,
    pub kind: CallKind,
    /// Opaque room identifier handed to the external media service.
    pub room_id: String,
    pub started_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Whole seconds between answer and end; 0 if never answered.
    pub duration: Option<i64>,
}

// ---------------------------------------------------------------------------
// Call participant
// ---------------------------------------------------------------------------

/// Per-(call, user) roster entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallParticipant {
    pub id: Uuid,
    pub call_id: CallId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
}
