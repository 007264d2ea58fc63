//! Conversation directory: resolving a conversation for a caller, the
//! annotated conversation list, read positions, and group info.

use chrono::{DateTime, Duration, Utc};
use palaver_shared::{ConversationId, MessageId, UserId};
use palaver_store::{self as store, Conversation, GroupLeave, Membership, User};
use rusqlite::Connection;
use serde::Serialize;

use crate::events::ChangeEvent;
use crate::identity;
use crate::{Chat, ChatError};

/// Another member of a conversation, with their read position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: UserId,
    pub username: String,
    pub img_url: String,
    pub last_seen_message: Option<MessageId>,
}

/// One conversation resolved for a caller: a direct conversation carries the
/// single other member, a group carries all of them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub conversation: Conversation,
    pub others: Vec<MemberView>,
}

/// Preview of a conversation's most recent message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub sender: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// One entry of the caller's conversation list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation: Conversation,
    /// The counterparty; direct conversations only.
    pub other_member: Option<User>,
    pub last_message: Option<LastMessage>,
    /// Messages created after the caller's last-seen message, not authored
    /// by the caller.
    pub unseen_count: u64,
}

/// Group roster plus recent leave history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub members: Vec<MemberView>,
    pub recent_leaves: Vec<GroupLeave>,
    pub is_group: bool,
}

/// The authorization gate for every conversation-scoped operation.
pub(crate) fn require_membership(
    conn: &Connection,
    member: &UserId,
    conversation: &ConversationId,
) -> Result<Membership, ChatError> {
    store::members::find(conn, member, conversation)?.ok_or(ChatError::NotMember)
}

fn member_view(conn: &Connection, membership: &Membership) -> Result<MemberView, ChatError> {
    let user = store::users::get(conn, &membership.member_id).map_err(ChatError::missing("user"))?;
    Ok(MemberView {
        user_id: user.id,
        username: user.username,
        img_url: user.img_url,
        last_seen_message: membership.last_seen_message,
    })
}

fn last_message_details(
    conn: &Connection,
    id: Option<&MessageId>,
) -> Result<Option<LastMessage>, ChatError> {
    let Some(id) = id else { return Ok(None) };
    let Some(message) = store::messages::find(conn, id)? else {
        return Ok(None);
    };
    let sender = store::users::get(conn, &message.sender_id).map_err(ChatError::missing("user"))?;
    Ok(Some(LastMessage {
        sender: sender.username,
        content: message.body.preview(),
        sent_at: message.created_at,
    }))
}

impl Chat {
    /// Resolve one conversation for the caller.
    pub fn conversation(
        &self,
        session: Option<&str>,
        id: &ConversationId,
    ) -> Result<ConversationView, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        let conversation =
            store::conversations::get(conn, id).map_err(ChatError::missing("conversation"))?;
        require_membership(conn, &caller.id, id)?;

        let others = store::members::list_for_conversation(conn, id)?
            .iter()
            .filter(|m| m.member_id != caller.id)
            .map(|m| member_view(conn, m))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConversationView {
            conversation,
            others,
        })
    }

    /// Every conversation the caller belongs to, annotated with the resolved
    /// last message and the caller's unseen count.  Ordering by latest
    /// activity is left to the presentation layer.
    pub fn conversations(
        &self,
        session: Option<&str>,
    ) -> Result<Vec<ConversationSummary>, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        let memberships = store::members::list_for_user(conn, &caller.id)?;

        let mut summaries = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            let conversation = store::conversations::get(conn, &membership.conversation_id)
                .map_err(ChatError::missing("conversation"))?;

            let last_message = last_message_details(conn, conversation.last_message_id.as_ref())?;

            let last_seen_ts = match membership.last_seen_message.as_ref() {
                Some(id) => store::messages::find(conn, id)?.map(|m| m.created_at),
                None => None,
            };
            let unseen = store::messages::count_unseen(
                conn,
                &conversation.id,
                last_seen_ts.as_ref(),
                &caller.id,
            )?;

            let other_member = if conversation.is_group {
                None
            } else {
                match store::members::list_for_conversation(conn, &conversation.id)?
                    .into_iter()
                    .find(|m| m.member_id != caller.id)
                {
                    Some(other) => Some(
                        store::users::get(conn, &other.member_id)
                            .map_err(ChatError::missing("user"))?,
                    ),
                    None => None,
                }
            };

            summaries.push(ConversationSummary {
                conversation,
                other_member,
                last_message,
                unseen_count: unseen as u64,
            });
        }
        Ok(summaries)
    }

    /// Move the caller's read position to the given message.  Idempotent; a
    /// dangling message id clears the pointer rather than failing, since the
    /// pointer is advisory.
    pub fn mark_read(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
        message: &MessageId,
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let membership = require_membership(tx, &caller.id, conversation)?;
            let target = store::messages::find(tx, message)?;
            store::members::set_last_seen(tx, &membership.id, target.as_ref().map(|m| &m.id))?;
            Ok::<_, ChatError>(())
        })?;

        self.hub.publish(ChangeEvent::MembershipChanged {
            conversation: *conversation,
        });
        Ok(())
    }

    /// Current roster plus leave records from the retention window.  Only
    /// group conversations accumulate leave history.
    pub fn group_info(
        &self,
        session: Option<&str>,
        id: &ConversationId,
    ) -> Result<GroupInfo, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        identity::resolve(conn, session)?;
        let conversation =
            store::conversations::get(conn, id).map_err(ChatError::missing("conversation"))?;

        let members = store::members::list_for_conversation(conn, id)?
            .iter()
            .map(|m| member_view(conn, m))
            .collect::<Result<Vec<_>, _>>()?;

        let recent_leaves = if conversation.is_group {
            let since = Utc::now() - Duration::hours(self.config.leave_retention_hours);
            store::group_leaves::list_since(conn, id, since)?
        } else {
            Vec::new()
        };

        Ok(GroupInfo {
            members,
            recent_leaves,
            is_group: conversation.is_group,
        })
    }
}
