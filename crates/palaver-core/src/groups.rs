//! Group membership lifecycle: create, add members, self-leave, delete.
//!
//! Joins and leaves emit a system message inside the same transaction, so
//! the conversation preview and the membership change land together.

use chrono::Utc;
use palaver_shared::{ConversationId, UserId};
use palaver_store::{self as store, Conversation, GroupLeave, Membership};
use uuid::Uuid;

use crate::conversations::require_membership;
use crate::events::ChangeEvent;
use crate::identity;
use crate::messages::append_system;
use crate::{Chat, ChatError};

impl Chat {
    /// Create a group conversation with the caller and at least one other
    /// member.  Duplicate ids and the caller's own id are ignored.
    pub fn create_group(
        &self,
        session: Option<&str>,
        name: &str,
        member_ids: &[UserId],
    ) -> Result<ConversationId, ChatError> {
        let mut db = self.db()?;
        let conversation_id = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;

            let mut members: Vec<UserId> = Vec::new();
            for id in member_ids {
                if *id != caller.id && !members.contains(id) {
                    members.push(*id);
                }
            }
            if members.is_empty() {
                return Err(ChatError::InvalidMembers);
            }

            let now = Utc::now();
            let conversation = Conversation {
                id: ConversationId::new(),
                name: Some(name.to_string()),
                is_group: true,
                last_message_id: None,
                created_at: now,
            };
            store::conversations::insert(tx, &conversation)?;

            for member in members.iter().chain(std::iter::once(&caller.id)) {
                store::users::get(tx, member).map_err(ChatError::missing("user"))?;
                store::members::insert(
                    tx,
                    &Membership {
                        id: Uuid::new_v4(),
                        member_id: *member,
                        conversation_id: conversation.id,
                        last_seen_message: None,
                        created_at: now,
                    },
                )?;
            }

            tracing::info!(
                conversation = %conversation.id,
                members = members.len() + 1,
                "group created"
            );
            Ok(conversation.id)
        })?;

        self.hub.publish(ChangeEvent::MembershipChanged {
            conversation: conversation_id,
        });
        Ok(conversation_id)
    }

    /// Add members to an existing group.  Each join emits a system message.
    pub fn add_group_members(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
        member_ids: &[UserId],
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let appended = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::conversations::get(tx, conversation)
                .map_err(ChatError::missing("conversation"))?;
            if !existing.is_group {
                return Err(ChatError::NotGroup);
            }
            require_membership(tx, &caller.id, conversation)?;

            let now = Utc::now();
            let mut appended = Vec::with_capacity(member_ids.len());
            for member_id in member_ids {
                let user =
                    store::users::get(tx, member_id).map_err(ChatError::missing("user"))?;
                if store::members::find(tx, member_id, conversation)?.is_some() {
                    return Err(ChatError::AlreadyMember);
                }
                store::members::insert(
                    tx,
                    &Membership {
                        id: Uuid::new_v4(),
                        member_id: *member_id,
                        conversation_id: *conversation,
                        last_seen_message: None,
                        created_at: now,
                    },
                )?;
                let message = append_system(
                    tx,
                    member_id,
                    conversation,
                    format!("{} joined the group", user.username),
                )?;
                appended.push(message);
            }

            tracing::info!(
                conversation = %conversation,
                added = member_ids.len(),
                "group members added"
            );
            Ok(appended)
        })?;

        self.hub.publish(ChangeEvent::MembershipChanged {
            conversation: *conversation,
        });
        for message in appended {
            self.hub.publish(ChangeEvent::MessageAppended {
                conversation: *conversation,
                message,
            });
        }
        Ok(())
    }

    /// Leave a group.  Deletes the caller's membership, appends a leave
    /// record, and emits a "left the group" system message that becomes the
    /// conversation's last message.
    pub fn leave_group(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let message = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::conversations::get(tx, conversation)
                .map_err(ChatError::missing("conversation"))?;
            if !existing.is_group {
                return Err(ChatError::NotGroup);
            }
            let membership = require_membership(tx, &caller.id, conversation)?;

            let now = Utc::now();
            store::members::remove(tx, &membership.id)?;
            store::group_leaves::insert(
                tx,
                &GroupLeave {
                    id: Uuid::new_v4(),
                    user_id: caller.id,
                    conversation_id: *conversation,
                    username: caller.username.clone(),
                    left_at: now,
                },
            )?;
            let message = append_system(
                tx,
                &caller.id,
                conversation,
                format!("{} left the group", caller.username),
            )?;

            tracing::info!(conversation = %conversation, user = %caller.id, "member left group");
            Ok(message)
        })?;

        self.hub.publish(ChangeEvent::MembershipChanged {
            conversation: *conversation,
        });
        self.hub.publish(ChangeEvent::MessageAppended {
            conversation: *conversation,
            message,
        });
        Ok(())
    }

    /// Delete a whole group.  Requires the caller to be a member and the
    /// group to still have at least two members; messages, memberships,
    /// typing rows, calls, and leave history go with the conversation in one
    /// transaction.
    pub fn delete_group(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::conversations::get(tx, conversation)
                .map_err(ChatError::missing("conversation"))?;
            if !existing.is_group {
                return Err(ChatError::NotGroup);
            }
            require_membership(tx, &caller.id, conversation)?;

            if store::members::count_for_conversation(tx, conversation)? < 2 {
                return Err(ChatError::InvalidMembers);
            }

            store::conversations::delete(tx, conversation)?;
            tracing::info!(conversation = %conversation, "group deleted");
            Ok(())
        })?;

        self.hub.publish(ChangeEvent::ConversationDeleted {
            conversation: *conversation,
        });
        Ok(())
    }
}
