//! Message ledger: send, edit, delete, and the joined message list.
//!
//! A message insert and the conversation's last-message pointer update are
//! one atomic unit; deleting the current last message recomputes the
//! pointer to the next most recent survivor.

use chrono::Utc;
use palaver_shared::{ConversationId, MessageBody, MessageId, UserId};
use palaver_store::{self as store, Message};
use rusqlite::Connection;
use serde::Serialize;

use crate::conversations::require_membership;
use crate::events::ChangeEvent;
use crate::identity;
use crate::{Chat, ChatError};

/// A message joined with its sender's display info.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub message: Message,
    pub sender_name: String,
    pub sender_img: String,
    pub is_current_user: bool,
}

/// Insert a system message and bump the last-message pointer.  Callers hold
/// a transaction; membership events ride inside the mutation they describe.
pub(crate) fn append_system(
    conn: &Connection,
    sender: &UserId,
    conversation: &ConversationId,
    text: String,
) -> Result<MessageId, ChatError> {
    let message = Message {
        id: MessageId::new(),
        sender_id: *sender,
        conversation_id: *conversation,
        body: MessageBody::system(text),
        is_edited: false,
        reply_to: None,
        is_system: true,
        created_at: Utc::now(),
    };
    store::messages::insert(conn, &message)?;
    store::conversations::set_last_message(conn, conversation, Some(&message.id))?;
    Ok(message.id)
}

impl Chat {
    /// Send a message.  The reply target, when given, must be a message in
    /// the same conversation.
    pub fn send_message(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
        body: MessageBody,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, ChatError> {
        let mut db = self.db()?;
        let message_id = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            require_membership(tx, &caller.id, conversation)?;

            if let Some(reply) = reply_to.as_ref() {
                let target = store::messages::find(tx, reply)?.ok_or(ChatError::InvalidReply)?;
                if target.conversation_id != *conversation {
                    return Err(ChatError::InvalidReply);
                }
            }

            let message = Message {
                id: MessageId::new(),
                sender_id: caller.id,
                conversation_id: *conversation,
                body,
                is_edited: false,
                reply_to,
                is_system: false,
                created_at: Utc::now(),
            };
            store::messages::insert(tx, &message)?;
            store::conversations::set_last_message(tx, conversation, Some(&message.id))?;

            tracing::info!(
                message = %message.id,
                conversation = %conversation,
                kind = message.body.kind().as_str(),
                "message sent"
            );
            Ok(message.id)
        })?;

        self.hub.publish(ChangeEvent::MessageAppended {
            conversation: *conversation,
            message: message_id,
        });
        Ok(message_id)
    }

    /// Replace a message's payload.  Sender-only; the kind, sender, and
    /// conversation never change, and `is_edited` stays true from the first
    /// edit on.
    pub fn edit_message(
        &self,
        session: Option<&str>,
        message: &MessageId,
        content: Vec<String>,
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let conversation = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::messages::find(tx, message)?.ok_or(ChatError::NotFound("message"))?;
            if existing.sender_id != caller.id {
                return Err(ChatError::NotSender);
            }
            require_membership(tx, &caller.id, &existing.conversation_id)?;

            let body = existing.body.with_parts(content);
            store::messages::set_content(tx, &existing.id, &body)?;

            tracing::info!(message = %existing.id, "message edited");
            Ok(existing.conversation_id)
        })?;

        self.hub.publish(ChangeEvent::MessageEdited {
            conversation,
            message: *message,
        });
        Ok(())
    }

    /// Hard-delete a message.  Sender-only.  If it was the conversation's
    /// last message the pointer moves to the next most recent survivor, or
    /// clears when none remain.
    pub fn delete_message(
        &self,
        session: Option<&str>,
        message: &MessageId,
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let conversation = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::messages::find(tx, message)?.ok_or(ChatError::NotFound("message"))?;
            if existing.sender_id != caller.id {
                return Err(ChatError::NotSender);
            }
            require_membership(tx, &caller.id, &existing.conversation_id)?;

            let conversation = store::conversations::get(tx, &existing.conversation_id)
                .map_err(ChatError::missing("conversation"))?;

            store::messages::remove(tx, &existing.id)?;

            if conversation.last_message_id == Some(existing.id) {
                let next = store::messages::latest_in_conversation(tx, &conversation.id)?;
                store::conversations::set_last_message(
                    tx,
                    &conversation.id,
                    next.as_ref().map(|m| &m.id),
                )?;
            }

            tracing::info!(message = %existing.id, "message deleted");
            Ok(existing.conversation_id)
        })?;

        self.hub.publish(ChangeEvent::MessageDeleted {
            conversation,
            message: *message,
        });
        Ok(())
    }

    /// All messages of a conversation, newest first, joined with sender
    /// display info.  Media content is returned verbatim as its URL list;
    /// interpretation is the presentation layer's job.
    pub fn messages(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
    ) -> Result<Vec<MessageView>, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        require_membership(conn, &caller.id, conversation)?;

        store::messages::list_for_conversation(conn, conversation)?
            .into_iter()
            .map(|message| {
                let sender = store::users::get(conn, &message.sender_id)
                    .map_err(ChatError::missing("user"))?;
                Ok(MessageView {
                    is_current_user: sender.id == caller.id,
                    sender_name: sender.username,
                    sender_img: sender.img_url,
                    message,
                })
            })
            .collect()
    }
}
