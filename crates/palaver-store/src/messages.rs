//! CRUD operations for [`Message`] records.
//!
//! The body is persisted as a (kind, JSON string array) pair and rebuilt
//! into its tagged variant on read.

use chrono::{DateTime, Utc};
use palaver_shared::{ConversationId, MessageBody, MessageId, MessageKind, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::row;
use crate::Message;

const COLUMNS: &str =
    "id, sender_id, conversation_id, kind, content, is_edited, reply_to, is_system, created_at";

/// Insert a new message.
pub fn insert(conn: &Connection, message: &Message) -> Result<()> {
    let content = serde_json::to_string(&message.body.parts())?;
    conn.execute(
        "INSERT INTO messages (id, sender_id, conversation_id, kind, content, is_edited, reply_to, is_system, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            message.id.to_string(),
            message.sender_id.to_string(),
            message.conversation_id.to_string(),
            message.body.kind().as_str(),
            content,
            message.is_edited,
            message.reply_to.map(|m| m.to_string()),
            message.is_system,
            row::encode_ts(&message.created_at),
        ],
    )?;
    Ok(())
}

/// Look up a message by id.
pub fn find(conn: &Connection, id: &MessageId) -> Result<Option<Message>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM messages WHERE id = ?1"),
        params![id.to_string()],
        row_to_message,
    )
    .optional()
    .map_err(Into::into)
}

/// Replace the payload of a message and flag it as edited.  The kind column
/// is deliberately left untouched.
pub fn set_content(conn: &Connection, id: &MessageId, body: &MessageBody) -> Result<()> {
    let content = serde_json::to_string(&body.parts())?;
    conn.execute(
        "UPDATE messages SET content = ?1, is_edited = 1 WHERE id = ?2",
        params![content, id.to_string()],
    )?;
    Ok(())
}

/// Hard-delete a message.  Returns `true` if a row was deleted.
pub fn remove(conn: &Connection, id: &MessageId) -> Result<bool> {
    let affected = conn.execute("DELETE FROM messages WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

/// All messages of a conversation, newest first.
pub fn list_for_conversation(
    conn: &Connection,
    conversation: &ConversationId,
) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM messages
         WHERE conversation_id = ?1
         ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(params![conversation.to_string()], row_to_message)?;

    let mut messages = Vec::new();
    for r in rows {
        messages.push(r?);
    }
    Ok(messages)
}

/// The most recent remaining message of a conversation, if any.
pub fn latest_in_conversation(
    conn: &Connection,
    conversation: &ConversationId,
) -> Result<Option<Message>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at DESC
             LIMIT 1"
        ),
        params![conversation.to_string()],
        row_to_message,
    )
    .optional()
    .map_err(Into::into)
}

/// Count messages created strictly after `after`, excluding those authored
/// by `exclude`.  With no cutoff every message by someone else counts.
pub fn count_unseen(
    conn: &Connection,
    conversation: &ConversationId,
    after: Option<&DateTime<Utc>>,
    exclude: &UserId,
) -> Result<i64> {
    // The empty string sorts before every RFC 3339 timestamp.
    let cutoff = after.map(row::encode_ts).unwrap_or_default();
    conn.query_row(
        "SELECT COUNT(*) FROM messages
         WHERE conversation_id = ?1 AND created_at > ?2 AND sender_id != ?3",
        params![conversation.to_string(), cutoff, exclude.to_string()],
        |r| r.get(0),
    )
    .map_err(Into::into)
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(r: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = r.get(0)?;
    let sender_str: String = r.get(1)?;
    let conversation_str: String = r.get(2)?;
    let kind_str: String = r.get(3)?;
    let content_str: String = r.get(4)?;
    let reply_to: Option<String> = r.get(6)?;
    let created_str: String = r.get(8)?;

    let kind = MessageKind::parse(&kind_str).ok_or_else(|| {
        row::conversion(
            3,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown message kind: {kind_str}"),
            ),
        )
    })?;
    let parts: Vec<String> =
        serde_json::from_str(&content_str).map_err(|e| row::conversion(4, e))?;

    Ok(Message {
        id: MessageId(row::uuid_col(0, &id_str)?),
        sender_id: UserId(row::uuid_col(1, &sender_str)?),
        conversation_id: ConversationId(row::uuid_col(2, &conversation_str)?),
        body: MessageBody::from_parts(kind, parts),
        is_edited: r.get(5)?,
        reply_to: reply_to
            .as_deref()
            .map(|s| row::uuid_col(6, s).map(MessageId))
            .transpose()?,
        is_system: r.get(7)?,
        created_at: row::ts_col(8, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::{conversations, users, Conversation, User};
    use palaver_shared::UserId;

    fn seed(db: &Database) -> (UserId, ConversationId) {
        let user = User {
            id: UserId::new(),
            auth_id: "auth_m".to_string(),
            username: "mallory".to_string(),
            img_url: String::new(),
            email: "m@example.com".to_string(),
            is_online: false,
            last_seen: None,
            created_at: Utc::now(),
        };
        users::upsert(db.conn(), &user).unwrap();

        let conversation = Conversation {
            id: ConversationId::new(),
            name: None,
            is_group: false,
            last_message_id: None,
            created_at: Utc::now(),
        };
        conversations::insert(db.conn(), &conversation).unwrap();
        (user.id, conversation.id)
    }

    fn message(sender: UserId, conversation: ConversationId, text: &str) -> Message {
        Message {
            id: MessageId::new(),
            sender_id: sender,
            conversation_id: conversation,
            body: MessageBody::text(text),
            is_edited: false,
            reply_to: None,
            is_system: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_list_newest_first() {
        let db = Database::in_memory().unwrap();
        let (sender, conversation) = seed(&db);

        let first = message(sender, conversation, "first");
        let mut second = message(sender, conversation, "second");
        second.created_at = first.created_at + chrono::Duration::milliseconds(5);
        insert(db.conn(), &first).unwrap();
        insert(db.conn(), &second).unwrap();

        let listed = list_for_conversation(db.conn(), &conversation).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        let latest = latest_in_conversation(db.conn(), &conversation).unwrap();
        assert_eq!(latest.map(|m| m.id), Some(second.id));

        let stored = find(db.conn(), &first.id).unwrap().unwrap();
        assert_eq!(stored.body, MessageBody::text("first"));
    }

    #[test]
    fn set_content_flags_edited_and_keeps_kind() {
        let db = Database::in_memory().unwrap();
        let (sender, conversation) = seed(&db);

        let msg = message(sender, conversation, "draft");
        insert(db.conn(), &msg).unwrap();

        set_content(db.conn(), &msg.id, &msg.body.with_parts(vec!["final".into()])).unwrap();

        let stored = find(db.conn(), &msg.id).unwrap().unwrap();
        assert!(stored.is_edited);
        assert_eq!(stored.body, MessageBody::text("final"));
    }
}
