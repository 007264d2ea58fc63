//! CRUD operations for [`Conversation`] records.

use palaver_shared::{ConversationId, MessageId};
use rusqlite::{params, Connection};

use crate::error::{Result, StoreError};
use crate::models::Conversation;
use crate::row;

const COLUMNS: &str = "id, name, is_group, last_message_id, created_at";

/// Insert a new conversation.
pub fn insert(conn: &Connection, conversation: &Conversation) -> Result<()> {
    conn.execute(
        "INSERT INTO conversations (id, name, is_group, last_message_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            conversation.id.to_string(),
            conversation.name,
            conversation.is_group,
            conversation.last_message_id.map(|m| m.to_string()),
            row::encode_ts(&conversation.created_at),
        ],
    )?;
    Ok(())
}

/// Fetch a single conversation by id.
pub fn get(conn: &Connection, id: &ConversationId) -> Result<Conversation> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
        params![id.to_string()],
        row_to_conversation,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

/// Repoint the conversation's last-message pointer (or clear it).
pub fn set_last_message(
    conn: &Connection,
    id: &ConversationId,
    message: Option<&MessageId>,
) -> Result<()> {
    conn.execute(
        "UPDATE conversations SET last_message_id = ?1 WHERE id = ?2",
        params![message.map(|m| m.to_string()), id.to_string()],
    )?;
    Ok(())
}

/// Delete a conversation.  Memberships, messages, typing rows, calls, group
/// leaves, and the paired friendship follow through `ON DELETE CASCADE`.
/// Returns `true` if a row was deleted.
pub fn delete(conn: &Connection, id: &ConversationId) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM conversations WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Map a `rusqlite::Row` to a [`Conversation`].
fn row_to_conversation(r: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = r.get(0)?;
    let last_message: Option<String> = r.get(3)?;
    let created_str: String = r.get(4)?;

    Ok(Conversation {
        id: ConversationId(row::uuid_col(0, &id_str)?),
        name: r.get(1)?,
        is_group: r.get(2)?,
        last_message_id: last_message
            .as_deref()
            .map(|s| row::uuid_col(3, s).map(MessageId))
            .transpose()?,
        created_at: row::ts_col(4, &created_str)?,
    })
}
