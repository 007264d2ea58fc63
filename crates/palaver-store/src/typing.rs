//! [`TypingStatus`] records.
//!
//! One row per (user, conversation), overwritten on every keystroke-driven
//! update.  Rows are never trusted on their own: readers pass a cutoff so a
//! stale `true` flag is excluded.

use chrono::{DateTime, Utc};
use palaver_shared::{ConversationId, UserId};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::TypingStatus;
use crate::row;

const COLUMNS: &str = "id, user_id, conversation_id, is_typing, last_typing_at";

/// Insert or overwrite the typing flag for a (user, conversation) pair.
pub fn upsert(
    conn: &Connection,
    user: &UserId,
    conversation: &ConversationId,
    is_typing: bool,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO typing_status (id, user_id, conversation_id, is_typing, last_typing_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, conversation_id) DO UPDATE SET
             is_typing      = excluded.is_typing,
             last_typing_at = excluded.last_typing_at",
        params![
            Uuid::new_v4().to_string(),
            user.to_string(),
            conversation.to_string(),
            is_typing,
            row::encode_ts(&at),
        ],
    )?;
    Ok(())
}

/// Rows with a `true` flag fresher than `since` for one conversation.
pub fn list_fresh(
    conn: &Connection,
    conversation: &ConversationId,
    since: DateTime<Utc>,
) -> Result<Vec<TypingStatus>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM typing_status
         WHERE conversation_id = ?1 AND is_typing = 1 AND last_typing_at > ?2"
    ))?;

    let rows = stmt.query_map(
        params![conversation.to_string(), row::encode_ts(&since)],
        row_to_status,
    )?;

    let mut statuses = Vec::new();
    for r in rows {
        statuses.push(r?);
    }
    Ok(statuses)
}

/// Map a `rusqlite::Row` to a [`TypingStatus`].
fn row_to_status(r: &rusqlite::Row<'_>) -> rusqlite::Result<TypingStatus> {
    let id_str: String = r.get(0)?;
    let user_str: String = r.get(1)?;
    let conversation_str: String = r.get(2)?;
    let last_str: String = r.get(4)?;

    Ok(TypingStatus {
        id: row::uuid_col(0, &id_str)?,
        user_id: UserId(row::uuid_col(1, &user_str)?),
        conversation_id: ConversationId(row::uuid_col(2, &conversation_str)?),
        is_typing: r.get(3)?,
        last_typing_at: row::ts_col(4, &last_str)?,
    })
}
