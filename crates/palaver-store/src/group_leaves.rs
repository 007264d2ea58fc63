//! Append-only [`GroupLeave`] history records.

use chrono::{DateTime, Utc};
use palaver_shared::{ConversationId, UserId};
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::GroupLeave;
use crate::row;

const COLUMNS: &str = "id, user_id, conversation_id, username, left_at";

/// Append a leave record.  Records are never updated or deleted directly.
pub fn insert(conn: &Connection, leave: &GroupLeave) -> Result<()> {
    conn.execute(
        "INSERT INTO group_leaves (id, user_id, conversation_id, username, left_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            leave.id.to_string(),
            leave.user_id.to_string(),
            leave.conversation_id.to_string(),
            leave.username,
            row::encode_ts(&leave.left_at),
        ],
    )?;
    Ok(())
}

/// Leave records for a conversation newer than `since`, oldest first.
pub fn list_since(
    conn: &Connection,
    conversation: &ConversationId,
    since: DateTime<Utc>,
) -> Result<Vec<GroupLeave>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM group_leaves
         WHERE conversation_id = ?1 AND left_at > ?2
         ORDER BY left_at ASC"
    ))?;

    let rows = stmt.query_map(
        params![conversation.to_string(), row::encode_ts(&since)],
        row_to_leave,
    )?;

    let mut leaves = Vec::new();
    for r in rows {
        leaves.push(r?);
    }
    Ok(leaves)
}

/// Map a `rusqlite::Row` to a [`GroupLeave`].
fn row_to_leave(r: &rusqlite::Row<'_>) -> rusqlite::Result<GroupLeave> {
    let id_str: String = r.get(0)?;
    let user_str: String = r.get(1)?;
    let conversation_str: String = r.get(2)?;
    let left_str: String = r.get(4)?;

    Ok(GroupLeave {
        id: row::uuid_col(0, &id_str)?,
        user_id: UserId(row::uuid_col(1, &user_str)?),
        conversation_id: ConversationId(row::uuid_col(2, &conversation_str)?),
        username: r.get(3)?,
        left_at: row::ts_col(4, &left_str)?,
    })
}
