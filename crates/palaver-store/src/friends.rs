//! CRUD operations for [`Friendship`] records.

use palaver_shared::{ConversationId, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::Friendship;
use crate::row;

const COLUMNS: &str = "id, user1, user2, conversation_id, created_at";

/// Insert a new friendship.
pub fn insert(conn: &Connection, friendship: &Friendship) -> Result<()> {
    conn.execute(
        "INSERT INTO friends (id, user1, user2, conversation_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            friendship.id.to_string(),
            friendship.user1.to_string(),
            friendship.user2.to_string(),
            friendship.conversation_id.to_string(),
            row::encode_ts(&friendship.created_at),
        ],
    )?;
    Ok(())
}

/// The friendship paired with a direct conversation, if any.
pub fn find_by_conversation(
    conn: &Connection,
    conversation: &ConversationId,
) -> Result<Option<Friendship>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM friends WHERE conversation_id = ?1"),
        params![conversation.to_string()],
        row_to_friendship,
    )
    .optional()
    .map_err(Into::into)
}

/// Whether two users are friends, in either column order.
pub fn exists_between(conn: &Connection, a: &UserId, b: &UserId) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM friends
         WHERE (user1 = ?1 AND user2 = ?2) OR (user1 = ?2 AND user2 = ?1)",
        params![a.to_string(), b.to_string()],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Every friendship a user participates in.
pub fn list_for_user(conn: &Connection, user: &UserId) -> Result<Vec<Friendship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM friends
         WHERE user1 = ?1 OR user2 = ?1
         ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(params![user.to_string()], row_to_friendship)?;

    let mut friendships = Vec::new();
    for r in rows {
        friendships.push(r?);
    }
    Ok(friendships)
}

/// Map a `rusqlite::Row` to a [`Friendship`].
fn row_to_friendship(r: &rusqlite::Row<'_>) -> rusqlite::Result<Friendship> {
    let id_str: String = r.get(0)?;
    let user1_str: String = r.get(1)?;
    let user2_str: String = r.get(2)?;
    let conversation_str: String = r.get(3)?;
    let created_str: String = r.get(4)?;

    Ok(Friendship {
        id: row::uuid_col(0, &id_str)?,
        user1: UserId(row::uuid_col(1, &user1_str)?),
        user2: UserId(row::uuid_col(2, &user2_str)?),
        conversation_id: ConversationId(row::uuid_col(3, &conversation_str)?),
        created_at: row::ts_col(4, &created_str)?,
    })
}
