//! CRUD operations for [`Membership`] records.
//!
//! The (member, conversation) lookup is the authorization gate for every
//! conversation-scoped operation in the rules layer.

use palaver_shared::{ConversationId, MessageId, UserId};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Membership;
use crate::row;

const COLUMNS: &str = "id, member_id, conversation_id, last_seen_message, created_at";

/// Insert a new membership.
pub fn insert(conn: &Connection, membership: &Membership) -> Result<()> {
    conn.execute(
        "INSERT INTO conversation_members (id, member_id, conversation_id, last_seen_message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            membership.id.to_string(),
            membership.member_id.to_string(),
            membership.conversation_id.to_string(),
            membership.last_seen_message.map(|m| m.to_string()),
            row::encode_ts(&membership.created_at),
        ],
    )?;
    Ok(())
}

/// Look up one user's membership in one conversation.
pub fn find(
    conn: &Connection,
    member: &UserId,
    conversation: &ConversationId,
) -> Result<Option<Membership>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM conversation_members
             WHERE member_id = ?1 AND conversation_id = ?2"
        ),
        params![member.to_string(), conversation.to_string()],
        row_to_membership,
    )
    .optional()
    .map_err(Into::into)
}

/// All memberships of a conversation.
pub fn list_for_conversation(
    conn: &Connection,
    conversation: &ConversationId,
) -> Result<Vec<Membership>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM conversation_members
         WHERE conversation_id = ?1
         ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![conversation.to_string()], row_to_membership)?;

    let mut memberships = Vec::new();
    for r in rows {
        memberships.push(r?);
    }
    Ok(memberships)
}

/// All memberships held by a user.
pub fn list_for_user(conn: &Connection, member: &UserId) -> Result<Vec<Membership>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM conversation_members
         WHERE member_id = ?1
         ORDER BY created_at ASC"
    ))?;

    let rows = stmt.query_map(params![member.to_string()], row_to_membership)?;

    let mut memberships = Vec::new();
    for r in rows {
        memberships.push(r?);
    }
    Ok(memberships)
}

/// Number of members in a conversation.
pub fn count_for_conversation(conn: &Connection, conversation: &ConversationId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM conversation_members WHERE conversation_id = ?1",
        params![conversation.to_string()],
        |r| r.get(0),
    )
    .map_err(Into::into)
}

/// Move (or clear) a member's read-position pointer.
pub fn set_last_seen(
    conn: &Connection,
    membership_id: &Uuid,
    message: Option<&MessageId>,
) -> Result<()> {
    conn.execute(
        "UPDATE conversation_members SET last_seen_message = ?1 WHERE id = ?2",
        params![message.map(|m| m.to_string()), membership_id.to_string()],
    )?;
    Ok(())
}

/// Delete a membership row.  Returns `true` if a row was deleted.
pub fn remove(conn: &Connection, membership_id: &Uuid) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM conversation_members WHERE id = ?1",
        params![membership_id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Map a `rusqlite::Row` to a [`Membership`].
fn row_to_membership(r: &rusqlite::Row<'_>) -> rusqlite::Result<Membership> {
    let id_str: String = r.get(0)?;
    let member_str: String = r.get(1)?;
    let conversation_str: String = r.get(2)?;
    let last_seen: Option<String> = r.get(3)?;
    let created_str: String = r.get(4)?;

    Ok(Membership {
        id: row::uuid_col(0, &id_str)?,
        member_id: UserId(row::uuid_col(1, &member_str)?),
        conversation_id: ConversationId(row::uuid_col(2, &conversation_str)?),
        last_seen_message: last_seen
            .as_deref()
            .map(|s| row::uuid_col(3, s).map(MessageId))
            .transpose()?,
        created_at: row::ts_col(4, &created_str)?,
    })
}
