//! CRUD operations for [`FriendRequest`] records.

use palaver_shared::{RequestId, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::FriendRequest;
use crate::row;

const COLUMNS: &str = "id, sender, receiver, created_at";

/// Insert a new pending request.
pub fn insert(conn: &Connection, request: &FriendRequest) -> Result<()> {
    conn.execute(
        "INSERT INTO requests (id, sender, receiver, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            request.id.to_string(),
            request.sender.to_string(),
            request.receiver.to_string(),
            row::encode_ts(&request.created_at),
        ],
    )?;
    Ok(())
}

/// Look up a request by id.
pub fn find(conn: &Connection, id: &RequestId) -> Result<Option<FriendRequest>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM requests WHERE id = ?1"),
        params![id.to_string()],
        row_to_request,
    )
    .optional()
    .map_err(Into::into)
}

/// The pending request for an ordered (sender, receiver) pair, if any.
pub fn find_between(
    conn: &Connection,
    sender: &UserId,
    receiver: &UserId,
) -> Result<Option<FriendRequest>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM requests WHERE sender = ?1 AND receiver = ?2"),
        params![sender.to_string(), receiver.to_string()],
        row_to_request,
    )
    .optional()
    .map_err(Into::into)
}

/// Delete a request.  Returns `true` if a row was deleted.
pub fn remove(conn: &Connection, id: &RequestId) -> Result<bool> {
    let affected = conn.execute("DELETE FROM requests WHERE id = ?1", params![id.to_string()])?;
    Ok(affected > 0)
}

/// All pending requests addressed to a user.
pub fn list_for_receiver(conn: &Connection, receiver: &UserId) -> Result<Vec<FriendRequest>> {
    list_where(conn, "receiver", receiver)
}

/// All pending requests a user has sent.
pub fn list_for_sender(conn: &Connection, sender: &UserId) -> Result<Vec<FriendRequest>> {
    list_where(conn, "sender", sender)
}

/// Number of pending requests addressed to a user.
pub fn count_for_receiver(conn: &Connection, receiver: &UserId) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM requests WHERE receiver = ?1",
        params![receiver.to_string()],
        |r| r.get(0),
    )
    .map_err(Into::into)
}

fn list_where(conn: &Connection, column: &str, user: &UserId) -> Result<Vec<FriendRequest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM requests WHERE {column} = ?1 ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(params![user.to_string()], row_to_request)?;

    let mut requests = Vec::new();
    for r in rows {
        requests.push(r?);
    }
    Ok(requests)
}

/// Map a `rusqlite::Row` to a [`FriendRequest`].
fn row_to_request(r: &rusqlite::Row<'_>) -> rusqlite::Result<FriendRequest> {
    let id_str: String = r.get(0)?;
    let sender_str: String = r.get(1)?;
    let receiver_str: String = r.get(2)?;
    let created_str: String = r.get(3)?;

    Ok(FriendRequest {
        id: RequestId(row::uuid_col(0, &id_str)?),
        sender: UserId(row::uuid_col(1, &sender_str)?),
        receiver: UserId(row::uuid_col(2, &receiver_str)?),
        created_at: row::ts_col(3, &created_str)?,
    })
}
