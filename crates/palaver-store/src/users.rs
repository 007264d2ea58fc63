//! CRUD operations for [`User`] records.

use chrono::{DateTime, Utc};
use palaver_shared::UserId;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::models::User;
use crate::row;

const COLUMNS: &str = "id, auth_id, username, img_url, email, is_online, last_seen, created_at";

/// Insert a user, or refresh the profile fields if the external identity
/// already exists.  Online state is never touched by the upsert.
pub fn upsert(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, auth_id, username, img_url, email, is_online, last_seen, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(auth_id) DO UPDATE SET
             username = excluded.username,
             img_url  = excluded.img_url,
             email    = excluded.email",
        params![
            user.id.to_string(),
            user.auth_id,
            user.username,
            user.img_url,
            user.email,
            user.is_online,
            user.last_seen.as_ref().map(row::encode_ts),
            row::encode_ts(&user.created_at),
        ],
    )?;
    Ok(())
}

/// Fetch a single user by id.
pub fn get(conn: &Connection, id: &UserId) -> Result<User> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id.to_string()],
        row_to_user,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

/// Look up a user by external identity-provider id.
pub fn find_by_auth(conn: &Connection, auth_id: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE auth_id = ?1"),
        params![auth_id],
        row_to_user,
    )
    .optional()
    .map_err(Into::into)
}

/// Look up a user by email address.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        row_to_user,
    )
    .optional()
    .map_err(Into::into)
}

/// Update the online flag, and the last-seen timestamp when one is given.
pub fn set_online(
    conn: &Connection,
    id: &UserId,
    is_online: bool,
    last_seen: Option<DateTime<Utc>>,
) -> Result<bool> {
    let affected = match last_seen {
        Some(ts) => conn.execute(
            "UPDATE users SET is_online = ?1, last_seen = ?2 WHERE id = ?3",
            params![is_online, row::encode_ts(&ts), id.to_string()],
        )?,
        None => conn.execute(
            "UPDATE users SET is_online = ?1 WHERE id = ?2",
            params![is_online, id.to_string()],
        )?,
    };
    Ok(affected > 0)
}

/// List every online user except the given one.
pub fn list_online_except(conn: &Connection, exclude: &UserId) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM users WHERE is_online = 1 AND id != ?1 ORDER BY username ASC"
    ))?;

    let rows = stmt.query_map(params![exclude.to_string()], row_to_user)?;

    let mut users = Vec::new();
    for r in rows {
        users.push(r?);
    }
    Ok(users)
}

/// Delete a user by external identity-provider id.  Returns `true` if a row
/// was deleted.
pub fn delete_by_auth(conn: &Connection, auth_id: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM users WHERE auth_id = ?1", params![auth_id])?;
    Ok(affected > 0)
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(r: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = r.get(0)?;
    let last_seen: Option<String> = r.get(6)?;
    let created_str: String = r.get(7)?;

    Ok(User {
        id: UserId(row::uuid_col(0, &id_str)?),
        auth_id: r.get(1)?,
        username: r.get(2)?,
        img_url: r.get(3)?,
        email: r.get(4)?,
        is_online: r.get(5)?,
        last_seen: last_seen.as_deref().map(|s| row::ts_col(6, s)).transpose()?,
        created_at: row::ts_col(7, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    fn sample(auth_id: &str, email: &str) -> User {
        User {
            id: UserId::new(),
            auth_id: auth_id.to_string(),
            username: "ada".to_string(),
            img_url: "https://cdn.example/ada.png".to_string(),
            email: email.to_string(),
            is_online: false,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_refreshes_profile_but_not_presence() {
        let db = Database::in_memory().unwrap();
        let user = sample("auth_1", "ada@example.com");
        upsert(db.conn(), &user).unwrap();

        set_online(db.conn(), &user.id, true, None).unwrap();

        let mut updated = user.clone();
        updated.id = UserId::new(); // a webhook replay carries a fresh row id
        updated.username = "ada-lovelace".to_string();
        upsert(db.conn(), &updated).unwrap();

        let stored = find_by_auth(db.conn(), "auth_1").unwrap().unwrap();
        assert_eq!(stored.id, user.id);
        assert_eq!(stored.username, "ada-lovelace");
        assert!(stored.is_online);
    }

    #[test]
    fn delete_by_auth_round_trip() {
        let db = Database::in_memory().unwrap();
        let user = sample("auth_2", "bea@example.com");
        upsert(db.conn(), &user).unwrap();

        assert!(delete_by_auth(db.conn(), "auth_2").unwrap());
        assert!(find_by_auth(db.conn(), "auth_2").unwrap().is_none());
        assert!(!delete_by_auth(db.conn(), "auth_2").unwrap());
    }
}
