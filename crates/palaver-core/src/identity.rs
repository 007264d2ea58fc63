//! Identity resolution.
//!
//! The core never fabricates identity: user records are created, refreshed,
//! and removed by identity-provider events delivered through the host's
//! webhook route, and every operation resolves its caller from the external
//! principal id before touching shared state.  No operation trusts a
//! client-supplied user id.

use chrono::Utc;
use palaver_shared::UserId;
use palaver_store::{self as store, User};
use rusqlite::Connection;

use crate::{Chat, ChatError};

/// An identity-provider lifecycle event.
///
/// `Created` and `Updated` carry the same payload and apply the same upsert,
/// so a replayed create simply refreshes the profile in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    Created {
        auth_id: String,
        username: String,
        img_url: String,
        email: String,
    },
    Updated {
        auth_id: String,
        username: String,
        img_url: String,
        email: String,
    },
    Deleted {
        auth_id: String,
    },
}

/// Resolve the caller: `Unauthorized` without a session, `NotFound` when the
/// principal has no user record yet (e.g. the webhook has not landed).
pub(crate) fn resolve(conn: &Connection, session: Option<&str>) -> Result<User, ChatError> {
    let auth_id = session.ok_or(ChatError::Unauthorized)?;
    store::users::find_by_auth(conn, auth_id)?.ok_or(ChatError::NotFound("user"))
}

impl Chat {
    /// Apply an identity-provider event.
    pub fn apply_auth_event(&self, event: AuthEvent) -> Result<(), ChatError> {
        let db = self.db()?;
        match event {
            AuthEvent::Created {
                auth_id,
                username,
                img_url,
                email,
            }
            | AuthEvent::Updated {
                auth_id,
                username,
                img_url,
                email,
            } => {
                let user = User {
                    id: UserId::new(),
                    auth_id,
                    username,
                    img_url,
                    email,
                    is_online: false,
                    last_seen: None,
                    created_at: Utc::now(),
                };
                store::users::upsert(db.conn(), &user)?;
                tracing::info!(auth_id = %user.auth_id, "user upserted from auth event");
            }
            AuthEvent::Deleted { auth_id } => {
                let deleted = store::users::delete_by_auth(db.conn(), &auth_id)?;
                tracing::info!(%auth_id, deleted, "user removed from auth event");
            }
        }
        Ok(())
    }

    /// Look up a user by external principal id; the client's bootstrap query.
    pub fn user_by_auth(&self, auth_id: &str) -> Result<Option<User>, ChatError> {
        let db = self.db()?;
        Ok(store::users::find_by_auth(db.conn(), auth_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(auth_id: &str, email: &str) -> AuthEvent {
        AuthEvent::Created {
            auth_id: auth_id.to_string(),
            username: auth_id.to_string(),
            img_url: String::new(),
            email: email.to_string(),
        }
    }

    #[test]
    fn resolve_without_session_is_unauthorized() {
        let chat = Chat::in_memory().unwrap();
        let db = chat.db().unwrap();
        assert!(matches!(
            resolve(db.conn(), None),
            Err(ChatError::Unauthorized)
        ));
    }

    #[test]
    fn resolve_before_webhook_is_not_found() {
        let chat = Chat::in_memory().unwrap();
        let db = chat.db().unwrap();
        assert!(matches!(
            resolve(db.conn(), Some("auth_missing")),
            Err(ChatError::NotFound("user"))
        ));
    }

    #[test]
    fn created_then_deleted_round_trip() {
        let chat = Chat::in_memory().unwrap();
        chat.apply_auth_event(created("auth_a", "a@example.com"))
            .unwrap();
        assert!(chat.user_by_auth("auth_a").unwrap().is_some());

        chat.apply_auth_event(AuthEvent::Deleted {
            auth_id: "auth_a".to_string(),
        })
        .unwrap();
        assert!(chat.user_by_auth("auth_a").unwrap().is_none());
    }
}
