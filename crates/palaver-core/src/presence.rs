//! Presence and typing.
//!
//! Both are advisory signals backed by plain rows; nothing here runs a
//! timer.  Typing freshness is a staleness predicate applied at read time,
//! so a client that dies mid-keystroke can never leave a permanent
//! "typing..." behind.

use chrono::{DateTime, Duration, Utc};
use palaver_shared::{ConversationId, UserId};
use palaver_store::{self as store, User};
use serde::Serialize;

use crate::events::ChangeEvent;
use crate::identity;
use crate::{Chat, ChatError};

/// Online flag plus the last-seen timestamp refreshed on going offline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Display info for a user currently typing in a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUser {
    pub username: String,
    pub img_url: String,
}

impl Chat {
    /// Flip the caller's online flag.  The last-seen timestamp is refreshed
    /// on the offline transition only.
    pub fn set_online(&self, session: Option<&str>, is_online: bool) -> Result<(), ChatError> {
        let user = {
            let db = self.db()?;
            let caller = identity::resolve(db.conn(), session)?;
            let last_seen = (!is_online).then(Utc::now);
            store::users::set_online(db.conn(), &caller.id, is_online, last_seen)?;
            caller.id
        };

        self.hub.publish(ChangeEvent::PresenceChanged { user });
        Ok(())
    }

    /// Another user's presence, for profile headers.
    pub fn user_status(&self, user: &UserId) -> Result<UserStatus, ChatError> {
        let db = self.db()?;
        let found = store::users::get(db.conn(), user).map_err(ChatError::missing("user"))?;
        Ok(UserStatus {
            is_online: found.is_online,
            last_seen: found.last_seen,
        })
    }

    /// Every online user except the caller.
    pub fn online_users(&self, session: Option<&str>) -> Result<Vec<User>, ChatError> {
        let db = self.db()?;
        let caller = identity::resolve(db.conn(), session)?;
        Ok(store::users::list_online_except(db.conn(), &caller.id)?)
    }

    /// Record a keystroke-driven typing update for the caller.  The client
    /// re-sends `false` after input goes quiet; the server holds no timer.
    pub fn set_typing(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
        is_typing: bool,
    ) -> Result<(), ChatError> {
        {
            let db = self.db()?;
            let caller = identity::resolve(db.conn(), session)?;
            store::typing::upsert(db.conn(), &caller.id, conversation, is_typing, Utc::now())?;
        }

        self.hub.publish(ChangeEvent::TypingChanged {
            conversation: *conversation,
        });
        Ok(())
    }

    /// Users typing in a conversation right now: flag set, fresher than the
    /// staleness window, caller excluded.  A stale `true` flag is never
    /// reported.
    pub fn typing_users(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
    ) -> Result<Vec<TypingUser>, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        let since = Utc::now() - Duration::seconds(self.config.typing_staleness_secs);

        store::typing::list_fresh(conn, conversation, since)?
            .into_iter()
            .filter(|status| status.user_id != caller.id)
            .map(|status| {
                let user = store::users::get(conn, &status.user_id)
                    .map_err(ChatError::missing("user"))?;
                Ok(TypingUser {
                    username: user.username,
                    img_url: user.img_url,
                })
            })
            .collect()
    }
}
