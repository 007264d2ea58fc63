//! # palaver-core
//!
//! The rules layer of the Palaver conversation system: identity resolution,
//! membership gating, the message and call state machines, the
//! friend-request workflow, presence/typing staleness, and live-query
//! subscriptions, all layered on top of the transactional
//! [`palaver_store::Database`].
//!
//! Every operation takes the caller's session explicitly (the external
//! principal id, `None` when unauthenticated) and re-validates identity and
//! membership before touching shared state.  Multi-document effects run in
//! one transaction: they fully commit or fully abort, and change events are
//! published only after a commit.

pub mod calls;
pub mod conversations;
pub mod events;
pub mod friends;
pub mod groups;
pub mod identity;
pub mod messages;
pub mod presence;

mod error;

pub use calls::{ActiveCall, StartedCall};
pub use conversations::{ConversationSummary, ConversationView, GroupInfo, LastMessage, MemberView};
pub use error::ChatError;
pub use events::{ChangeEvent, LiveQuery};
pub use friends::{FriendView, ReceivedRequest, SentRequest};
pub use identity::AuthEvent;
pub use messages::MessageView;
pub use presence::{TypingUser, UserStatus};

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use palaver_shared::ChatConfig;
use palaver_store::Database;

use crate::events::EventHub;

/// Handle to the conversation core.
///
/// Cheap to clone; clones share the database and the change-event hub.  The
/// store serializes writers through the inner lock, so the core never
/// implements its own locking beyond it.
#[derive(Clone)]
pub struct Chat {
    pub(crate) db: Arc<Mutex<Database>>,
    pub(crate) hub: EventHub,
    pub(crate) config: ChatConfig,
}

impl Chat {
    /// Wrap an already-open database with the default configuration.
    pub fn new(db: Database) -> Self {
        Self::with_config(db, ChatConfig::default())
    }

    /// Wrap an already-open database with explicit timing windows.
    pub fn with_config(db: Database, config: ChatConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            hub: EventHub::new(),
            config,
        }
    }

    /// Open the platform-default database.
    pub fn open_default() -> Result<Self, ChatError> {
        Ok(Self::new(Database::new()?))
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, ChatError> {
        Ok(Self::new(Database::open_at(path)?))
    }

    /// Open a fresh in-memory store; used heavily by tests.
    pub fn in_memory() -> Result<Self, ChatError> {
        Ok(Self::new(Database::in_memory()?))
    }

    /// The timing windows this handle was built with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub(crate) fn db(&self) -> Result<MutexGuard<'_, Database>, ChatError> {
        self.db.lock().map_err(|_| ChatError::Poisoned)
    }
}
