//! Live queries.
//!
//! Reactive reads are an explicit publish/subscribe interface: registering a
//! query yields an initial snapshot plus an unbounded sequence of re-runs,
//! one per relevant committed write.  Mutations publish a [`ChangeEvent`]
//! after their transaction commits (never on abort); a [`LiveQuery`] filters
//! the event stream and recomputes its result from the store, so falling
//! behind the channel only costs a redundant re-run, never a wrong answer.
//! Dropping the query unregisters it.

use palaver_shared::constants::EVENT_CHANNEL_CAPACITY;
use palaver_shared::{CallId, ConversationId, MessageId, UserId};
use tokio::sync::broadcast::{self, error::RecvError, Receiver, Sender};

use crate::calls::ActiveCall;
use crate::conversations::ConversationSummary;
use crate::friends::{FriendView, ReceivedRequest};
use crate::identity;
use crate::messages::MessageView;
use crate::presence::TypingUser;
use crate::{Chat, ChatError};

/// What changed, and where.  Conversation-scoped events carry the
/// conversation so subscribers can ignore rooms they are not watching;
/// user-scoped events carry the affected user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    MessageAppended {
        conversation: ConversationId,
        message: MessageId,
    },
    MessageEdited {
        conversation: ConversationId,
        message: MessageId,
    },
    MessageDeleted {
        conversation: ConversationId,
        message: MessageId,
    },
    TypingChanged {
        conversation: ConversationId,
    },
    MembershipChanged {
        conversation: ConversationId,
    },
    ConversationDeleted {
        conversation: ConversationId,
    },
    CallChanged {
        conversation: ConversationId,
        call: CallId,
    },
    RequestsChanged {
        user: UserId,
    },
    FriendsChanged {
        user: UserId,
    },
    PresenceChanged {
        user: UserId,
    },
}

impl ChangeEvent {
    /// The conversation a change is scoped to, if any.
    pub fn conversation(&self) -> Option<ConversationId> {
        match self {
            Self::MessageAppended { conversation, .. }
            | Self::MessageEdited { conversation, .. }
            | Self::MessageDeleted { conversation, .. }
            | Self::TypingChanged { conversation }
            | Self::MembershipChanged { conversation }
            | Self::ConversationDeleted { conversation }
            | Self::CallChanged { conversation, .. } => Some(*conversation),
            Self::RequestsChanged { .. }
            | Self::FriendsChanged { .. }
            | Self::PresenceChanged { .. } => None,
        }
    }
}

/// Fan-out point for committed writes.
#[derive(Clone)]
pub(crate) struct EventHub {
    tx: Sender<ChangeEvent>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        Self {
            tx: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
        }
    }

    /// Publish after commit.  No subscribers is not an error.
    pub(crate) fn publish(&self, event: ChangeEvent) {
        tracing::debug!(?event, "publishing change event");
        let _ = self.tx.send(event);
    }

    pub(crate) fn subscribe(&self) -> Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

type QueryFn<T> = Box<dyn Fn(&Chat) -> Result<T, ChatError> + Send + Sync>;
type FilterFn = Box<dyn Fn(&ChangeEvent) -> bool + Send + Sync>;

/// A registered query: an initial snapshot plus a lazy, unbounded sequence
/// of recomputed results.  Identity and membership are re-validated on every
/// re-run, exactly as for a one-shot query.
pub struct LiveQuery<T> {
    chat: Chat,
    rx: Receiver<ChangeEvent>,
    relevant: FilterFn,
    run: QueryFn<T>,
    current: T,
}

impl<T: Clone> LiveQuery<T> {
    fn register(chat: &Chat, relevant: FilterFn, run: QueryFn<T>) -> Result<Self, ChatError> {
        // Subscribe before the first run so a write between snapshot and
        // registration is never missed.
        let rx = chat.hub.subscribe();
        let current = run(chat)?;
        Ok(Self {
            chat: chat.clone(),
            rx,
            relevant,
            run,
            current,
        })
    }

    /// The most recent result.
    pub fn snapshot(&self) -> &T {
        &self.current
    }

    /// Wait for the next relevant committed write and re-run the query.
    ///
    /// Pending indefinitely while nothing relevant happens is the normal
    /// idle state.  Returns `None` once every publisher is gone.
    pub async fn next(&mut self) -> Option<Result<T, ChatError>> {
        loop {
            match self.rx.recv().await {
                Ok(event) if (self.relevant)(&event) => break,
                Ok(_) => continue,
                // Falling behind is recoverable: results are recomputed
                // from the store, not replayed from the missed events.
                Err(RecvError::Lagged(_)) => break,
                Err(RecvError::Closed) => return None,
            }
        }

        let result = (self.run)(&self.chat);
        if let Ok(value) = &result {
            self.current = value.clone();
        }
        Some(result)
    }
}

impl Chat {
    /// Live view of the caller's conversation list.
    pub fn watch_conversations(
        &self,
        session: Option<&str>,
    ) -> Result<LiveQuery<Vec<ConversationSummary>>, ChatError> {
        let session = session.map(str::to_owned);
        LiveQuery::register(
            self,
            Box::new(|event| {
                matches!(
                    event,
                    ChangeEvent::MessageAppended { .. }
                        | ChangeEvent::MessageEdited { .. }
                        | ChangeEvent::MessageDeleted { .. }
                        | ChangeEvent::MembershipChanged { .. }
                        | ChangeEvent::ConversationDeleted { .. }
                        | ChangeEvent::FriendsChanged { .. }
                )
            }),
            Box::new(move |chat| chat.conversations(session.as_deref())),
        )
    }

    /// Live view of one conversation's messages.
    pub fn watch_messages(
        &self,
        session: Option<&str>,
        conversation: ConversationId,
    ) -> Result<LiveQuery<Vec<MessageView>>, ChatError> {
        let session = session.map(str::to_owned);
        LiveQuery::register(
            self,
            Box::new(move |event| {
                event.conversation() == Some(conversation)
                    && !matches!(
                        event,
                        ChangeEvent::TypingChanged { .. } | ChangeEvent::CallChanged { .. }
                    )
            }),
            Box::new(move |chat| chat.messages(session.as_deref(), &conversation)),
        )
    }

    /// Live view of who is typing in a conversation.
    pub fn watch_typing_users(
        &self,
        session: Option<&str>,
        conversation: ConversationId,
    ) -> Result<LiveQuery<Vec<TypingUser>>, ChatError> {
        let session = session.map(str::to_owned);
        LiveQuery::register(
            self,
            Box::new(move |event| {
                matches!(event, ChangeEvent::TypingChanged { conversation: c } if *c == conversation)
            }),
            Box::new(move |chat| chat.typing_users(session.as_deref(), &conversation)),
        )
    }

    /// Live view of the caller's incoming requests.
    pub fn watch_received_requests(
        &self,
        session: Option<&str>,
    ) -> Result<LiveQuery<Vec<ReceivedRequest>>, ChatError> {
        let me = {
            let db = self.db()?;
            identity::resolve(db.conn(), session)?.id
        };
        let session = session.map(str::to_owned);
        LiveQuery::register(
            self,
            Box::new(move |event| {
                matches!(event, ChangeEvent::RequestsChanged { user } if *user == me)
            }),
            Box::new(move |chat| chat.received_requests(session.as_deref())),
        )
    }

    /// Live view of the caller's friends.
    pub fn watch_friends(
        &self,
        session: Option<&str>,
    ) -> Result<LiveQuery<Vec<FriendView>>, ChatError> {
        let me = {
            let db = self.db()?;
            identity::resolve(db.conn(), session)?.id
        };
        let session = session.map(str::to_owned);
        LiveQuery::register(
            self,
            Box::new(move |event| {
                matches!(event, ChangeEvent::FriendsChanged { user } if *user == me)
            }),
            Box::new(move |chat| chat.friends(session.as_deref())),
        )
    }

    /// Live view of the caller's ringing and active calls; drives the
    /// incoming-call notification UI.
    pub fn watch_active_calls(
        &self,
        session: Option<&str>,
    ) -> Result<LiveQuery<Vec<ActiveCall>>, ChatError> {
        let session = session.map(str::to_owned);
        LiveQuery::register(
            self,
            // Roster membership is per call, so every call event is treated
            // as relevant; the re-run filters to the caller's calls.
            Box::new(|event| matches!(event, ChangeEvent::CallChanged { .. })),
            Box::new(move |chat| chat.active_calls(session.as_deref())),
        )
    }
}
