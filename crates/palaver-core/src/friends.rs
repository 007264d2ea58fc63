//! Friend-request workflow and friendships.
//!
//! State machine per unordered user pair: none → pending(sender→receiver) →
//! accepted / denied / cancelled-by-sender.  Acceptance atomically creates
//! the direct conversation, the friendship, and both memberships, then
//! deletes the request; deleting a friend removes the friendship and its
//! conversation together.

use chrono::Utc;
use palaver_shared::{ConversationId, RequestId};
use palaver_store::{self as store, Conversation, FriendRequest, Friendship, Membership, User};
use serde::Serialize;
use uuid::Uuid;

use crate::conversations::require_membership;
use crate::events::ChangeEvent;
use crate::identity;
use crate::{Chat, ChatError};

/// A pending request joined with its sender.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedRequest {
    pub request: FriendRequest,
    pub sender: User,
}

/// A pending request joined with its receiver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentRequest {
    pub request: FriendRequest,
    pub receiver: User,
}

/// A friend joined with the direct conversation shared with them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendView {
    pub user: User,
    pub conversation_id: ConversationId,
}

impl Chat {
    /// Send a friend request to the user behind an email address.
    ///
    /// Guards, in order: no self-requests, no duplicate pending request in
    /// either direction, no request to an existing friend.
    pub fn send_friend_request(
        &self,
        session: Option<&str>,
        email: &str,
    ) -> Result<RequestId, ChatError> {
        let mut db = self.db()?;
        let (request_id, sender, receiver) = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            if caller.email == email {
                return Err(ChatError::SelfRequest);
            }

            let receiver =
                store::users::find_by_email(tx, email)?.ok_or(ChatError::NotFound("user"))?;

            if store::requests::find_between(tx, &caller.id, &receiver.id)?.is_some() {
                return Err(ChatError::DuplicateRequest);
            }
            if store::requests::find_between(tx, &receiver.id, &caller.id)?.is_some() {
                return Err(ChatError::DuplicateRequest);
            }
            if store::friends::exists_between(tx, &caller.id, &receiver.id)? {
                return Err(ChatError::AlreadyFriends);
            }

            let request = FriendRequest {
                id: RequestId::new(),
                sender: caller.id,
                receiver: receiver.id,
                created_at: Utc::now(),
            };
            store::requests::insert(tx, &request)?;

            tracing::info!(request = %request.id, receiver = %receiver.id, "friend request sent");
            Ok((request.id, caller.id, receiver.id))
        })?;

        self.hub.publish(ChangeEvent::RequestsChanged { user: sender });
        self.hub
            .publish(ChangeEvent::RequestsChanged { user: receiver });
        Ok(request_id)
    }

    /// Accept a request addressed to the caller.  One transaction creates
    /// the direct conversation, the friendship, and one membership per user,
    /// then deletes the request; all four effects commit together or not at
    /// all.
    pub fn accept_request(
        &self,
        session: Option<&str>,
        request: &RequestId,
    ) -> Result<ConversationId, ChatError> {
        let mut db = self.db()?;
        let (conversation_id, sender, receiver) = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let pending = store::requests::find(tx, request)?
                .filter(|r| r.receiver == caller.id)
                .ok_or(ChatError::NotFound("request"))?;

            let now = Utc::now();
            let conversation = Conversation {
                id: ConversationId::new(),
                name: None,
                is_group: false,
                last_message_id: None,
                created_at: now,
            };
            store::conversations::insert(tx, &conversation)?;
            store::friends::insert(
                tx,
                &Friendship {
                    id: Uuid::new_v4(),
                    user1: caller.id,
                    user2: pending.sender,
                    conversation_id: conversation.id,
                    created_at: now,
                },
            )?;
            for member in [caller.id, pending.sender] {
                store::members::insert(
                    tx,
                    &Membership {
                        id: Uuid::new_v4(),
                        member_id: member,
                        conversation_id: conversation.id,
                        last_seen_message: None,
                        created_at: now,
                    },
                )?;
            }
            store::requests::remove(tx, &pending.id)?;

            tracing::info!(request = %pending.id, conversation = %conversation.id, "friend request accepted");
            Ok::<_, ChatError>((conversation.id, pending.sender, caller.id))
        })?;

        for user in [sender, receiver] {
            self.hub.publish(ChangeEvent::RequestsChanged { user });
            self.hub.publish(ChangeEvent::FriendsChanged { user });
        }
        self.hub.publish(ChangeEvent::MembershipChanged {
            conversation: conversation_id,
        });
        Ok(conversation_id)
    }

    /// Deny a request addressed to the caller.
    pub fn deny_request(&self, session: Option<&str>, request: &RequestId) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let (sender, receiver) = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let pending = store::requests::find(tx, request)?
                .filter(|r| r.receiver == caller.id)
                .ok_or(ChatError::NotFound("request"))?;
            store::requests::remove(tx, &pending.id)?;
            Ok::<_, ChatError>((pending.sender, pending.receiver))
        })?;

        self.hub.publish(ChangeEvent::RequestsChanged { user: sender });
        self.hub
            .publish(ChangeEvent::RequestsChanged { user: receiver });
        Ok(())
    }

    /// Cancel a pending request the caller sent.
    pub fn cancel_request(
        &self,
        session: Option<&str>,
        request: &RequestId,
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let (sender, receiver) = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let pending = store::requests::find(tx, request)?
                .filter(|r| r.sender == caller.id)
                .ok_or(ChatError::NotFound("request"))?;
            store::requests::remove(tx, &pending.id)?;
            Ok::<_, ChatError>((pending.sender, pending.receiver))
        })?;

        self.hub.publish(ChangeEvent::RequestsChanged { user: sender });
        self.hub
            .publish(ChangeEvent::RequestsChanged { user: receiver });
        Ok(())
    }

    /// Pending requests addressed to the caller, joined with their senders.
    pub fn received_requests(
        &self,
        session: Option<&str>,
    ) -> Result<Vec<ReceivedRequest>, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        store::requests::list_for_receiver(conn, &caller.id)?
            .into_iter()
            .map(|request| {
                let sender = store::users::get(conn, &request.sender)
                    .map_err(ChatError::missing("user"))?;
                Ok(ReceivedRequest { request, sender })
            })
            .collect()
    }

    /// Pending requests the caller sent, joined with their receivers.
    pub fn sent_requests(&self, session: Option<&str>) -> Result<Vec<SentRequest>, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        store::requests::list_for_sender(conn, &caller.id)?
            .into_iter()
            .map(|request| {
                let receiver = store::users::get(conn, &request.receiver)
                    .map_err(ChatError::missing("user"))?;
                Ok(SentRequest { request, receiver })
            })
            .collect()
    }

    /// Number of pending requests addressed to the caller; the badge count.
    pub fn received_request_count(&self, session: Option<&str>) -> Result<u64, ChatError> {
        let db = self.db()?;
        let caller = identity::resolve(db.conn(), session)?;
        Ok(store::requests::count_for_receiver(db.conn(), &caller.id)? as u64)
    }

    /// The caller's friends, each with the shared direct conversation.
    pub fn friends(&self, session: Option<&str>) -> Result<Vec<FriendView>, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        store::friends::list_for_user(conn, &caller.id)?
            .into_iter()
            .map(|friendship| {
                let other = if friendship.user1 == caller.id {
                    friendship.user2
                } else {
                    friendship.user1
                };
                let user =
                    store::users::get(conn, &other).map_err(ChatError::missing("user"))?;
                Ok(FriendView {
                    user,
                    conversation_id: friendship.conversation_id,
                })
            })
            .collect()
    }

    /// Remove a friend.  The friendship and its direct conversation (with
    /// every message and membership) are deleted together.
    pub fn delete_friend(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
    ) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let (user1, user2) = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::conversations::get(tx, conversation)
                .map_err(ChatError::missing("conversation"))?;
            if existing.is_group {
                return Err(ChatError::InvalidMembers);
            }
            require_membership(tx, &caller.id, conversation)?;

            if store::members::count_for_conversation(tx, conversation)? != 2 {
                return Err(ChatError::InvalidMembers);
            }
            let friendship = store::friends::find_by_conversation(tx, conversation)?
                .ok_or(ChatError::NotFound("friendship"))?;

            store::conversations::delete(tx, conversation)?;

            tracing::info!(conversation = %conversation, "friend deleted");
            Ok((friendship.user1, friendship.user2))
        })?;

        for user in [user1, user2] {
            self.hub.publish(ChangeEvent::FriendsChanged { user });
        }
        self.hub.publish(ChangeEvent::ConversationDeleted {
            conversation: *conversation,
        });
        Ok(())
    }
}
