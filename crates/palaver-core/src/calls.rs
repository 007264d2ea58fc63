//! Call session state machine.
//!
//! Legal transitions:
//!
//! ```text
//! ringing ──answer──▶ active ──end──▶ ended
//!    │
//!    ├──reject──▶ rejected
//!    ├──cancel──▶ cancelled      (initiator only)
//!    └──sweep───▶ missed         (ring timeout elapsed)
//! ```
//!
//! `ended`, `rejected`, `missed`, and `cancelled` are terminal.  The core
//! runs no timers: the missed transition happens when the host invokes the
//! sweep, which is why `ringing` calls carry their start time.

use chrono::{Duration, Utc};
use palaver_shared::{CallId, CallKind, CallStatus, ConversationId, ParticipantRole};
use palaver_store::{self as store, Call, CallParticipant, Conversation, User};
use serde::Serialize;
use uuid::Uuid;

use crate::conversations::require_membership;
use crate::events::ChangeEvent;
use crate::identity;
use crate::{Chat, ChatError};

/// Handle returned by [`Chat::initiate_call`]: the call record id plus the
/// room to hand to the media service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedCall {
    pub call_id: CallId,
    pub room_id: String,
}

/// A ringing or active call the user participates in, joined with enough
/// context to render an incoming-call notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCall {
    pub call: Call,
    pub participation: CallParticipant,
    pub initiator: User,
    pub conversation: Conversation,
}

impl Chat {
    /// Start a call in a conversation the caller belongs to.  Fails with
    /// [`ChatError::CallInProgress`] while an active call exists there.
    /// Every current member gets a roster entry, the caller tagged as
    /// initiator.
    pub fn initiate_call(
        &self,
        session: Option<&str>,
        conversation: &ConversationId,
        kind: CallKind,
    ) -> Result<StartedCall, ChatError> {
        let mut db = self.db()?;
        let started = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            require_membership(tx, &caller.id, conversation)?;

            if store::calls::find_by_status(tx, conversation, CallStatus::Active)?.is_some() {
                return Err(ChatError::CallInProgress);
            }

            let now = Utc::now();
            let call = Call {
                id: CallId::new(),
                conversation_id: *conversation,
                initiator_id: caller.id,
                status: CallStatus::Ringing,
                kind,
                room_id: format!("call_{}_{}", conversation, now.timestamp_millis()),
                started_at: now,
                answered_at: None,
                ended_at: None,
                duration: None,
            };
            store::calls::insert(tx, &call)?;

            for membership in store::members::list_for_conversation(tx, conversation)? {
                let role = if membership.member_id == caller.id {
                    ParticipantRole::Initiator
                } else {
                    ParticipantRole::Participant
                };
                store::calls::insert_participant(
                    tx,
                    &CallParticipant {
                        id: Uuid::new_v4(),
                        call_id: call.id,
                        user_id: membership.member_id,
                        role,
                        joined_at: None,
                        left_at: None,
                    },
                )?;
            }

            tracing::info!(
                call = %call.id,
                conversation = %conversation,
                kind = kind.as_str(),
                "call initiated"
            );
            Ok(StartedCall {
                call_id: call.id,
                room_id: call.room_id,
            })
        })?;

        self.hub.publish(ChangeEvent::CallChanged {
            conversation: *conversation,
            call: started.call_id,
        });
        Ok(started)
    }

    /// Answer a ringing call.  Stamps the answer time and the caller's join
    /// time, and returns the room id to connect to.
    pub fn answer_call(&self, session: Option<&str>, call: &CallId) -> Result<String, ChatError> {
        let mut db = self.db()?;
        let (conversation, room_id) = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::calls::find(tx, call)?.ok_or(ChatError::NotFound("call"))?;
            if existing.status != CallStatus::Ringing {
                return Err(ChatError::InvalidCallState);
            }
            store::calls::find_participant(tx, call, &caller.id)?.ok_or(ChatError::NotMember)?;

            let now = Utc::now();
            store::calls::set_active(tx, call, now)?;
            store::calls::set_participant_joined(tx, call, &caller.id, now)?;

            tracing::info!(call = %call, user = %caller.id, "call answered");
            Ok((existing.conversation_id, existing.room_id))
        })?;

        self.hub.publish(ChangeEvent::CallChanged {
            conversation,
            call: *call,
        });
        Ok(room_id)
    }

    /// Decline a ringing call.
    pub fn reject_call(&self, session: Option<&str>, call: &CallId) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let conversation = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::calls::find(tx, call)?.ok_or(ChatError::NotFound("call"))?;
            if existing.status != CallStatus::Ringing {
                return Err(ChatError::InvalidCallState);
            }
            store::calls::find_participant(tx, call, &caller.id)?.ok_or(ChatError::NotMember)?;

            store::calls::finish(tx, call, CallStatus::Rejected, Utc::now(), None)?;

            tracing::info!(call = %call, user = %caller.id, "call rejected");
            Ok(existing.conversation_id)
        })?;

        self.hub.publish(ChangeEvent::CallChanged {
            conversation,
            call: *call,
        });
        Ok(())
    }

    /// Withdraw a ringing call before anyone answers.  Initiator only.
    pub fn cancel_call(&self, session: Option<&str>, call: &CallId) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let conversation = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::calls::find(tx, call)?.ok_or(ChatError::NotFound("call"))?;
            if existing.status != CallStatus::Ringing {
                return Err(ChatError::InvalidCallState);
            }
            if existing.initiator_id != caller.id {
                return Err(ChatError::NotInitiator);
            }

            store::calls::finish(tx, call, CallStatus::Cancelled, Utc::now(), None)?;

            tracing::info!(call = %call, "call cancelled");
            Ok(existing.conversation_id)
        })?;

        self.hub.publish(ChangeEvent::CallChanged {
            conversation,
            call: *call,
        });
        Ok(())
    }

    /// End a call from any non-terminal state.  Duration is the whole
    /// seconds between answer and end, 0 when the call was never answered;
    /// the caller's leave time is stamped if not already set.
    pub fn end_call(&self, session: Option<&str>, call: &CallId) -> Result<(), ChatError> {
        let mut db = self.db()?;
        let conversation = db.with_tx(|tx| {
            let caller = identity::resolve(tx, session)?;
            let existing = store::calls::find(tx, call)?.ok_or(ChatError::NotFound("call"))?;
            if existing.status.is_terminal() {
                return Err(ChatError::InvalidCallState);
            }
            store::calls::find_participant(tx, call, &caller.id)?.ok_or(ChatError::NotMember)?;

            let now = Utc::now();
            let duration = existing
                .answered_at
                .map(|answered| (now - answered).num_seconds())
                .unwrap_or(0);
            store::calls::finish(tx, call, CallStatus::Ended, now, Some(duration))?;
            store::calls::set_participant_left(tx, call, &caller.id, now)?;

            tracing::info!(call = %call, duration, "call ended");
            Ok(existing.conversation_id)
        })?;

        self.hub.publish(ChangeEvent::CallChanged {
            conversation,
            call: *call,
        });
        Ok(())
    }

    /// One call's bookkeeping record, terminal or not.  Roster members only.
    pub fn call(&self, session: Option<&str>, call: &CallId) -> Result<Call, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;
        let existing = store::calls::find(conn, call)?.ok_or(ChatError::NotFound("call"))?;
        store::calls::find_participant(conn, call, &caller.id)?.ok_or(ChatError::NotMember)?;
        Ok(existing)
    }

    /// Every ringing or active call the caller participates in; the sole
    /// feed for incoming-call notifications and in-progress-call UI.
    pub fn active_calls(&self, session: Option<&str>) -> Result<Vec<ActiveCall>, ChatError> {
        let db = self.db()?;
        let conn = db.conn();

        let caller = identity::resolve(conn, session)?;

        let mut active = Vec::new();
        for participation in store::calls::list_participations(conn, &caller.id)? {
            let Some(call) = store::calls::find(conn, &participation.call_id)? else {
                continue;
            };
            if !matches!(call.status, CallStatus::Ringing | CallStatus::Active) {
                continue;
            }
            let initiator = store::users::get(conn, &call.initiator_id)
                .map_err(ChatError::missing("user"))?;
            let conversation = store::conversations::get(conn, &call.conversation_id)
                .map_err(ChatError::missing("conversation"))?;
            active.push(ActiveCall {
                call,
                participation,
                initiator,
                conversation,
            });
        }
        Ok(active)
    }

    /// Expire every call still ringing past the configured timeout into
    /// `missed`.  The host decides when to run the sweep; it is safe to call
    /// on any schedule, including never.
    pub fn expire_unanswered(&self) -> Result<usize, ChatError> {
        let mut db = self.db()?;
        let expired: Vec<(ConversationId, CallId)> = db.with_tx(|tx| {
            let now = Utc::now();
            let cutoff = now - Duration::seconds(self.config.ring_timeout_secs);
            let stale = store::calls::list_ringing_before(tx, cutoff)?;

            let mut expired = Vec::with_capacity(stale.len());
            for call in stale {
                store::calls::finish(tx, &call.id, CallStatus::Missed, now, None)?;
                expired.push((call.conversation_id, call.id));
            }
            Ok::<_, ChatError>(expired)
        })?;

        let count = expired.len();
        for (conversation, call) in expired {
            self.hub
                .publish(ChangeEvent::CallChanged { conversation, call });
        }
        if count > 0 {
            tracing::info!(count, "expired unanswered calls");
        }
        Ok(count)
    }
}
