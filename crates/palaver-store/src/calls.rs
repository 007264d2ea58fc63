//! CRUD operations for [`Call`] and [`CallParticipant`] records.
//!
//! Status strings are validated on read; the legal transitions themselves
//! are enforced by the rules layer, not here.

use chrono::{DateTime, Utc};
use palaver_shared::{CallId, CallKind, CallStatus, ConversationId, ParticipantRole, UserId};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{Call, CallParticipant};
use crate::row;

const CALL_COLUMNS: &str =
    "id, conversation_id, initiator_id, status, kind, room_id, started_at, answered_at, ended_at, duration";
const PARTICIPANT_COLUMNS: &str = "id, call_id, user_id, role, joined_at, left_at";

// ------------------------------------------------------------------
// Calls
// ------------------------------------------------------------------

/// Insert a new call.
pub fn insert(conn: &Connection, call: &Call) -> Result<()> {
    conn.execute(
        "INSERT INTO calls (id, conversation_id, initiator_id, status, kind, room_id, started_at, answered_at, ended_at, duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            call.id.to_string(),
            call.conversation_id.to_string(),
            call.initiator_id.to_string(),
            call.status.as_str(),
            call.kind.as_str(),
            call.room_id,
            row::encode_ts(&call.started_at),
            call.answered_at.as_ref().map(row::encode_ts),
            call.ended_at.as_ref().map(row::encode_ts),
            call.duration,
        ],
    )?;
    Ok(())
}

/// Look up a call by id.
pub fn find(conn: &Connection, id: &CallId) -> Result<Option<Call>> {
    conn.query_row(
        &format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = ?1"),
        params![id.to_string()],
        row_to_call,
    )
    .optional()
    .map_err(Into::into)
}

/// The call with the given status in a conversation, if any.
pub fn find_by_status(
    conn: &Connection,
    conversation: &ConversationId,
    status: CallStatus,
) -> Result<Option<Call>> {
    conn.query_row(
        &format!(
            "SELECT {CALL_COLUMNS} FROM calls
             WHERE conversation_id = ?1 AND status = ?2
             LIMIT 1"
        ),
        params![conversation.to_string(), status.as_str()],
        row_to_call,
    )
    .optional()
    .map_err(Into::into)
}

/// Ringing → active: stamp the answer time.
pub fn set_active(conn: &Connection, id: &CallId, answered_at: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE calls SET status = 'active', answered_at = ?1 WHERE id = ?2",
        params![row::encode_ts(&answered_at), id.to_string()],
    )?;
    Ok(())
}

/// Move a call into a terminal status, stamping the end time and, for a
/// normally ended call, its duration.
pub fn finish(
    conn: &Connection,
    id: &CallId,
    status: CallStatus,
    ended_at: DateTime<Utc>,
    duration: Option<i64>,
) -> Result<()> {
    conn.execute(
        "UPDATE calls SET status = ?1, ended_at = ?2, duration = ?3 WHERE id = ?4",
        params![
            status.as_str(),
            row::encode_ts(&ended_at),
            duration,
            id.to_string()
        ],
    )?;
    Ok(())
}

/// Ringing calls started before the cutoff; input for the missed-call sweep.
pub fn list_ringing_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<Vec<Call>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CALL_COLUMNS} FROM calls
         WHERE status = 'ringing' AND started_at < ?1"
    ))?;

    let rows = stmt.query_map(params![row::encode_ts(&cutoff)], row_to_call)?;

    let mut calls = Vec::new();
    for r in rows {
        calls.push(r?);
    }
    Ok(calls)
}

// ------------------------------------------------------------------
// Participants
// ------------------------------------------------------------------

/// Insert a roster entry.
pub fn insert_participant(conn: &Connection, participant: &CallParticipant) -> Result<()> {
    conn.execute(
        "INSERT INTO call_participants (id, call_id, user_id, role, joined_at, left_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            participant.id.to_string(),
            participant.call_id.to_string(),
            participant.user_id.to_string(),
            participant.role.as_str(),
            participant.joined_at.as_ref().map(row::encode_ts),
            participant.left_at.as_ref().map(row::encode_ts),
        ],
    )?;
    Ok(())
}

/// The roster entry for one user in one call, if any.
pub fn find_participant(
    conn: &Connection,
    call: &CallId,
    user: &UserId,
) -> Result<Option<CallParticipant>> {
    conn.query_row(
        &format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM call_participants
             WHERE call_id = ?1 AND user_id = ?2"
        ),
        params![call.to_string(), user.to_string()],
        row_to_participant,
    )
    .optional()
    .map_err(Into::into)
}

/// Stamp a participant's join time.
pub fn set_participant_joined(
    conn: &Connection,
    call: &CallId,
    user: &UserId,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE call_participants SET joined_at = ?1 WHERE call_id = ?2 AND user_id = ?3",
        params![row::encode_ts(&at), call.to_string(), user.to_string()],
    )?;
    Ok(())
}

/// Stamp a participant's leave time, once.  A second call is a no-op.
pub fn set_participant_left(
    conn: &Connection,
    call: &CallId,
    user: &UserId,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE call_participants SET left_at = ?1
         WHERE call_id = ?2 AND user_id = ?3 AND left_at IS NULL",
        params![row::encode_ts(&at), call.to_string(), user.to_string()],
    )?;
    Ok(())
}

/// Every roster entry a user holds, across all calls.
pub fn list_participations(conn: &Connection, user: &UserId) -> Result<Vec<CallParticipant>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM call_participants WHERE user_id = ?1"
    ))?;

    let rows = stmt.query_map(params![user.to_string()], row_to_participant)?;

    let mut participants = Vec::new();
    for r in rows {
        participants.push(r?);
    }
    Ok(participants)
}

// ------------------------------------------------------------------
// Row mapping
// ------------------------------------------------------------------

fn row_to_call(r: &rusqlite::Row<'_>) -> rusqlite::Result<Call> {
    let id_str: String = r.get(0)?;
    let conversation_str: String = r.get(1)?;
    let initiator_str: String = r.get(2)?;
    let status_str: String = r.get(3)?;
    let kind_str: String = r.get(4)?;
    let started_str: String = r.get(6)?;
    let answered: Option<String> = r.get(7)?;
    let ended: Option<String> = r.get(8)?;

    let status = CallStatus::parse(&status_str).ok_or_else(|| {
        row::conversion(
            3,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown call status: {status_str}"),
            ),
        )
    })?;
    let kind = CallKind::parse(&kind_str).ok_or_else(|| {
        row::conversion(
            4,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown call kind: {kind_str}"),
            ),
        )
    })?;

    Ok(Call {
        id: CallId(row::uuid_col(0, &id_str)?),
        conversation_id: ConversationId(row::uuid_col(1, &conversation_str)?),
        initiator_id: UserId(row::uuid_col(2, &initiator_str)?),
        status,
        kind,
        room_id: r.get(5)?,
        started_at: row::ts_col(6, &started_str)?,
        answered_at: answered.as_deref().map(|s| row::ts_col(7, s)).transpose()?,
        ended_at: ended.as_deref().map(|s| row::ts_col(8, s)).transpose()?,
        duration: r.get(9)?,
    })
}

fn row_to_participant(r: &rusqlite::Row<'_>) -> rusqlite::Result<CallParticipant> {
    let id_str: String = r.get(0)?;
    let call_str: String = r.get(1)?;
    let user_str: String = r.get(2)?;
    let role_str: String = r.get(3)?;
    let joined: Option<String> = r.get(4)?;
    let left: Option<String> = r.get(5)?;

    let role = ParticipantRole::parse(&role_str).ok_or_else(|| {
        row::conversion(
            3,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown participant role: {role_str}"),
            ),
        )
    })?;

    Ok(CallParticipant {
        id: row::uuid_col(0, &id_str)?,
        call_id: CallId(row::uuid_col(1, &call_str)?),
        user_id: UserId(row::uuid_col(2, &user_str)?),
        role,
        joined_at: joined.as_deref().map(|s| row::ts_col(4, s)).transpose()?,
        left_at: left.as_deref().map(|s| row::ts_col(5, s)).transpose()?,
    })
}
