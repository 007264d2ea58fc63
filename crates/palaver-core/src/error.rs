use palaver_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the rules layer.
///
/// Every failure is distinguishable and propagates to the caller verbatim;
/// there are no silent retries and no partial writes behind an error.
#[derive(Error, Debug)]
pub enum ChatError {
    /// No caller identity was supplied.
    #[error("unauthorized")]
    Unauthorized,

    /// A referenced entity is absent.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is not a member of the conversation.
    #[error("you are not a member of this conversation")]
    NotMember,

    /// Only the original sender may edit or delete a message.
    #[error("only the sender may modify this message")]
    NotSender,

    /// The reply target is missing or belongs to another conversation.
    #[error("invalid reply target")]
    InvalidReply,

    /// A pending request already exists between the two users, in either
    /// direction.
    #[error("a friend request between these users is already pending")]
    DuplicateRequest,

    /// The two users are already friends.
    #[error("you are already friends with this user")]
    AlreadyFriends,

    /// A user cannot send a friend request to themself.
    #[error("cannot send a friend request to yourself")]
    SelfRequest,

    /// The operation applies to group conversations only.
    #[error("this conversation is not a group")]
    NotGroup,

    /// The user is already a member of the conversation.
    #[error("user is already a member of this conversation")]
    AlreadyMember,

    /// The conversation's membership does not allow the operation (e.g.
    /// deleting a group below two members, or friend-deleting a group).
    #[error("conversation membership does not allow this operation")]
    InvalidMembers,

    /// An active call already exists in the conversation.
    #[error("a call is already in progress in this conversation")]
    CallInProgress,

    /// The call is not in a state that admits the requested transition.
    #[error("call is not in a state that allows this transition")]
    InvalidCallState,

    /// Only the call initiator may cancel a ringing call.
    #[error("only the call initiator may do this")]
    NotInitiator,

    /// The database lock was poisoned by a panicking writer.
    #[error("state lock poisoned")]
    Poisoned,

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChatError {
    /// Map a store-level `NotFound` to a named entity, passing every other
    /// store error through.
    pub(crate) fn missing(entity: &'static str) -> impl Fn(StoreError) -> ChatError {
        move |e| match e {
            StoreError::NotFound => ChatError::NotFound(entity),
            other => ChatError::Store(other),
        }
    }
}
