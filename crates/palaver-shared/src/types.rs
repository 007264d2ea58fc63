use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------
//
// Only entities that cross the API boundary get a typed id.  Internal rows
// (memberships, participants, typing records) are keyed by plain UUIDs.

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConversationId(pub Uuid);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub Uuid);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CallId(pub Uuid);

macro_rules! id_impls {
    ($($name:ident),+) => {
        $(
            impl $name {
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                    Ok(Self(Uuid::parse_str(s)?))
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

id_impls!(UserId, ConversationId, MessageId, RequestId, CallId);

// ---------------------------------------------------------------------------
// Message body
// ---------------------------------------------------------------------------

/// Discriminant for a message body, persisted as a plain string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    Audio,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
            Self::Audio => "audio",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "file" => Some(Self::File),
            "audio" => Some(Self::Audio),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Message content as a tagged variant: one case per message kind, each
/// carrying its own payload.  Text messages hold ordered text segments;
/// media messages hold the attachment URLs handed back by the upload
/// service, stored and returned verbatim; system messages hold the rendered
/// event text ("X left the group").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessageBody {
    Text { segments: Vec<String> },
    Image { urls: Vec<String> },
    File { urls: Vec<String> },
    Audio { urls: Vec<String> },
    System { text: String },
}

impl MessageBody {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text {
            segments: vec![s.into()],
        }
    }

    pub fn system(s: impl Into<String>) -> Self {
        Self::System { text: s.into() }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Image { .. } => MessageKind::Image,
            Self::File { .. } => MessageKind::File,
            Self::Audio { .. } => MessageKind::Audio,
            Self::System { .. } => MessageKind::System,
        }
    }

    /// Wire form: the payload as an ordered list of strings.
    pub fn parts(&self) -> Vec<String> {
        match self {
            Self::Text { segments } => segments.clone(),
            Self::Image { urls } | Self::File { urls } | Self::Audio { urls } => urls.clone(),
            Self::System { text } => vec![text.clone()],
        }
    }

    /// Rebuild a body from its persisted (kind, parts) form.
    pub fn from_parts(kind: MessageKind, parts: Vec<String>) -> Self {
        match kind {
            MessageKind::Text => Self::Text { segments: parts },
            MessageKind::Image => Self::Image { urls: parts },
            MessageKind::File => Self::File { urls: parts },
            MessageKind::Audio => Self::Audio { urls: parts },
            MessageKind::System => Self::System {
                text: parts.into_iter().next().unwrap_or_default(),
            },
        }
    }

    /// Same kind, new payload.  Editing never changes the kind.
    pub fn with_parts(&self, parts: Vec<String>) -> Self {
        Self::from_parts(self.kind(), parts)
    }

    /// One-line summary for conversation previews.  Non-text kinds collapse
    /// to a fixed placeholder.
    pub fn preview(&self) -> String {
        match self {
            Self::Text { segments } => segments.join(" "),
            Self::System { text } => text.clone(),
            _ => crate::constants::NON_TEXT_PREVIEW.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Active,
    Ended,
    Rejected,
    Missed,
    Cancelled,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::Rejected => "rejected",
            Self::Missed => "missed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ringing" => Some(Self::Ringing),
            "active" => Some(Self::Active),
            "ended" => Some(Self::Ended),
            "rejected" => Some(Self::Rejected),
            "missed" => Some(Self::Missed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Ended | Self::Rejected | Self::Missed | Self::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Initiator,
    Participant,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiator => "initiator",
            Self::Participant => "participant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiator" => Some(Self::Initiator),
            "participant" => Some(Self::Participant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_round_trips_through_parts() {
        let body = MessageBody::Image {
            urls: vec!["https://cdn.example/a.png".into()],
        };
        let rebuilt = MessageBody::from_parts(body.kind(), body.parts());
        assert_eq!(body, rebuilt);
    }

    #[test]
    fn non_text_preview_is_placeholder() {
        let body = MessageBody::Audio {
            urls: vec!["https://cdn.example/a.ogg".into()],
        };
        assert_eq!(body.preview(), "[Non-text]");
        assert_eq!(MessageBody::text("hi").preview(), "hi");
    }

    #[test]
    fn edit_preserves_kind() {
        let body = MessageBody::text("before");
        let edited = body.with_parts(vec!["after".into()]);
        assert_eq!(edited.kind(), MessageKind::Text);
        assert_eq!(edited.parts(), vec!["after".to_string()]);
    }

    #[test]
    fn terminal_states() {
        assert!(!CallStatus::Ringing.is_terminal());
        assert!(!CallStatus::Active.is_terminal());
        for s in [
            CallStatus::Ended,
            CallStatus::Rejected,
            CallStatus::Missed,
            CallStatus::Cancelled,
        ] {
            assert!(s.is_terminal());
        }
    }
}
