//! The message domain model.
//!
//! Every struct derives `Serialize`/`Deserialize` with the camelCase field
//! names the HTTP API exposes, so the same types travel from the store
//! through the server to the client without a mapping layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Visibility class of a message.
///
/// `Public` messages are visible to everyone; `Private` messages only to
/// their sender and recipient. The scope is fixed at creation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Public,
    Private,
}

impl Scope {
    /// Stable lowercase name, used in SQL values and attachment keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Public => "public",
            Scope::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Scope::Public),
            "private" => Some(Scope::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant of a conversation, as supplied by the caller.
///
/// Ids are opaque strings issued by the user directory; the name is a display
/// value captured at send time and never updated retroactively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Message payload: exactly one of text or a voice attachment reference.
///
/// On the wire this is the `type` tag plus `content` or `voiceUrl`, matching
/// the shape the chat endpoints have always produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    #[serde(rename_all = "camelCase")]
    Text { content: String },
    #[serde(rename_all = "camelCase")]
    Voice { voice_url: String },
}

impl MessageBody {
    pub fn text(content: impl Into<String>) -> Self {
        MessageBody::Text {
            content: content.into(),
        }
    }

    pub fn voice(voice_url: impl Into<String>) -> Self {
        MessageBody::Voice {
            voice_url: voice_url.into(),
        }
    }

    pub fn is_voice(&self) -> bool {
        matches!(self, MessageBody::Voice { .. })
    }
}

/// A single chat message as persisted and as served over HTTP.
///
/// `id` and `created_at` are assigned by the server at creation time;
/// `created_at` is the sole ordering key (ties resolve by insertion order).
/// The recipient pair is populated exactly when `scope` is [`Scope::Private`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub scope: Scope,
    pub sender_id: String,
    pub sender_name: String,
    #[serde(
        rename = "receiverId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recipient_id: Option<String>,
    #[serde(
        rename = "receiverName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recipient_name: Option<String>,
    #[serde(flatten)]
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Whether `user` may see this message: always for public scope, only
    /// the two participants for private scope.
    pub fn visible_to(&self, user_id: &str) -> bool {
        match self.scope {
            Scope::Public => true,
            Scope::Private => {
                self.sender_id == user_id || self.recipient_id.as_deref() == Some(user_id)
            }
        }
    }
}
