//! Input types for the append operations.
//!
//! The persisted [`Message`](palaver_shared::Message) itself lives in
//! `palaver-shared` so server and client share one wire shape; this module
//! only holds what callers hand to the store.  Id and `created_at` are
//! assigned by the store, never by the caller.

use palaver_shared::{MessageBody, Participant};

/// A message to append, before the store assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Who sent it.
    pub sender: Participant,
    /// The other participant of a private conversation; `None` for public.
    pub recipient: Option<Participant>,
    /// Text content or a voice attachment URL.
    pub body: MessageBody,
}

impl NewMessage {
    /// Text for the public room.
    pub fn public_text(sender: Participant, content: impl Into<String>) -> Self {
        Self {
            sender,
            recipient: None,
            body: MessageBody::text(content),
        }
    }

    /// Text for a private conversation.
    pub fn private_text(
        sender: Participant,
        recipient: Participant,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            recipient: Some(recipient),
            body: MessageBody::text(content),
        }
    }

    /// Voice note for the public room; `voice_url` points at a stored attachment.
    pub fn public_voice(sender: Participant, voice_url: impl Into<String>) -> Self {
        Self {
            sender,
            recipient: None,
            body: MessageBody::voice(voice_url),
        }
    }

    /// Voice note for a private conversation.
    pub fn private_voice(
        sender: Participant,
        recipient: Participant,
        voice_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            recipient: Some(recipient),
            body: MessageBody::voice(voice_url),
        }
    }
}
