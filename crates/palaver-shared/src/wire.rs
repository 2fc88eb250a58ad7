//! Request and response bodies of the chat HTTP API.
//!
//! Kept in the shared crate so the server handlers and the client speak the
//! exact same JSON.

use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Body of `POST /chat/public`.
///
/// Fields default to empty so an absent field surfaces as the matching
/// per-field validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicTextRequest {
    pub content: String,
    pub sender_id: String,
    pub sender_name: String,
}

/// Body of `POST /chat/private`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateTextRequest {
    pub content: String,
    pub sender_id: String,
    pub sender_name: String,
    pub receiver_id: String,
    pub receiver_name: String,
}

/// Response envelope of the conversation fetch endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesEnvelope {
    pub messages: Vec<Message>,
}

/// Response envelope of the send endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message: Message,
}

/// Error body every failing endpoint produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// One entry of the user directory collaborator (`GET /users`).
///
/// The messaging core never verifies these; it consumes them to populate
/// recipient pickers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Envelope of the user directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_request_uses_receiver_names() {
        let req = PrivateTextRequest {
            content: "hello".into(),
            sender_id: "u1".into(),
            sender_name: "Alice".into(),
            receiver_id: "u2".into(),
            receiver_name: "Bob".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["receiverId"], "u2");
        assert_eq!(json["receiverName"], "Bob");
        assert_eq!(json["senderId"], "u1");
    }

    #[test]
    fn user_summary_optional_picture() {
        let user: UserSummary =
            serde_json::from_str(r#"{"id":"u1","name":"Alice","email":"a@example.com"}"#).unwrap();
        assert_eq!(user.profile_picture, None);

        let user: UserSummary = serde_json::from_str(
            r#"{"id":"u1","name":"Alice","email":"a@example.com","profilePicture":"p.png"}"#,
        )
        .unwrap();
        assert_eq!(user.profile_picture.as_deref(), Some("p.png"));
    }
}
