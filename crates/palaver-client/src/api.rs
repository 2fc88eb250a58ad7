//! Typed HTTP client for the chat endpoints.
//!
//! One [`ChatApi`] per server; it is cheap to clone and safe to share across
//! tasks (the underlying `reqwest::Client` pools connections).

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use palaver_shared::constants::VOICE_CONTENT_TYPE;
use palaver_shared::types::{Message, Participant};
use palaver_shared::wire::{
    ErrorEnvelope, MessageEnvelope, MessagesEnvelope, PrivateTextRequest, PublicTextRequest,
};

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Name the server expects for uploaded recordings; the server derives its
/// own storage key, so only the extension matters.
const UPLOAD_FILE_NAME: &str = "voice-message.webm";

#[derive(Debug, Clone)]
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
}

impl ChatApi {
    /// Build a client for the server at `base_url` (scheme + host + port,
    /// with or without a trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the public room, oldest first.
    pub async fn public_messages(&self) -> Result<Vec<Message>, ClientError> {
        let response = self
            .http
            .get(format!("{}/chat/public", self.base_url))
            .send()
            .await?;
        let envelope: MessagesEnvelope = expect_json(response).await?;
        Ok(envelope.messages)
    }

    /// Fetch the conversation between two users, oldest first. Either
    /// argument order returns the same list.
    pub async fn private_messages(
        &self,
        user1_id: &str,
        user2_id: &str,
    ) -> Result<Vec<Message>, ClientError> {
        let response = self
            .http
            .get(format!("{}/chat/private", self.base_url))
            .query(&[("user1Id", user1_id), ("user2Id", user2_id)])
            .send()
            .await?;
        let envelope: MessagesEnvelope = expect_json(response).await?;
        Ok(envelope.messages)
    }

    pub async fn send_public_text(
        &self,
        sender: &Participant,
        content: &str,
    ) -> Result<Message, ClientError> {
        let request = PublicTextRequest {
            content: content.to_string(),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
        };
        let response = self
            .http
            .post(format!("{}/chat/public", self.base_url))
            .json(&request)
            .send()
            .await?;
        let envelope: MessageEnvelope = expect_json(response).await?;
        debug!(id = %envelope.message.id, "Public text sent");
        Ok(envelope.message)
    }

    pub async fn send_private_text(
        &self,
        sender: &Participant,
        recipient: &Participant,
        content: &str,
    ) -> Result<Message, ClientError> {
        let request = PrivateTextRequest {
            content: content.to_string(),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            receiver_id: recipient.id.clone(),
            receiver_name: recipient.name.clone(),
        };
        let response = self
            .http
            .post(format!("{}/chat/private", self.base_url))
            .json(&request)
            .send()
            .await?;
        let envelope: MessageEnvelope = expect_json(response).await?;
        debug!(id = %envelope.message.id, "Private text sent");
        Ok(envelope.message)
    }

    pub async fn send_public_voice(
        &self,
        sender: &Participant,
        audio: Vec<u8>,
    ) -> Result<Message, ClientError> {
        let form = voice_form(audio)?
            .text("senderId", sender.id.clone())
            .text("senderName", sender.name.clone());
        let response = self
            .http
            .post(format!("{}/chat/public/voice", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let envelope: MessageEnvelope = expect_json(response).await?;
        debug!(id = %envelope.message.id, "Public voice sent");
        Ok(envelope.message)
    }

    pub async fn send_private_voice(
        &self,
        sender: &Participant,
        recipient: &Participant,
        audio: Vec<u8>,
    ) -> Result<Message, ClientError> {
        let form = voice_form(audio)?
            .text("senderId", sender.id.clone())
            .text("senderName", sender.name.clone())
            .text("receiverId", recipient.id.clone())
            .text("receiverName", recipient.name.clone());
        let response = self
            .http
            .post(format!("{}/chat/private/voice", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let envelope: MessageEnvelope = expect_json(response).await?;
        debug!(id = %envelope.message.id, "Private voice sent");
        Ok(envelope.message)
    }

    /// Download a voice attachment by the `voiceUrl` a message carries.
    pub async fn fetch_attachment(&self, voice_url: &str) -> Result<Bytes, ClientError> {
        let response = self.http.get(voice_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_from(response).await);
        }
        Ok(response.bytes().await?)
    }
}

fn voice_form(audio: Vec<u8>) -> Result<Form, ClientError> {
    let part = Part::bytes(audio)
        .file_name(UPLOAD_FILE_NAME)
        .mime_str(VOICE_CONTENT_TYPE)?;
    Ok(Form::new().part("audio", part))
}

async fn expect_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    Ok(response.json().await?)
}

/// Turn a failing response into the matching [`ClientError`], preferring the
/// server's own `{"error": …}` body over the bare status line.
async fn error_from(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let message = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => envelope.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    };

    if status.is_client_error() {
        ClientError::Rejected { message }
    } else {
        ClientError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let api = ChatApi::new("http://localhost:8080/").unwrap();
        assert_eq!(api.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Port 9 is the discard service; nothing listens there in tests.
        let api = ChatApi::new("http://127.0.0.1:9").unwrap();
        let err = api.public_messages().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
