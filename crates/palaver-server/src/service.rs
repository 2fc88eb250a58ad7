//! The validated, scope-aware operations layer.
//!
//! Every HTTP handler goes through [`ChatService`]: it validates identity
//! and content fields before touching storage, bridges the synchronous store
//! onto the runtime with `spawn_blocking`, and bounds every storage call by
//! the configured timeout so a stuck disk fails the request instead of
//! hanging it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use palaver_shared::{Message, Participant, Scope};
use palaver_store::{Database, NewMessage, StoreError};

use crate::attachments::AttachmentStore;
use crate::error::ApiError;

/// Messaging operations shared by every request handler.
///
/// The store sits behind a mutex: SQLite serializes writes anyway, and
/// funneling every append through one connection is what makes the store's
/// monotonic `created_at` clamp effective.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<Mutex<Database>>,
    attachments: Arc<AttachmentStore>,
    fetch_limit: u32,
    op_timeout: Duration,
}

impl ChatService {
    pub fn new(
        store: Database,
        attachments: AttachmentStore,
        fetch_limit: u32,
        op_timeout: Duration,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            attachments: Arc::new(attachments),
            fetch_limit,
            op_timeout,
        }
    }

    /// Append one text message to the public room.
    pub async fn send_public_text(
        &self,
        sender: Participant,
        content: &str,
    ) -> Result<Message, ApiError> {
        let content = require(content, "Message content required")?;
        let sender = valid_sender(&sender)?;

        let message = self
            .with_store(move |db| db.append_public(NewMessage::public_text(sender, content)))
            .await?;

        info!(id = %message.id, sender = %message.sender_id, "public text message sent");
        Ok(message)
    }

    /// Append one text message to a private conversation.
    pub async fn send_private_text(
        &self,
        sender: Participant,
        recipient: Participant,
        content: &str,
    ) -> Result<Message, ApiError> {
        let content = require(content, "Message content required")?;
        let sender = valid_sender(&sender)?;
        let recipient = valid_recipient(&recipient)?;

        let message = self
            .with_store(move |db| {
                db.append_private(NewMessage::private_text(sender, recipient, content))
            })
            .await?;

        info!(id = %message.id, sender = %message.sender_id, "private text message sent");
        Ok(message)
    }

    /// Store the recording, then append a public voice message referencing
    /// it.  The row is only written after the upload succeeded, so a stored
    /// message never points at a missing attachment.
    pub async fn send_public_voice(
        &self,
        sender: Participant,
        audio: Bytes,
    ) -> Result<Message, ApiError> {
        if audio.is_empty() {
            return Err(ApiError::Validation("Audio file required".to_string()));
        }
        let sender = valid_sender(&sender)?;

        let voice_url = self
            .store_attachment(audio, Scope::Public, &[&sender.id])
            .await?;

        let message = self
            .with_store(move |db| db.append_public(NewMessage::public_voice(sender, voice_url)))
            .await?;

        info!(id = %message.id, sender = %message.sender_id, "public voice message sent");
        Ok(message)
    }

    /// Private counterpart of [`ChatService::send_public_voice`], same
    /// upload-before-append contract.
    pub async fn send_private_voice(
        &self,
        sender: Participant,
        recipient: Participant,
        audio: Bytes,
    ) -> Result<Message, ApiError> {
        if audio.is_empty() {
            return Err(ApiError::Validation("Audio file required".to_string()));
        }
        let sender = valid_sender(&sender)?;
        let recipient = valid_recipient(&recipient)?;

        let voice_url = self
            .store_attachment(audio, Scope::Private, &[&sender.id, &recipient.id])
            .await?;

        let message = self
            .with_store(move |db| {
                db.append_private(NewMessage::private_voice(sender, recipient, voice_url))
            })
            .await?;

        info!(id = %message.id, sender = %message.sender_id, "private voice message sent");
        Ok(message)
    }

    /// The public room, ascending by time, capped at the configured limit.
    pub async fn public_conversation(&self) -> Result<Vec<Message>, ApiError> {
        let limit = self.fetch_limit;
        self.with_store(move |db| db.list_public(limit)).await
    }

    /// One private conversation, ascending by time.  Requires two non-empty,
    /// distinct user ids; the pair is unordered.
    pub async fn private_conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Message>, ApiError> {
        let user_a = user_a.trim().to_string();
        let user_b = user_b.trim().to_string();

        if user_a.is_empty() || user_b.is_empty() {
            return Err(ApiError::Validation("Both user IDs required".to_string()));
        }
        if user_a == user_b {
            return Err(ApiError::Validation(
                "Two distinct user IDs required".to_string(),
            ));
        }

        let limit = self.fetch_limit;
        self.with_store(move |db| db.list_private(&user_a, &user_b, limit))
            .await
    }

    /// Serve a stored attachment's bytes.
    pub async fn attachment(&self, scope: Scope, file_name: &str) -> Result<Vec<u8>, ApiError> {
        match tokio::time::timeout(self.op_timeout, self.attachments.fetch(scope, file_name)).await
        {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }

    async fn store_attachment(
        &self,
        audio: Bytes,
        scope: Scope,
        participants: &[&str],
    ) -> Result<String, ApiError> {
        match tokio::time::timeout(
            self.op_timeout,
            self.attachments.store(&audio, scope, participants),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout),
        }
    }

    /// Run one store operation on the blocking pool, bounded by the op
    /// timeout.  A timed-out operation keeps running to completion in the
    /// background; the caller just stops waiting for it.
    async fn with_store<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            // A poisoned lock still holds a usable connection.
            let db = store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            op(&db)
        });

        match tokio::time::timeout(self.op_timeout, task).await {
            Ok(Ok(result)) => result.map_err(ApiError::from),
            Ok(Err(join_err)) => Err(ApiError::Storage(format!("Store task failed: {join_err}"))),
            Err(_) => Err(ApiError::Timeout),
        }
    }
}

fn require(value: &str, message: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

fn valid_sender(sender: &Participant) -> Result<Participant, ApiError> {
    Ok(Participant {
        id: require(&sender.id, "Sender ID required")?,
        name: require(&sender.name, "Sender name required")?,
    })
}

fn valid_recipient(recipient: &Participant) -> Result<Participant, ApiError> {
    Ok(Participant {
        id: require(&recipient.id, "Receiver ID required")?,
        name: require(&recipient.name, "Receiver name required")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_shared::MessageBody;
    use tempfile::TempDir;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    async fn test_service(max_audio: usize) -> (ChatService, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let attachments =
            AttachmentStore::new(dir.path().join("att"), max_audio, "http://localhost:8080")
                .await
                .unwrap();
        let service = ChatService::new(db, attachments, 100, TEST_TIMEOUT);
        (service, dir)
    }

    fn alice() -> Participant {
        Participant::new("u1", "Alice")
    }

    fn bob() -> Participant {
        Participant::new("u2", "Bob")
    }

    #[tokio::test]
    async fn text_round_trips_through_fetch() {
        let (service, _dir) = test_service(1024).await;

        let sent = service.send_public_text(alice(), "hi").await.unwrap();
        let listed = service.public_conversation().await.unwrap();
        assert_eq!(listed, vec![sent]);
    }

    #[tokio::test]
    async fn whitespace_content_is_rejected_with_no_row() {
        let (service, _dir) = test_service(1024).await;

        let err = service
            .send_private_text(alice(), bob(), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Message content required"));

        let listed = service.private_conversation("u1", "u2").await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn fields_are_trimmed_before_persisting() {
        let (service, _dir) = test_service(1024).await;

        let sent = service
            .send_public_text(Participant::new(" u1 ", " Alice "), "  hello  ")
            .await
            .unwrap();
        assert_eq!(sent.sender_id, "u1");
        assert_eq!(sent.sender_name, "Alice");
        assert_eq!(sent.body, MessageBody::text("hello"));
    }

    #[tokio::test]
    async fn missing_identity_fields_are_reported_per_field() {
        let (service, _dir) = test_service(1024).await;

        let err = service
            .send_public_text(Participant::new("", "Alice"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Sender ID required"));

        let err = service
            .send_public_text(Participant::new("u1", " "), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Sender name required"));

        let err = service
            .send_private_text(alice(), Participant::new("", "Bob"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Receiver ID required"));

        let err = service
            .send_private_text(alice(), Participant::new("u2", ""), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Receiver name required"));
    }

    #[tokio::test]
    async fn empty_audio_is_rejected() {
        let (service, _dir) = test_service(1024).await;

        let err = service
            .send_public_voice(alice(), Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Audio file required"));
    }

    #[tokio::test]
    async fn failed_voice_upload_leaves_no_message_row() {
        // A cap of 8 bytes makes any real recording fail the upload step.
        let (service, _dir) = test_service(8).await;

        let err = service
            .send_private_voice(alice(), bob(), Bytes::from_static(&[0u8; 64]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AttachmentTooLarge { .. }));

        let listed = service.private_conversation("u1", "u2").await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn voice_message_references_a_fetchable_attachment() {
        let (service, _dir) = test_service(1024).await;

        let sent = service
            .send_public_voice(alice(), Bytes::from_static(b"webm"))
            .await
            .unwrap();

        let url = match &sent.body {
            MessageBody::Voice { voice_url } => voice_url.clone(),
            MessageBody::Text { .. } => panic!("expected a voice message"),
        };
        let name = url.rsplit('/').next().unwrap();
        let data = service.attachment(Scope::Public, name).await.unwrap();
        assert_eq!(data, b"webm");
    }

    #[tokio::test]
    async fn private_fetch_requires_two_distinct_ids() {
        let (service, _dir) = test_service(1024).await;

        let err = service.private_conversation("u1", "").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Both user IDs required"));

        let err = service.private_conversation("u1", "u1").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn private_conversation_is_symmetric() {
        let (service, _dir) = test_service(1024).await;

        service.send_private_text(alice(), bob(), "one").await.unwrap();
        service.send_private_text(bob(), alice(), "two").await.unwrap();

        let ab = service.private_conversation("u1", "u2").await.unwrap();
        let ba = service.private_conversation("u2", "u1").await.unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 2);
    }
}
