//! One rendered conversation: the fetched messages plus compose state.
//!
//! The embedding application owns a view per open conversation and feeds it
//! snapshots from a sync task (or calls [`ConversationView::refresh`]
//! directly). Sends go through the view so draft and recorder handling stay
//! consistent: a failed send loses nothing, a successful one is visible
//! immediately without waiting for the next poll.

use tracing::info;

use palaver_shared::types::{Message, Participant};

use crate::api::ChatApi;
use crate::compose::Composer;
use crate::error::ClientError;
use crate::sync::Conversation;

pub struct ConversationView {
    api: ChatApi,
    me: Participant,
    conversation: Conversation,
    pub composer: Composer,
    messages: Vec<Message>,
}

impl ConversationView {
    /// A view over `conversation` acting as `me`. The identity is supplied
    /// by the embedding application, already authenticated.
    pub fn new(api: ChatApi, me: Participant, conversation: Conversation) -> Self {
        Self {
            api,
            me,
            conversation,
            composer: Composer::new(),
            messages: Vec::new(),
        }
    }

    pub fn me(&self) -> &Participant {
        &self.me
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Replace the rendered list with a fresh snapshot.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Message>) {
        self.messages = snapshot;
    }

    /// Fetch the conversation once and replace the list. A failed fetch
    /// leaves the rendered list untouched.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let snapshot = match &self.conversation {
            Conversation::Public => self.api.public_messages().await?,
            Conversation::Private { user_id, peer_id } => {
                self.api.private_messages(user_id, peer_id).await?
            }
        };
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// Send the current draft as a text message.
    ///
    /// The draft is cleared only on success; on failure it stays in the
    /// composer so the user can retry or edit.
    pub async fn send_draft(&mut self, recipient: Option<&Participant>) -> Result<(), ClientError> {
        let content = self.composer.draft().to_string();
        let sent = self.send_text(recipient, &content).await?;

        self.composer.clear_draft();
        info!(id = %sent.id, "Draft sent");
        self.append(sent);
        Ok(())
    }

    /// Stop the recorder and send the captured audio as a voice message.
    ///
    /// The recorder returns to idle whether or not the send succeeds; a
    /// failed upload discards the recording.
    pub async fn finish_and_send_recording(
        &mut self,
        recipient: Option<&Participant>,
    ) -> Result<(), ClientError> {
        let audio = self.composer.finish_recording()?;

        let sent = match (&self.conversation, recipient) {
            (Conversation::Public, _) => self.api.send_public_voice(&self.me, audio).await?,
            (Conversation::Private { .. }, Some(recipient)) => {
                self.api.send_private_voice(&self.me, recipient, audio).await?
            }
            (Conversation::Private { .. }, None) => {
                return Err(ClientError::Rejected {
                    message: "Receiver ID required".to_string(),
                });
            }
        };

        info!(id = %sent.id, "Voice message sent");
        self.append(sent);
        Ok(())
    }

    async fn send_text(
        &self,
        recipient: Option<&Participant>,
        content: &str,
    ) -> Result<Message, ClientError> {
        match (&self.conversation, recipient) {
            (Conversation::Public, _) => self.api.send_public_text(&self.me, content).await,
            (Conversation::Private { .. }, Some(recipient)) => {
                self.api.send_private_text(&self.me, recipient, content).await
            }
            (Conversation::Private { .. }, None) => Err(ClientError::Rejected {
                message: "Receiver ID required".to_string(),
            }),
        }
    }

    /// Append a freshly sent message unless a snapshot already delivered it.
    fn append(&mut self, message: Message) {
        if self.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use palaver_shared::types::{MessageBody, Scope};
    use uuid::Uuid;

    fn view() -> ConversationView {
        ConversationView::new(
            ChatApi::new("http://127.0.0.1:9").unwrap(),
            Participant::new("u1", "Alice"),
            Conversation::Public,
        )
    }

    fn message(text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            scope: Scope::Public,
            sender_id: "u1".into(),
            sender_name: "Alice".into(),
            recipient_id: None,
            recipient_name: None,
            body: MessageBody::text(text),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_replaces_wholesale() {
        let mut view = view();
        view.apply_snapshot(vec![message("one"), message("two")]);
        assert_eq!(view.messages().len(), 2);

        view.apply_snapshot(vec![message("three")]);
        assert_eq!(view.messages().len(), 1);
    }

    #[test]
    fn append_dedupes_by_id() {
        let mut view = view();
        let msg = message("hello");
        view.apply_snapshot(vec![msg.clone()]);

        // The next poll already delivered the message we just sent.
        view.append(msg.clone());
        assert_eq!(view.messages().len(), 1);

        view.append(message("hello"));
        assert_eq!(view.messages().len(), 2);
    }

    #[tokio::test]
    async fn failed_send_keeps_the_draft() {
        let mut view = view();
        view.composer.set_draft("do not lose me");

        let err = view.send_draft(None).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert_eq!(view.composer.draft(), "do not lose me");
    }

    #[tokio::test]
    async fn failed_voice_send_still_resets_the_recorder() {
        let mut view = view();
        view.composer.start_recording().unwrap();
        view.composer.push_chunk(b"audio").unwrap();

        let err = view.finish_and_send_recording(None).await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
        assert_eq!(
            view.composer.recording_state(),
            crate::compose::RecordingState::Idle
        );
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_rendered_list() {
        let mut view = view();
        view.apply_snapshot(vec![message("kept")]);

        assert!(view.refresh().await.is_err());
        assert_eq!(view.messages().len(), 1);
    }
}
