//! Background polling loop that keeps one conversation fresh.
//!
//! The loop publishes full-replace snapshots through a `watch` channel,
//! so a consumer that misses intermediate polls still renders the latest
//! state. There is no incremental merge; the server is the source of truth.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use palaver_shared::constants::{DEFAULT_POLL_INTERVAL_MS, MAX_POLL_BACKOFF_MS};
use palaver_shared::types::Message;

use crate::api::ChatApi;

/// Which conversation a sync task follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    Public,
    Private { user_id: String, peer_id: String },
}

impl Conversation {
    pub fn private(user_id: impl Into<String>, peer_id: impl Into<String>) -> Self {
        Conversation::Private {
            user_id: user_id.into(),
            peer_id: peer_id.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between successful polls.
    pub poll_interval: Duration,
    /// Ceiling for the doubling delay after failed polls.
    pub max_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_backoff: Duration::from_millis(MAX_POLL_BACKOFF_MS),
        }
    }
}

/// Handle to a running sync task.
///
/// Dropping the handle (and every receiver obtained from [`subscribe`])
/// ends the loop on its next iteration; [`stop`] ends it immediately.
///
/// [`subscribe`]: SyncHandle::subscribe
/// [`stop`]: SyncHandle::stop
pub struct SyncHandle {
    messages: watch::Receiver<Vec<Message>>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// The most recent snapshot.
    pub fn latest(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// Wait until the snapshot changes. Returns false once the loop has
    /// ended and no further change will come.
    pub async fn changed(&mut self) -> bool {
        self.messages.changed().await.is_ok()
    }

    /// An independent receiver of snapshots, for consumers on other tasks.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.messages.clone()
    }

    /// Skip the current delay and poll now. Called after a send so the
    /// conversation reflects it without waiting out the interval.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

/// Spawn the poll loop for `conversation` on the current runtime.
pub fn spawn_sync(api: ChatApi, conversation: Conversation, config: SyncConfig) -> SyncHandle {
    let (tx, rx) = watch::channel(Vec::new());
    let refresh = Arc::new(Notify::new());
    let refresh_for_loop = refresh.clone();

    let task = tokio::spawn(async move {
        sync_loop(api, conversation, config, tx, refresh_for_loop).await;
    });

    SyncHandle {
        messages: rx,
        refresh,
        task,
    }
}

async fn sync_loop(
    api: ChatApi,
    conversation: Conversation,
    config: SyncConfig,
    tx: watch::Sender<Vec<Message>>,
    refresh: Arc<Notify>,
) {
    info!(conversation = ?conversation, "Sync loop started");
    let mut delay = config.poll_interval;

    loop {
        let fetched = match &conversation {
            Conversation::Public => api.public_messages().await,
            Conversation::Private { user_id, peer_id } => {
                api.private_messages(user_id, peer_id).await
            }
        };

        match fetched {
            Ok(messages) => {
                delay = config.poll_interval;
                tx.send_if_modified(|current| {
                    if *current == messages {
                        false
                    } else {
                        debug!(count = messages.len(), "Snapshot updated");
                        *current = messages;
                        true
                    }
                });
            }
            Err(error) => {
                // Keep the previous snapshot; just slow down.
                warn!(error = %error, next_poll = ?delay, "Poll failed, backing off");
                delay = (delay * 2).min(config.max_backoff);
            }
        }

        if tx.is_closed() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = refresh.notified() => {
                debug!("Refresh requested");
            }
        }
    }

    info!(conversation = ?conversation, "Sync loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_the_shared_constants() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_backoff, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn unreachable_server_keeps_the_empty_snapshot() {
        let api = ChatApi::new("http://127.0.0.1:9").unwrap();
        let handle = spawn_sync(api, Conversation::Public, SyncConfig::default());

        // The first poll fails fast (connection refused); the snapshot stays
        // at its initial empty value rather than turning into an error.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.latest().is_empty());
        handle.stop();
    }
}
