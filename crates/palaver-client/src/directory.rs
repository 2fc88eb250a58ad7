//! User directory lookup, used to populate recipient pickers.
//!
//! The directory is a separate service owned by the surrounding application;
//! the chat server neither hosts nor verifies it. The trait keeps the
//! embedding pluggable: tests and offline builds use [`InMemoryUserDirectory`].

use std::time::Duration;

use palaver_shared::wire::{UserSummary, UsersEnvelope};

use crate::error::ClientError;

#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// List known users whose name or email contains `search`
    /// (case-insensitive). An empty search lists everyone.
    async fn list_users(&self, search: &str) -> Result<Vec<UserSummary>, ClientError>;
}

/// Directory backed by the application's `GET /users` endpoint.
pub struct HttpUserDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn list_users(&self, search: &str) -> Result<Vec<UserSummary>, ClientError> {
        let mut request = self.http.get(format!("{}/users", self.base_url));
        if !search.is_empty() {
            request = request.query(&[("search", search)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        let envelope: UsersEnvelope = response.json().await?;
        Ok(envelope.users)
    }
}

/// Fixed user list, filtered locally.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Vec<UserSummary>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<UserSummary>) -> Self {
        Self { users }
    }
}

#[async_trait::async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn list_users(&self, search: &str) -> Result<Vec<UserSummary>, ClientError> {
        let needle = search.to_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|user| {
                needle.is_empty()
                    || user.name.to_lowercase().contains(&needle)
                    || user.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }
}
