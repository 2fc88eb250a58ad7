//! Filesystem-backed storage for voice attachments.
//!
//! Voice notes arrive as opaque `audio/webm` bytes, are written below
//! `{base}/{scope}/` under a collision-resistant name, and are served back
//! via `GET /attachments/{scope}/{name}`.  Callers write the message row
//! only after [`AttachmentStore::store`] returned, so a URL referenced by a
//! stored message always resolves.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use palaver_shared::constants::VOICE_FILE_EXT;
use palaver_shared::Scope;

use crate::error::ApiError;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ApiError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target.strip_prefix(base).unwrap_or(target).components() {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(ApiError::Validation("Path traversal detected".to_string()));
            }
            _ => {} // RootDir, CurDir, Prefix -- skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ApiError::Validation("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

/// Voice attachment storage rooted at one directory, with one subdirectory
/// per scope.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    base_path: PathBuf,
    max_bytes: usize,
    public_base_url: String,
}

impl AttachmentStore {
    pub async fn new(
        base_path: PathBuf,
        max_bytes: usize,
        public_base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        for scope in [Scope::Public, Scope::Private] {
            let dir = base_path.join(scope.as_str());
            fs::create_dir_all(&dir).await.map_err(|e| {
                ApiError::Storage(format!(
                    "Failed to create attachment directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        info!(path = %base_path.display(), "Attachment store initialized");

        Ok(Self {
            base_path,
            max_bytes,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Store one voice recording and return its public URL.  The URL is only
    /// handed out after the write completed.
    pub async fn store(
        &self,
        audio: &[u8],
        scope: Scope,
        participants: &[&str],
    ) -> Result<String, ApiError> {
        if audio.is_empty() {
            return Err(ApiError::Validation("Audio file required".to_string()));
        }
        if audio.len() > self.max_bytes {
            return Err(ApiError::AttachmentTooLarge {
                size: audio.len(),
                max: self.max_bytes,
            });
        }

        let file_name = attachment_file_name(participants);
        let path = self.safe_attachment_path(scope, &file_name)?;

        fs::write(&path, audio).await.map_err(|e| {
            ApiError::Storage(format!("Failed to write attachment {file_name}: {e}"))
        })?;

        debug!(scope = %scope, file = %file_name, size = audio.len(), "Stored attachment");

        Ok(format!(
            "{}/attachments/{}/{}",
            self.public_base_url, scope, file_name
        ))
    }

    /// Read one stored attachment back.
    pub async fn fetch(&self, scope: Scope, file_name: &str) -> Result<Vec<u8>, ApiError> {
        let path = self.safe_attachment_path(scope, file_name)?;

        if !path.exists() {
            return Err(ApiError::NotFound);
        }

        let data = fs::read(&path).await.map_err(|e| {
            ApiError::Storage(format!("Failed to read attachment {file_name}: {e}"))
        })?;

        debug!(scope = %scope, file = %file_name, size = data.len(), "Retrieved attachment");
        Ok(data)
    }

    /// Safe attachment path that validates against traversal.
    fn safe_attachment_path(&self, scope: Scope, file_name: &str) -> Result<PathBuf, ApiError> {
        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
            return Err(ApiError::Validation("Path traversal detected".to_string()));
        }
        let target = self.base_path.join(scope.as_str()).join(file_name);
        ensure_within(&self.base_path, &target)
    }
}

/// `{unix_millis}-{uuid}-{ids}.webm`.  The uuid keeps concurrent uploads of
/// the same participants within one millisecond from colliding.
fn attachment_file_name(participants: &[&str]) -> String {
    let ids: Vec<String> = participants.iter().map(|id| sanitize_id(id)).collect();
    format!(
        "{}-{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        ids.join("-"),
        VOICE_FILE_EXT
    )
}

/// Keep participant ids filesystem-safe: ASCII alphanumerics, `_` and `-`,
/// capped at 24 chars.  Uniqueness comes from the uuid, not from the ids.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(24)
        .collect()
}
