/// Application name
pub const APP_NAME: &str = "Palaver";

/// How many messages a conversation fetch returns at most.
/// Deployments override this via `FETCH_LIMIT`.
pub const DEFAULT_FETCH_LIMIT: u32 = 100;

/// Client poll interval while a conversation view is open.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Ceiling for the poll delay after consecutive failed fetches.
pub const MAX_POLL_BACKOFF_MS: u64 = 30_000;

/// Maximum accepted voice recording size in bytes (10 MiB).
pub const DEFAULT_MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound on any single store or attachment operation before it is
/// failed instead of left hanging.
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 10_000;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Content type of stored voice recordings.
pub const VOICE_CONTENT_TYPE: &str = "audio/webm";

/// File extension matching [`VOICE_CONTENT_TYPE`].
pub const VOICE_FILE_EXT: &str = "webm";
