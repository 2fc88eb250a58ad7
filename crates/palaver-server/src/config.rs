//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use palaver_shared::constants;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite message database.
    /// Env: `DB_PATH`
    /// Default: `./palaver.db`
    pub db_path: PathBuf,

    /// Directory where voice attachments are stored.
    /// Env: `ATTACHMENTS_PATH`
    /// Default: `./attachments`
    pub attachments_path: PathBuf,

    /// Base URL under which clients reach this server, used to build
    /// attachment URLs.  No trailing slash.
    /// Env: `PUBLIC_BASE_URL`
    /// Default: `http://127.0.0.1:8080`
    pub public_base_url: String,

    /// Maximum number of messages a conversation fetch returns.
    /// Env: `FETCH_LIMIT`
    /// Default: `100`
    pub fetch_limit: u32,

    /// Upper bound for any single store or attachment operation.
    /// Env: `OP_TIMEOUT_MS`
    /// Default: `10000`
    pub op_timeout: Duration,

    /// Maximum accepted voice recording size in bytes.
    /// Env: `MAX_AUDIO_BYTES`
    /// Default: `10485760` (10 MiB)
    pub max_audio_bytes: usize,

    /// Per-IP request budget per second.  0 disables rate limiting.
    /// Env: `RATE_LIMIT_PER_SEC`
    /// Default: `30`
    pub rate_limit_per_sec: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], constants::DEFAULT_HTTP_PORT).into(),
            db_path: PathBuf::from("./palaver.db"),
            attachments_path: PathBuf::from("./attachments"),
            public_base_url: format!("http://127.0.0.1:{}", constants::DEFAULT_HTTP_PORT),
            fetch_limit: constants::DEFAULT_FETCH_LIMIT,
            op_timeout: Duration::from_millis(constants::DEFAULT_OP_TIMEOUT_MS),
            max_audio_bytes: constants::DEFAULT_MAX_AUDIO_BYTES,
            rate_limit_per_sec: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("ATTACHMENTS_PATH") {
            config.attachments_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(val) = std::env::var("FETCH_LIMIT") {
            if let Ok(n) = val.parse::<u32>() {
                config.fetch_limit = n;
            } else {
                tracing::warn!(value = %val, "Invalid FETCH_LIMIT, using default");
            }
        }

        if let Ok(val) = std::env::var("OP_TIMEOUT_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                config.op_timeout = Duration::from_millis(ms);
            } else {
                tracing::warn!(value = %val, "Invalid OP_TIMEOUT_MS, using default");
            }
        }

        if let Ok(val) = std::env::var("MAX_AUDIO_BYTES") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_audio_bytes = n;
            } else {
                tracing::warn!(value = %val, "Invalid MAX_AUDIO_BYTES, using default");
            }
        }

        if let Ok(val) = std::env::var("RATE_LIMIT_PER_SEC") {
            if let Ok(n) = val.parse::<u32>() {
                config.rate_limit_per_sec = n;
            } else {
                tracing::warn!(value = %val, "Invalid RATE_LIMIT_PER_SEC, using default");
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
