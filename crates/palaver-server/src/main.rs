//! # palaver-server
//!
//! Messaging server for the Palaver social app.
//!
//! This binary provides:
//! - **REST API** (axum) for the public room and private 1:1 conversations,
//!   text and voice
//! - **Voice attachment storage** on the local filesystem, served back over
//!   HTTP
//! - **SQLite persistence** of the append-only message log
//! - **Per-IP rate limiting** to protect against abuse

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use palaver_server::api::{self, AppState};
use palaver_server::attachments::AttachmentStore;
use palaver_server::config::ServerConfig;
use palaver_server::rate_limit::RateLimiter;
use palaver_server::service::ChatService;
use palaver_store::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,palaver_server=debug")),
        )
        .init();

    info!("Starting Palaver messaging server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Message store (runs migrations on open)
    let database = Database::open_at(&config.db_path)?;

    // Voice attachment store (creates directories if missing)
    let attachments = AttachmentStore::new(
        config.attachments_path.clone(),
        config.max_audio_bytes,
        config.public_base_url.clone(),
    )
    .await?;

    let service = ChatService::new(
        database,
        attachments,
        config.fetch_limit,
        config.op_timeout,
    );

    let rate_limiter = RateLimiter::new(config.rate_limit_per_sec);

    // Application state for the HTTP API
    let app_state = AppState {
        service,
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict windows idle >10 min)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    // tokio::select! ensures that if either the HTTP server or a shutdown
    // signal arrives, we exit cleanly.
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
