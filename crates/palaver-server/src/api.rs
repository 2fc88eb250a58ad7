use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use palaver_shared::constants::VOICE_CONTENT_TYPE;
use palaver_shared::wire::{
    MessageEnvelope, MessagesEnvelope, PrivateTextRequest, PublicTextRequest,
};
use palaver_shared::{Participant, Scope};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::service::ChatService;

#[derive(Clone)]
pub struct AppState {
    pub service: ChatService,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    // Multipart voice uploads carry the audio plus a few short text fields.
    let body_limit = state.config.max_audio_bytes + 64 * 1024;

    Router::new()
        .route("/health", get(health_check))
        .route("/chat/public", get(public_messages))
        .route("/chat/public", post(public_text))
        .route("/chat/public/voice", post(public_voice))
        .route("/chat/private", get(private_messages))
        .route("/chat/private", post(private_text))
        .route("/chat/private/voice", post(private_voice))
        .route("/attachments/{scope}/{name}", get(attachment_download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Query of `GET /chat/private`.  Both ids optional at the HTTP layer so a
/// missing one produces the service's validation message, not a 422.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateQuery {
    user1_id: Option<String>,
    user2_id: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn public_messages(
    State(state): State<AppState>,
) -> Result<Json<MessagesEnvelope>, ApiError> {
    let messages = state.service.public_conversation().await?;
    Ok(Json(MessagesEnvelope { messages }))
}

async fn public_text(
    State(state): State<AppState>,
    Json(req): Json<PublicTextRequest>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let sender = Participant::new(req.sender_id, req.sender_name);
    let message = state.service.send_public_text(sender, &req.content).await?;
    Ok(Json(MessageEnvelope { message }))
}

async fn public_voice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let mut form = VoiceForm::read_from(multipart).await?;

    let audio = form.take_audio()?;
    let sender = Participant::new(form.sender_id, form.sender_name);

    let message = state.service.send_public_voice(sender, audio).await?;
    Ok(Json(MessageEnvelope { message }))
}

async fn private_messages(
    State(state): State<AppState>,
    Query(q): Query<PrivateQuery>,
) -> Result<Json<MessagesEnvelope>, ApiError> {
    let user1 = q.user1_id.unwrap_or_default();
    let user2 = q.user2_id.unwrap_or_default();
    let messages = state.service.private_conversation(&user1, &user2).await?;
    Ok(Json(MessagesEnvelope { messages }))
}

async fn private_text(
    State(state): State<AppState>,
    Json(req): Json<PrivateTextRequest>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let sender = Participant::new(req.sender_id, req.sender_name);
    let recipient = Participant::new(req.receiver_id, req.receiver_name);
    let message = state
        .service
        .send_private_text(sender, recipient, &req.content)
        .await?;
    Ok(Json(MessageEnvelope { message }))
}

async fn private_voice(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MessageEnvelope>, ApiError> {
    let mut form = VoiceForm::read_from(multipart).await?;

    let audio = form.take_audio()?;
    let sender = Participant::new(form.sender_id, form.sender_name);
    let recipient = Participant::new(form.receiver_id, form.receiver_name);

    let message = state
        .service
        .send_private_voice(sender, recipient, audio)
        .await?;
    Ok(Json(MessageEnvelope { message }))
}

async fn attachment_download(
    State(state): State<AppState>,
    Path((scope, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let scope = Scope::parse(&scope)
        .ok_or_else(|| ApiError::Validation("Unknown attachment scope".to_string()))?;

    let data = state.service.attachment(scope, &name).await?;
    Ok(([(header::CONTENT_TYPE, VOICE_CONTENT_TYPE)], data).into_response())
}

/// Fields of the two voice-send multipart forms.  Unknown fields are skipped,
/// missing text fields stay empty and fail the service's per-field checks.
#[derive(Default)]
struct VoiceForm {
    audio: Option<Bytes>,
    sender_id: String,
    sender_name: String,
    receiver_id: String,
    receiver_name: String,
}

impl VoiceForm {
    async fn read_from(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(format!("Multipart error: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "audio" => {
                    form.audio = Some(field.bytes().await.map_err(|e| {
                        ApiError::Validation(format!("Failed to read field: {e}"))
                    })?);
                }
                "senderId" => form.sender_id = read_text(field).await?,
                "senderName" => form.sender_name = read_text(field).await?,
                "receiverId" => form.receiver_id = read_text(field).await?,
                "receiverName" => form.receiver_name = read_text(field).await?,
                _ => {}
            }
        }

        Ok(form)
    }

    fn take_audio(&mut self) -> Result<Bytes, ApiError> {
        self.audio
            .take()
            .ok_or_else(|| ApiError::Validation("Audio file required".to_string()))
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read field: {e}")))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
