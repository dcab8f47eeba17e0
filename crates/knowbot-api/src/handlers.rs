//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path/query/body parameters via axum extractors,
//! interacts with AppState services, and returns JSON or HTML responses.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use knowbot_core::{ContextTag, SessionId};
use knowbot_extract::extract_knowledge;
use knowbot_widget::{render_widget, WidgetOptions};

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the uploaded document.
const DOCUMENT_FIELD: &str = "document";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub chatbot_id: SessionId,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoResponse {
    pub chatbot_id: SessionId,
    pub created_at: DateTime<Utc>,
    pub context: Option<ContextTag>,
    pub history_length: usize,
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - liveness and basic counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.store.len(),
    })
}

// =============================================================================
// Upload
// =============================================================================

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("El archivo excede el tamaño máximo permitido".to_string())
    } else {
        ApiError::BadRequest(format!("Cuerpo multipart inválido: {}", err.body_text()))
    }
}

/// POST /api/upload - extract a document and create a chatbot session.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut document = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(DOCUMENT_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        document = Some((bytes, content_type, file_name));
        break;
    }

    let (bytes, content_type, file_name) = document
        .ok_or_else(|| ApiError::BadRequest("No se proporcionó ningún archivo".to_string()))?;

    let max_bytes = state.config.upload.max_bytes;
    if bytes.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "El archivo excede el tamaño máximo de {} bytes",
            max_bytes
        )));
    }

    let size = bytes.len();
    let knowledge = tokio::task::spawn_blocking(move || {
        extract_knowledge(&bytes, content_type.as_deref(), file_name.as_deref())
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Extraction task failed");
        ApiError::Internal("Error al procesar el documento".to_string())
    })??;

    let chatbot_id = state.store.create(knowledge).await?;
    tracing::info!(session_id = %chatbot_id, size, "Chatbot created from upload");

    Ok(Json(UploadResponse {
        success: true,
        chatbot_id,
    }))
}

// =============================================================================
// Widget
// =============================================================================

/// GET /chatbot/{id} - render the embeddable widget.
pub async fn widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(options): Query<WidgetOptions>,
) -> Result<Html<String>, ApiError> {
    let id = SessionId::from(id);
    state.store.get(&id).await?;
    Ok(Html(render_widget(&id, &options)))
}

// =============================================================================
// Chat
// =============================================================================

/// POST /api/chat/{id} - run one chat turn.
pub async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) =
        body.map_err(|e| ApiError::BadRequest(format!("Cuerpo JSON inválido: {}", e.body_text())))?;

    let reply = state
        .processor
        .handle_turn(&SessionId::from(id), &request.message)
        .await?;

    Ok(Json(ChatResponse { reply }))
}

/// POST /api/reset/{id} - clear the conversation.
pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    state.processor.reset(&SessionId::from(id)).await?;
    Ok(Json(ResetResponse { success: true }))
}

/// GET /api/sessions/{id} - session metadata without the knowledge text.
pub async fn session_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfoResponse>, ApiError> {
    let id = SessionId::from(id);
    let session = state.store.get(&id).await?;
    let conversation = state.store.conversation(&id).await?;

    Ok(Json(SessionInfoResponse {
        chatbot_id: session.id,
        created_at: session.created_at,
        context: conversation.context,
        history_length: conversation.history.len(),
    }))
}
