//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping internal errors to appropriate HTTP status codes.
//! Messages are user-facing (Spanish, like the widget); causes of upstream
//! and internal failures are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use knowbot_chat::ChatError;
use knowbot_extract::ExtractError;
use serde::{Deserialize, Serialize};

/// Reply shown in the widget when a chat turn fails upstream.
pub const APOLOGY_REPLY: &str =
    "Lo siento, hubo un error al procesar tu mensaje. ¿Puedes intentarlo de nuevo?";

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Chat reply to display instead of an answer, for chat failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid input.
    BadRequest(String),
    /// 404 Not Found - unknown chatbot.
    NotFound(String),
    /// 413 Payload Too Large - upload exceeds the size limit.
    PayloadTooLarge(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 502 Bad Gateway - the completion API failed; carries the apology reply.
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, reply) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg, None)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
            ApiError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                msg,
                Some(APOLOGY_REPLY.to_string()),
            ),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            reply,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::SessionNotFound(_) => ApiError::NotFound("Chatbot no encontrado".to_string()),
            ChatError::EmptyMessage => ApiError::BadRequest("Mensaje vacío".to_string()),
            ChatError::MessageTooLong(limit) => ApiError::BadRequest(format!(
                "El mensaje excede el límite de {} caracteres",
                limit
            )),
            ChatError::Upstream(cause) => {
                tracing::warn!(error = %cause, "Chat turn failed upstream");
                ApiError::Upstream("Error al consultar el servicio de respuestas".to_string())
            }
            ChatError::Internal(cause) => {
                tracing::error!(error = %cause, "Chat turn failed");
                ApiError::Internal("Error interno del servidor".to_string())
            }
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedFormat(_) => {
                ApiError::BadRequest("Formato no soportado".to_string())
            }
            ExtractError::Pdf(cause) => {
                tracing::error!(error = %cause, "Document extraction failed");
                ApiError::Internal("Error al procesar el documento".to_string())
            }
        }
    }
}
