//! Error types for the chat engine.

use knowbot_core::SessionId;

use crate::completion::CompletionError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CompletionError> for ChatError {
    fn from(err: CompletionError) -> Self {
        ChatError::Upstream(err.to_string())
    }
}
