//! Knowbot API crate - axum HTTP server and route handlers.
//!
//! Provides document upload, the embeddable widget page, the chat and
//! reset endpoints the widget calls, session inspection, and health checks.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
