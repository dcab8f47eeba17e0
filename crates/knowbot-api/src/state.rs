//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use knowbot_chat::{ChatTurnProcessor, CompletionClient, SessionStore};
use knowbot_core::config::KnowbotConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<KnowbotConfig>,
    /// Session storage.
    pub store: Arc<dyn SessionStore>,
    /// Chat turn processor bound to `store`.
    pub processor: Arc<ChatTurnProcessor>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState wiring the processor to the given store and client.
    pub fn new(
        config: KnowbotConfig,
        store: Arc<dyn SessionStore>,
        client: Arc<dyn CompletionClient>,
    ) -> Self {
        let processor = ChatTurnProcessor::new(Arc::clone(&store), client, config.chat.clone());
        Self {
            config: Arc::new(config),
            store,
            processor: Arc::new(processor),
            start_time: Instant::now(),
        }
    }
}
