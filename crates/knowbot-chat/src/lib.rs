//! Chat engine for Knowbot.
//!
//! Holds the session store, the chat-turn protocol (validation, prompt
//! building, keyword overrides, bounded history), the completion client
//! that talks to the LLM API, and the background expiry sweeper.

pub mod completion;
pub mod error;
pub mod processor;
pub mod prompt;
pub mod rules;
pub mod sanitize;
pub mod store;
pub mod sweeper;

pub use completion::{
    CompletionClient, CompletionError, CompletionRequest, DeepSeekClient, FnCompletionClient,
};
pub use error::ChatError;
pub use processor::ChatTurnProcessor;
pub use rules::KeywordOverride;
pub use sanitize::sanitize_html;
pub use store::{InMemorySessionStore, SessionLease, SessionStore};
pub use sweeper::SessionSweeper;
