//! Shared domain types, configuration, and errors for Knowbot.

pub mod config;
pub mod error;
pub mod types;

pub use config::KnowbotConfig;
pub use error::{KnowbotError, Result};
pub use types::*;
