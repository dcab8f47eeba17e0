use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

// =============================================================================
// Identity
// =============================================================================

/// Opaque identifier of a chatbot session.
///
/// Generated ids are 128 random bits, hex encoded (32 characters). Ids that
/// arrive from clients are accepted verbatim and simply fail lookup when
/// unknown.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rng.random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One history entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sticky conversational mode set by keyword rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextTag {
    /// The user asked about "apartado 360".
    #[serde(rename = "apartado_360")]
    Apartado360,
}

impl ContextTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextTag::Apartado360 => "apartado_360",
        }
    }
}

/// Mutable chat state attached to a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub context: Option<ContextTag>,
    pub history: Vec<Turn>,
}

impl Conversation {
    /// Append a user/assistant exchange and keep only the newest `limit` entries.
    pub fn record_exchange(&mut self, user: String, assistant: String, limit: usize) {
        self.history.push(Turn::user(user));
        self.history.push(Turn::assistant(assistant));

        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// Clear context and history.
    pub fn reset(&mut self) {
        self.context = None;
        self.history.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_none() && self.history.is_empty()
    }
}

// =============================================================================
// Session
// =============================================================================

/// A document-knowledge context created from one upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub knowledge: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(knowledge: String) -> Self {
        Self {
            id: SessionId::generate(),
            knowledge,
            created_at: Utc::now(),
        }
    }

    /// Whether the session is older than `ttl` at `now`.
    ///
    /// A session exactly `ttl` old is still alive.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }
}
