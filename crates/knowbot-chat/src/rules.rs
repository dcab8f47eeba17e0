//! Keyword-triggered overrides applied after the completion call.
//!
//! Matching is a case-insensitive substring test on the sanitized user
//! message. Only the first matching rule applies, in this order:
//! context keyword, farewell, thanks.

use knowbot_core::{ContextTag, Conversation};

/// Reply sent when the user says goodbye.
pub const FAREWELL_REPLY: &str = "¡Hasta pronto! Si necesitas ayuda, aquí estaré.";

/// Reply sent when the user says thanks.
pub const THANKS_REPLY: &str = "¡De nada! ¿Algo más en lo que pueda ayudarte?";

const CONTEXT_KEYWORDS: &[(&str, ContextTag)] = &[("apartado 360", ContextTag::Apartado360)];
const FAREWELL_TOKENS: &[&str] = &["adiós", "bye"];
const THANKS_TOKENS: &[&str] = &["gracias"];

/// Outcome of the keyword rules for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordOverride {
    /// Enter a sticky context; the draft reply is kept.
    EnterContext(ContextTag),
    /// Clear the context and answer with [`FAREWELL_REPLY`].
    Farewell,
    /// Answer with [`THANKS_REPLY`].
    Thanks,
    /// Keep the draft reply.
    None,
}

impl KeywordOverride {
    /// Evaluate the rule chain against a user message.
    pub fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();

        if let Some((_, tag)) = CONTEXT_KEYWORDS.iter().find(|(kw, _)| lower.contains(kw)) {
            return KeywordOverride::EnterContext(*tag);
        }
        if FAREWELL_TOKENS.iter().any(|t| lower.contains(t)) {
            return KeywordOverride::Farewell;
        }
        if THANKS_TOKENS.iter().any(|t| lower.contains(t)) {
            return KeywordOverride::Thanks;
        }
        KeywordOverride::None
    }

    /// Apply the override to the conversation and return the final reply.
    pub fn apply(self, draft: String, conversation: &mut Conversation) -> String {
        match self {
            KeywordOverride::EnterContext(tag) => {
                conversation.context = Some(tag);
                draft
            }
            KeywordOverride::Farewell => {
                conversation.context = None;
                FAREWELL_REPLY.to_string()
            }
            KeywordOverride::Thanks => THANKS_REPLY.to_string(),
            KeywordOverride::None => draft,
        }
    }
}
