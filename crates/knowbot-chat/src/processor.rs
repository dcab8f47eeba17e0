//! Chat turn processor: validates a message, asks the completion client for
//! a reply, applies keyword overrides and records the exchange.
//!
//! The session lease is held for the whole turn, so turns and resets on one
//! session are serialized and the sweep never evicts a session mid-turn.

use std::sync::Arc;

use knowbot_core::config::ChatConfig;
use knowbot_core::SessionId;
use tracing::{debug, warn};

use crate::completion::{CompletionClient, CompletionRequest};
use crate::error::ChatError;
use crate::prompt::build_system_prompt;
use crate::rules::KeywordOverride;
use crate::sanitize::sanitize_html;
use crate::store::SessionStore;

/// Runs one user message through the chat protocol.
pub struct ChatTurnProcessor {
    store: Arc<dyn SessionStore>,
    client: Arc<dyn CompletionClient>,
    config: ChatConfig,
}

impl ChatTurnProcessor {
    pub fn new(
        store: Arc<dyn SessionStore>,
        client: Arc<dyn CompletionClient>,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Handle one chat turn and return the reply.
    ///
    /// On any error the conversation is left exactly as it was.
    pub async fn handle_turn(&self, id: &SessionId, raw_message: &str) -> Result<String, ChatError> {
        let mut lease = self.store.lease(id).await?;

        let message = sanitize_html(raw_message).trim().to_string();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let chars = message.chars().count();
        if chars > self.config.max_message_chars {
            return Err(ChatError::MessageTooLong(self.config.max_message_chars));
        }

        let request = CompletionRequest {
            system_prompt: build_system_prompt(&lease.session().knowledge),
            history: lease.conversation().history.clone(),
            message: message.clone(),
        };

        let draft = self.client.complete(&request).await.map_err(|e| {
            warn!(session_id = %id, error = %e, "Completion failed");
            ChatError::from(e)
        })?;

        let rule = KeywordOverride::detect(&message);
        let conversation = lease.conversation_mut();
        let reply = rule.apply(draft, conversation);
        conversation.record_exchange(message, reply.clone(), self.config.history_limit);

        debug!(
            session_id = %id,
            message_chars = chars,
            reply_chars = reply.chars().count(),
            history_len = conversation.history.len(),
            rule = ?rule,
            "Chat turn completed"
        );

        Ok(reply)
    }

    /// Clear the session's context and history.
    pub async fn reset(&self, id: &SessionId) -> Result<(), ChatError> {
        self.store.reset_conversation(id).await
    }
}
