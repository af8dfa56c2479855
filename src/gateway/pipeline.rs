//! One conversational turn, from admission to reply.

use super::typing::TypingIndicator;
use super::Gateway;
use chrono::Utc;
use georgi_core::{
    error::GeorgiError,
    inference::InferenceRequest,
    message::{IncomingMessage, MessageMetadata},
    sanitize::escape_markdown,
};
use georgi_memory::ConversantKey;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// How a turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Not addressed to the bot, or written by a bot. Nothing happened.
    Rejected,
    /// Input over the length ceiling; only the refusal was sent.
    Refused,
    /// The backend answered, state was stored and a reply sent.
    Completed,
    /// The backend call failed; the stored context is untouched.
    Failed(GeorgiError),
}

impl Gateway {
    /// Process a single incoming message through the full pipeline.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) -> TurnOutcome {
        // --- 1. ADMISSION ---
        if incoming.is_bot || !self.prompts.admits(&incoming.text) {
            return TurnOutcome::Rejected;
        }

        let sender = incoming.sender_name.as_deref().unwrap_or("unknown");
        let preview = if incoming.text.chars().count() > 60 {
            let truncated: String = incoming.text.chars().take(60).collect();
            format!("{truncated}...")
        } else {
            incoming.text.clone()
        };
        info!(
            "[{}] {} says: {} (turn {})",
            incoming.channel, sender, preview, incoming.id
        );
        if let Ok(lag) = (Utc::now() - incoming.timestamp).to_std() {
            debug!(
                "[{}] turn {} picked up {}ms after posting",
                incoming.channel,
                incoming.id,
                lag.as_millis()
            );
        }

        // --- 2. CONTEXT (evict-if-stale, then read) ---
        let key = ConversantKey::for_message(self.key_policy, &incoming);
        let context = self.store.load(&key, Utc::now());
        debug!(
            "[{}] context for {key}: {}",
            incoming.channel,
            context
                .as_ref()
                .map_or_else(|| "fresh".to_string(), |c| format!("{} tokens", c.len()))
        );

        // --- 3. PROMPT + LENGTH CHECK ---
        let built = self.prompts.build(
            &incoming.text,
            sender,
            &incoming.sender_username,
            incoming.reply_to.as_ref(),
        );
        for warning in &built.warnings {
            warn!("[{}] sanitizer: {warning}", incoming.channel);
        }

        if let Err(e) = self.prompts.check_length(&built) {
            info!("[{}] turn {}: refusing {sender}: {e}", incoming.channel, incoming.id);
            self.reply(
                &incoming,
                self.prompts.refusal_message().to_string(),
                MessageMetadata::default(),
            )
            .await;
            return TurnOutcome::Refused;
        }

        // --- 4. REQUEST (typing indicator spans the backend call) ---
        let request = InferenceRequest::new(&self.model, &built.prompt, &built.system, context);
        info!("[{}] prompt: {}", incoming.channel, request.prompt);

        let typing = match (
            self.channels.get(&incoming.channel),
            incoming.reply_target.as_ref(),
        ) {
            (Some(channel), Some(target)) => Some(TypingIndicator::start(
                channel.clone(),
                target.clone(),
                self.typing_interval,
            )),
            _ => None,
        };

        let started = Instant::now();
        let result = self.provider.generate(&request, self.timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Some(typing) = typing {
            typing.stop().await;
        }

        // --- 5. COMPLETE OR FAIL ---
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "[{}] turn {}: generation for {sender} failed after {elapsed_ms}ms: {e}",
                    incoming.channel, incoming.id
                );
                if !self.failure_message.is_empty() {
                    self.reply(
                        &incoming,
                        self.failure_message.clone(),
                        MessageMetadata::default(),
                    )
                    .await;
                }
                return TurnOutcome::Failed(e);
            }
        };

        let metadata = MessageMetadata {
            provider_used: self.provider.name().to_string(),
            tokens_used: response.tokens_used(),
            processing_time_ms: elapsed_ms,
            model: Some(response.model.clone()).filter(|m| !m.is_empty()),
        };

        self.store.put(key, response.state);

        let text = if self.escape_markdown {
            escape_markdown(&response.text)
        } else {
            response.text
        };

        info!(
            "[{}] turn {}: answered {sender} in {}ms via {}/{} ({} chars, {} tokens)",
            incoming.channel,
            incoming.id,
            metadata.processing_time_ms,
            metadata.provider_used,
            metadata.model.as_deref().unwrap_or(&self.model),
            text.chars().count(),
            metadata.tokens_used.map_or_else(|| "?".to_string(), |t| t.to_string()),
        );
        self.reply(&incoming, text, metadata).await;

        TurnOutcome::Completed
    }
}
