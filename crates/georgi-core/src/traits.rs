use crate::{
    error::GeorgiError,
    inference::{InferenceRequest, InferenceResponse},
    message::{ChannelEvent, ChannelInfo, OutgoingMessage, PlatformMessage, Webhook, WebhookPost},
};
use async_trait::async_trait;
use std::time::Duration;

/// Text-generation backend.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Run one generation, failing if it takes longer than `timeout`.
    ///
    /// An empty generation is reported as [`GeorgiError::EmptyGeneration`].
    async fn generate(
        &self,
        request: &InferenceRequest,
        timeout: Duration,
    ) -> Result<InferenceResponse, GeorgiError>;

    /// Check if the provider is available and ready.
    async fn is_available(&self) -> bool;
}

/// A messaging platform the bot listens and replies on.
///
/// The quote surface (`fetch_message` .. `delete_webhook`) is optional;
/// platforms without webhooks keep the default "unsupported" errors.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for events.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<ChannelEvent>, GeorgiError>;

    /// Send a message. When `reply_to` is set the platform threads it as a reply.
    async fn send(&self, message: OutgoingMessage) -> Result<(), GeorgiError>;

    /// The bot's own platform user id, once known.
    async fn self_user_id(&self) -> Option<String> {
        None
    }

    /// Send a typing indicator to show the bot is processing.
    async fn send_typing(&self, _target: &str) -> Result<(), GeorgiError> {
        Ok(())
    }

    /// Fetch a single message by id.
    async fn fetch_message(
        &self,
        _channel_id: &str,
        _message_id: &str,
    ) -> Result<PlatformMessage, GeorgiError> {
        Err(unsupported(self.name(), "fetch_message"))
    }

    /// List the text channels of a guild.
    async fn list_channels(&self, _guild_id: &str) -> Result<Vec<ChannelInfo>, GeorgiError> {
        Err(unsupported(self.name(), "list_channels"))
    }

    /// Most recent messages of a channel, newest first.
    async fn recent_messages(
        &self,
        _channel_id: &str,
        _limit: u8,
    ) -> Result<Vec<PlatformMessage>, GeorgiError> {
        Err(unsupported(self.name(), "recent_messages"))
    }

    async fn create_webhook(&self, _channel_id: &str, _name: &str) -> Result<Webhook, GeorgiError> {
        Err(unsupported(self.name(), "create_webhook"))
    }

    async fn execute_webhook(&self, _webhook: &Webhook, _post: &WebhookPost) -> Result<(), GeorgiError> {
        Err(unsupported(self.name(), "execute_webhook"))
    }

    async fn delete_webhook(&self, _webhook: &Webhook) -> Result<(), GeorgiError> {
        Err(unsupported(self.name(), "delete_webhook"))
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), GeorgiError>;
}

fn unsupported(channel: &str, op: &str) -> GeorgiError {
    GeorgiError::Channel(format!("{channel} does not support {op}"))
}
