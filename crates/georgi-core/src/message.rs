use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything a channel can hand to the gateway.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Message(IncomingMessage),
    Reaction(ReactionEvent),
}

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Internal id, used to correlate log lines for one turn.
    pub id: Uuid,
    /// Platform message id (used as the reply reference).
    pub message_id: String,
    /// Channel name (e.g. "discord").
    pub channel: String,
    /// Platform-specific user ID.
    pub sender_id: String,
    /// Human-readable sender name (nickname or global name). Display only.
    pub sender_name: Option<String>,
    /// Platform account name. Per-user system prompts are keyed on this.
    #[serde(default)]
    pub sender_username: String,
    /// Whether the author is an application/bot account (including us).
    #[serde(default)]
    pub is_bot: bool,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// If this is a reply, what it replies to.
    #[serde(default)]
    pub reply_to: Option<ReplyContext>,
    /// Platform-specific target for routing the response (e.g. Discord channel_id).
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Guild (server) the message was posted in, if any.
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// The message an incoming message replies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyContext {
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    /// True when the replied-to message was written by this bot.
    #[serde(default)]
    pub from_self: bool,
}

/// A reaction added to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    /// Unicode emoji, or `:name:` for custom emoji.
    pub emoji: String,
    pub channel_id: String,
    pub message_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub user_id: String,
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub metadata: MessageMetadata,
    /// Platform-specific target for routing (e.g. Discord channel_id).
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Message to reply to. `None` sends a plain message.
    #[serde(default)]
    pub reply_to: Option<String>,
}

/// Metadata about how a message was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}

/// A message fetched back from the platform (quote flow).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformMessage {
    pub id: String,
    pub channel_id: String,
    pub content: String,
    pub author: PlatformUser,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Author information for a fetched message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformUser {
    pub id: String,
    pub username: String,
    /// Nickname or global name, whichever the platform shows.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl PlatformUser {
    /// Name to show when impersonating this user.
    pub fn shown_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

/// A file attachment on a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

/// A text channel inside a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

/// A webhook created for impersonated reposting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub token: String,
    pub name: String,
}

/// Payload for executing a webhook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPost {
    pub content: String,
    pub username: String,
    pub avatar_url: Option<String>,
    /// Image embed (title, url), for the first attachment of the quoted message.
    pub image: Option<Attachment>,
}
