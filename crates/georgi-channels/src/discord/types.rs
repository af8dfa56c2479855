//! Discord API (v10) deserialization types and conversions.

use chrono::{DateTime, Utc};
use georgi_core::message::{
    Attachment, ChannelInfo, IncomingMessage, PlatformMessage, PlatformUser, ReactionEvent,
    ReplyContext, Webhook,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const CDN_BASE: &str = "https://cdn.discordapp.com";

/// Guild text channel type.
pub(crate) const GUILD_TEXT: u8 = 0;

/// Gateway opcodes we send or handle.
pub(crate) mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Every gateway frame, before `d` is interpreted.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DcPayload {
    pub op: u8,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcHello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcReady {
    pub user: DcUser,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DcUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DcMember {
    #[serde(default)]
    pub nick: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DcAttachment {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DcMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: DcUser,
    #[serde(default)]
    pub member: Option<DcMember>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<DcAttachment>,
    #[serde(default)]
    pub referenced_message: Option<Box<DcMessage>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcEmoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcReaction {
    pub user_id: String,
    pub channel_id: String,
    pub message_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub emoji: DcEmoji,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcChannel {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcWebhook {
    pub id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl DcUser {
    /// CDN avatar, or the default avatar when the user never set one.
    pub fn avatar_url(&self) -> String {
        match self.avatar.as_deref() {
            Some(hash) => {
                let ext = if hash.starts_with("a_") { "gif" } else { "png" };
                format!("{CDN_BASE}/avatars/{}/{hash}.{ext}", self.id)
            }
            None => {
                let index = self.id.parse::<u64>().map(|id| (id >> 22) % 6).unwrap_or(0);
                format!("{CDN_BASE}/embed/avatars/{index}.png")
            }
        }
    }

    fn global_or_username(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}

impl DcMessage {
    /// Guild nickname, then global name, then username.
    fn display_name(&self) -> &str {
        self.member
            .as_ref()
            .and_then(|m| m.nick.as_deref())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.author.global_or_username())
    }

    /// Convert a `MESSAGE_CREATE` payload into the gateway's inbound shape.
    pub fn into_incoming(self, self_id: Option<&str>) -> IncomingMessage {
        let sender_name = self.display_name().to_string();
        let reply_to = self.referenced_message.as_deref().map(|r| ReplyContext {
            author_id: r.author.id.clone(),
            author_name: r.display_name().to_string(),
            content: r.content.clone(),
            from_self: self_id == Some(r.author.id.as_str()),
        });

        IncomingMessage {
            id: Uuid::new_v4(),
            message_id: self.id,
            channel: "discord".to_string(),
            sender_id: self.author.id,
            sender_name: Some(sender_name),
            sender_username: self.author.username,
            is_bot: self.author.bot,
            text: self.content,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            reply_to,
            reply_target: Some(self.channel_id),
            guild_id: self.guild_id,
        }
    }

    pub fn into_platform(self) -> PlatformMessage {
        let author = PlatformUser {
            display_name: Some(self.display_name().to_string()),
            avatar_url: Some(self.author.avatar_url()),
            id: self.author.id.clone(),
            username: self.author.username.clone(),
            is_bot: self.author.bot,
        };
        PlatformMessage {
            id: self.id,
            channel_id: self.channel_id,
            content: self.content,
            author,
            attachments: self
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    filename: a.filename,
                    url: a.url,
                })
                .collect(),
        }
    }
}

impl DcReaction {
    /// Unicode emoji stay as-is; custom emoji become `:name:`.
    pub fn into_event(self) -> ReactionEvent {
        let name = self.emoji.name.unwrap_or_default();
        let emoji = if self.emoji.id.is_some() {
            format!(":{name}:")
        } else {
            name
        };
        ReactionEvent {
            emoji,
            channel_id: self.channel_id,
            message_id: self.message_id,
            guild_id: self.guild_id,
            user_id: self.user_id,
        }
    }
}

impl DcChannel {
    /// Text channels only; categories and voice channels are skipped.
    pub fn into_text_channel(self) -> Option<ChannelInfo> {
        if self.kind != GUILD_TEXT {
            return None;
        }
        Some(ChannelInfo {
            id: self.id,
            name: self.name?,
        })
    }
}

impl DcWebhook {
    pub fn into_webhook(self, fallback_name: &str) -> Option<Webhook> {
        Some(Webhook {
            id: self.id,
            token: self.token?,
            name: self.name.unwrap_or_else(|| fallback_name.to_string()),
        })
    }
}
