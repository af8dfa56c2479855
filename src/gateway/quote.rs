//! Quote flow: repost a reacted-to message into the quotes channel under the
//! author's name and avatar, through a short-lived webhook.

use super::Gateway;
use georgi_core::{
    error::GeorgiError,
    message::{ReactionEvent, WebhookPost},
    traits::Channel,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const BOT_AUTHOR_NOTICE: &str = "Sorry, I don't quote application messages!";
pub const NO_QUOTES_CHANNEL_NOTICE: &str = "Sorry, I couldn't find the quotes channel!";
pub const QUOTE_FAILED_NOTICE: &str =
    "Oops! Something went wrong while attempting to quote that message!";

/// How many recent messages of the quotes channel are checked for duplicates.
const DEDUPE_WINDOW: u8 = 100;

/// How a reaction was handled.
#[derive(Debug)]
pub enum QuoteOutcome {
    /// Not a quote emoji, or not in a guild.
    Ignored,
    /// The message was written by another bot.
    BotAuthor,
    NoQuotesChannel,
    /// Identical content is already in the quotes channel.
    Duplicate,
    Posted,
    /// The webhook existed but posting through it failed.
    PostFailed,
    /// A platform lookup failed before anything was posted.
    Failed(GeorgiError),
}

fn delete_failed_notice(webhook_name: &str) -> String {
    format!(
        "Oops! Something went wrong while attempting to delete the webhook {webhook_name}. \
         You may want to manually delete it."
    )
}

impl Gateway {
    pub(super) async fn handle_reaction(
        &self,
        channel: Arc<dyn Channel>,
        reaction: ReactionEvent,
    ) -> QuoteOutcome {
        if !self.quote_emojis.iter().any(|e| *e == reaction.emoji) {
            return QuoteOutcome::Ignored;
        }
        let Some(ref guild_id) = reaction.guild_id else {
            debug!("ignoring quote reaction outside a guild");
            return QuoteOutcome::Ignored;
        };
        let notify_channel = reaction.channel_id.as_str();

        let msg = match channel
            .fetch_message(&reaction.channel_id, &reaction.message_id)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                error!("quote: could not get message {}: {e}", reaction.message_id);
                return QuoteOutcome::Failed(e);
            }
        };

        let self_id = channel.self_user_id().await;
        if msg.author.is_bot && self_id.as_deref() != Some(msg.author.id.as_str()) {
            Self::send_text(channel.as_ref(), notify_channel, BOT_AUTHOR_NOTICE).await;
            return QuoteOutcome::BotAuthor;
        }

        let channels = match channel.list_channels(guild_id).await {
            Ok(c) => c,
            Err(e) => {
                error!("quote: could not get channels of guild {guild_id}: {e}");
                return QuoteOutcome::Failed(e);
            }
        };
        let Some(quotes) = channels
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(&self.quotes_channel))
        else {
            Self::send_text(channel.as_ref(), notify_channel, NO_QUOTES_CHANNEL_NOTICE).await;
            return QuoteOutcome::NoQuotesChannel;
        };

        // Attachment-only messages have no content to compare.
        if !msg.content.is_empty() {
            match channel.recent_messages(&quotes.id, DEDUPE_WINDOW).await {
                Ok(recent) if recent.iter().any(|m| m.content == msg.content) => {
                    debug!("quote: message {} already quoted", msg.id);
                    return QuoteOutcome::Duplicate;
                }
                Ok(_) => {}
                Err(e) => warn!("quote: could not read #{}: {e}", quotes.name),
            }
        }

        let webhook = match channel.create_webhook(&quotes.id, &msg.author.username).await {
            Ok(w) => w,
            Err(e) => {
                error!("quote: could not create webhook in #{}: {e}", quotes.name);
                Self::send_text(channel.as_ref(), notify_channel, QUOTE_FAILED_NOTICE).await;
                return QuoteOutcome::Failed(e);
            }
        };

        let post = WebhookPost {
            content: msg.content.clone(),
            username: msg.author.shown_name().to_string(),
            avatar_url: msg.author.avatar_url.clone(),
            image: msg.attachments.first().cloned(),
        };

        let outcome = match channel.execute_webhook(&webhook, &post).await {
            Ok(()) => {
                info!(
                    "quote: reposted message {} by {} to #{}",
                    msg.id, post.username, quotes.name
                );
                QuoteOutcome::Posted
            }
            Err(e) => {
                warn!("quote: could not execute webhook: {e}");
                Self::send_text(channel.as_ref(), notify_channel, QUOTE_FAILED_NOTICE).await;
                QuoteOutcome::PostFailed
            }
        };

        if let Err(e) = channel.delete_webhook(&webhook).await {
            Self::send_text(
                channel.as_ref(),
                notify_channel,
                &delete_failed_notice(&webhook.name),
            )
            .await;
            warn!("quote: could not delete webhook {}: {e}", webhook.name);
        }

        outcome
    }
}
