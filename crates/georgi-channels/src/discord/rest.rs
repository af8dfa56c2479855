//! REST calls against the Discord HTTP API.

use super::types::{DcChannel, DcMessage, DcWebhook};
use super::{DiscordChannel, MESSAGE_LIMIT};
use crate::utils::split_message;
use georgi_core::{
    error::GeorgiError,
    message::{ChannelInfo, PlatformMessage, Webhook, WebhookPost},
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/georgibot/georgibot, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

impl DiscordChannel {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_base))
            .header("Authorization", format!("Bot {}", self.config.bot_token))
            .header("User-Agent", USER_AGENT)
    }

    /// Send a request and turn transport failures and non-2xx into channel errors.
    async fn execute(&self, req: RequestBuilder, what: &str) -> Result<Response, GeorgiError> {
        let resp = req
            .send()
            .await
            .map_err(|e| GeorgiError::Channel(format!("discord {what} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeorgiError::Channel(format!(
                "discord {what} returned {status}: {body}"
            )));
        }
        Ok(resp)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<T, GeorgiError> {
        self.execute(req, what)
            .await?
            .json()
            .await
            .map_err(|e| GeorgiError::Channel(format!("discord {what} parse failed: {e}")))
    }

    /// Post `text` to a channel, split at the message limit.
    ///
    /// Only the first chunk carries the reply reference.
    pub(crate) async fn send_text(
        &self,
        channel_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), GeorgiError> {
        let path = format!("/channels/{channel_id}/messages");

        for (i, chunk) in split_message(text, MESSAGE_LIMIT).into_iter().enumerate() {
            let mut body = json!({ "content": chunk });
            if let (0, Some(message_id)) = (i, reply_to) {
                body["message_reference"] = json!({
                    "message_id": message_id,
                    "fail_if_not_exists": true,
                });
            }
            self.execute(self.request(Method::POST, &path).json(&body), "send")
                .await?;
        }

        debug!("discord: sent {} chars to {channel_id}", text.chars().count());
        Ok(())
    }

    /// Show the typing indicator for roughly ten seconds.
    pub(crate) async fn trigger_typing(&self, channel_id: &str) -> Result<(), GeorgiError> {
        let path = format!("/channels/{channel_id}/typing");
        self.execute(self.request(Method::POST, &path), "typing")
            .await?;
        Ok(())
    }

    pub(crate) async fn get_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<PlatformMessage, GeorgiError> {
        let path = format!("/channels/{channel_id}/messages/{message_id}");
        let msg: DcMessage = self
            .fetch_json(self.request(Method::GET, &path), "get message")
            .await?;
        Ok(msg.into_platform())
    }

    pub(crate) async fn guild_text_channels(
        &self,
        guild_id: &str,
    ) -> Result<Vec<ChannelInfo>, GeorgiError> {
        let path = format!("/guilds/{guild_id}/channels");
        let channels: Vec<DcChannel> = self
            .fetch_json(self.request(Method::GET, &path), "list channels")
            .await?;
        Ok(channels
            .into_iter()
            .filter_map(DcChannel::into_text_channel)
            .collect())
    }

    pub(crate) async fn channel_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<PlatformMessage>, GeorgiError> {
        let path = format!("/channels/{channel_id}/messages?limit={}", limit.clamp(1, 100));
        let messages: Vec<DcMessage> = self
            .fetch_json(self.request(Method::GET, &path), "list messages")
            .await?;
        Ok(messages.into_iter().map(DcMessage::into_platform).collect())
    }

    pub(crate) async fn webhook_create(
        &self,
        channel_id: &str,
        name: &str,
    ) -> Result<Webhook, GeorgiError> {
        let path = format!("/channels/{channel_id}/webhooks");
        let hook: DcWebhook = self
            .fetch_json(
                self.request(Method::POST, &path).json(&json!({ "name": name })),
                "create webhook",
            )
            .await?;
        hook.into_webhook(name)
            .ok_or_else(|| GeorgiError::Channel("discord webhook came back without a token".into()))
    }

    pub(crate) async fn webhook_execute(
        &self,
        webhook: &Webhook,
        post: &WebhookPost,
    ) -> Result<(), GeorgiError> {
        let path = format!("/webhooks/{}/{}?wait=true", webhook.id, webhook.token);
        let mut body = json!({
            "content": post.content,
            "username": post.username,
            "allowed_mentions": { "parse": [] },
        });
        if let Some(ref avatar) = post.avatar_url {
            body["avatar_url"] = json!(avatar);
        }
        if let Some(ref image) = post.image {
            body["embeds"] = json!([{ "title": image.filename, "image": { "url": image.url } }]);
        }

        // Webhook execution authenticates with the token in the path.
        let req = self
            .client
            .post(format!("{}{path}", self.api_base))
            .header("User-Agent", USER_AGENT)
            .json(&body);
        self.execute(req, "execute webhook").await?;
        Ok(())
    }

    pub(crate) async fn webhook_delete(&self, webhook: &Webhook) -> Result<(), GeorgiError> {
        let path = format!("/webhooks/{}", webhook.id);
        self.execute(self.request(Method::DELETE, &path), "delete webhook")
            .await?;
        debug!("discord: deleted webhook {}", webhook.id);
        Ok(())
    }
}
