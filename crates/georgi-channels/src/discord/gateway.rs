//! Gateway websocket session and Channel trait implementation.

use super::types::{op, DcHello, DcMessage, DcPayload, DcReaction, DcReady};
use super::{DiscordChannel, INTENTS};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use georgi_core::{
    error::GeorgiError,
    message::{ChannelEvent, ChannelInfo, OutgoingMessage, PlatformMessage, Webhook, WebhookPost},
    traits::Channel,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

/// How a gateway session ended, when it ended cleanly.
#[derive(Debug, PartialEq)]
enum SessionEnd {
    /// Closed by the server or asked to reconnect.
    Reconnect,
    /// Nobody is listening for events anymore.
    ReceiverDropped,
}

/// A decoded dispatch (`op 0`) the session cares about.
#[derive(Debug)]
pub(crate) enum Dispatch {
    Ready { user_id: String, username: String },
    Event(ChannelEvent),
}

/// Interpret one dispatch. Unknown or undecodable events yield `None`.
pub(crate) fn interpret_dispatch(
    event: &str,
    data: Value,
    self_id: Option<&str>,
) -> Option<Dispatch> {
    match event {
        "READY" => {
            let ready: DcReady = decode(event, data)?;
            Some(Dispatch::Ready {
                user_id: ready.user.id,
                username: ready.user.username,
            })
        }
        "MESSAGE_CREATE" => {
            let msg: DcMessage = decode(event, data)?;
            Some(Dispatch::Event(ChannelEvent::Message(
                msg.into_incoming(self_id),
            )))
        }
        "MESSAGE_REACTION_ADD" => {
            let reaction: DcReaction = decode(event, data)?;
            Some(Dispatch::Event(ChannelEvent::Reaction(reaction.into_event())))
        }
        _ => None,
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("discord: failed to decode {event}: {e}");
            None
        }
    }
}

pub(crate) fn identify_frame(token: &str) -> DcPayload {
    DcPayload {
        op: op::IDENTIFY,
        d: json!({
            "token": token,
            "intents": INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "georgibot",
                "device": "georgibot",
            },
        }),
        s: None,
        t: None,
    }
}

pub(crate) fn heartbeat_frame(seq: Option<u64>) -> DcPayload {
    DcPayload {
        op: op::HEARTBEAT,
        d: json!(seq),
        s: None,
        t: None,
    }
}

fn gateway_err(e: impl std::fmt::Display) -> GeorgiError {
    GeorgiError::Channel(format!("discord gateway: {e}"))
}

/// Everything one connection attempt needs, detached from the channel.
struct Session {
    gateway_url: String,
    token: String,
    self_id: Arc<Mutex<Option<String>>>,
}

impl Session {
    /// Connect, identify, then pump events until the connection ends.
    ///
    /// Sets `ready` once `READY` arrives so the caller can reset its backoff.
    async fn run(
        &self,
        tx: &mpsc::Sender<ChannelEvent>,
        ready: &mut bool,
    ) -> Result<SessionEnd, GeorgiError> {
        let (ws, _response) = tokio_tungstenite::connect_async(&self.gateway_url)
            .await
            .map_err(gateway_err)?;
        let (mut sink, mut stream) = ws.split();

        let hello = match stream.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str::<DcPayload>(&text)?,
            Some(Ok(other)) => return Err(gateway_err(format!("expected hello, got {other:?}"))),
            Some(Err(e)) => return Err(gateway_err(e)),
            None => return Ok(SessionEnd::Reconnect),
        };
        if hello.op != op::HELLO {
            return Err(gateway_err(format!("expected op 10, got op {}", hello.op)));
        }
        let hello: DcHello = serde_json::from_value(hello.d)?;
        let period = Duration::from_millis(hello.heartbeat_interval);
        debug!("discord: heartbeat every {}ms", hello.heartbeat_interval);

        let identify = serde_json::to_string(&identify_frame(&self.token))?;
        sink.send(Message::Text(identify)).await.map_err(gateway_err)?;

        let mut seq: Option<u64> = None;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            let frame = tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = serde_json::to_string(&heartbeat_frame(seq))?;
                    sink.send(Message::Text(beat)).await.map_err(gateway_err)?;
                    continue;
                }
                frame = stream.next() => frame,
            };

            let text = match frame {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(reason))) => {
                    info!("discord gateway closed: {reason:?}");
                    return Ok(SessionEnd::Reconnect);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(gateway_err(e)),
                None => return Ok(SessionEnd::Reconnect),
            };

            let payload: DcPayload = match serde_json::from_str(&text) {
                Ok(p) => p,
                Err(e) => {
                    debug!("discord: unparseable gateway frame: {e}");
                    continue;
                }
            };
            if payload.s.is_some() {
                seq = payload.s;
            }

            match payload.op {
                op::DISPATCH => {
                    let event = payload.t.unwrap_or_default();
                    let self_id = self.self_id.lock().await.clone();
                    match interpret_dispatch(&event, payload.d, self_id.as_deref()) {
                        Some(Dispatch::Ready { user_id, username }) => {
                            info!("discord: connected as {username} ({user_id})");
                            *self.self_id.lock().await = Some(user_id);
                            *ready = true;
                        }
                        Some(Dispatch::Event(ev)) => {
                            if tx.send(ev).await.is_err() {
                                return Ok(SessionEnd::ReceiverDropped);
                            }
                        }
                        None => trace!("discord: ignoring {event}"),
                    }
                }
                op::HEARTBEAT => {
                    let beat = serde_json::to_string(&heartbeat_frame(seq))?;
                    sink.send(Message::Text(beat)).await.map_err(gateway_err)?;
                }
                op::HEARTBEAT_ACK => trace!("discord: heartbeat ack"),
                op::RECONNECT => {
                    info!("discord gateway requested reconnect");
                    return Ok(SessionEnd::Reconnect);
                }
                op::INVALID_SESSION => {
                    warn!("discord gateway invalidated the session");
                    return Ok(SessionEnd::Reconnect);
                }
                other => debug!("discord: unhandled op {other}"),
            }
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> Result<mpsc::Receiver<ChannelEvent>, GeorgiError> {
        if self.config.bot_token.is_empty() {
            return Err(GeorgiError::Channel(
                "discord bot_token is empty (set DISCORD_TOKEN)".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let session = Session {
            gateway_url: self.gateway_url.clone(),
            token: self.config.bot_token.clone(),
            self_id: self.self_id.clone(),
        };

        info!("Discord channel connecting to gateway...");

        let handle = tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let mut ready = false;
                match session.run(&tx, &mut ready).await {
                    Ok(SessionEnd::ReceiverDropped) => {
                        info!("discord channel receiver dropped, closing gateway");
                        return;
                    }
                    Ok(SessionEnd::Reconnect) => {
                        if ready {
                            backoff_secs = 1;
                        }
                        info!("discord gateway reconnecting in {backoff_secs}s");
                    }
                    Err(e) => {
                        error!("discord gateway error (retry in {backoff_secs}s): {e}");
                    }
                }

                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
            }
        });
        *self.session_task.lock().await = Some(handle);

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), GeorgiError> {
        let channel_id = message
            .reply_target
            .as_deref()
            .ok_or_else(|| GeorgiError::Channel("no reply_target on outgoing message".into()))?;

        let meta = &message.metadata;
        if !meta.provider_used.is_empty() {
            debug!(
                "discord: reply to {channel_id} generated by {} ({}) in {}ms, {:?} tokens",
                meta.provider_used,
                meta.model.as_deref().unwrap_or("unknown model"),
                meta.processing_time_ms,
                meta.tokens_used
            );
        }

        self.send_text(channel_id, &message.text, message.reply_to.as_deref())
            .await
    }

    async fn self_user_id(&self) -> Option<String> {
        self.self_id.lock().await.clone()
    }

    async fn send_typing(&self, target: &str) -> Result<(), GeorgiError> {
        self.trigger_typing(target).await
    }

    async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<PlatformMessage, GeorgiError> {
        self.get_message(channel_id, message_id).await
    }

    async fn list_channels(&self, guild_id: &str) -> Result<Vec<ChannelInfo>, GeorgiError> {
        self.guild_text_channels(guild_id).await
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<PlatformMessage>, GeorgiError> {
        self.channel_messages(channel_id, limit).await
    }

    async fn create_webhook(&self, channel_id: &str, name: &str) -> Result<Webhook, GeorgiError> {
        self.webhook_create(channel_id, name).await
    }

    async fn execute_webhook(&self, webhook: &Webhook, post: &WebhookPost) -> Result<(), GeorgiError> {
        self.webhook_execute(webhook, post).await
    }

    async fn delete_webhook(&self, webhook: &Webhook) -> Result<(), GeorgiError> {
        self.webhook_delete(webhook).await
    }

    async fn stop(&self) -> Result<(), GeorgiError> {
        if let Some(handle) = self.session_task.lock().await.take() {
            handle.abort();
        }
        info!("Discord channel stopped");
        Ok(())
    }
}
