//! The main event loop connecting channels, the context store and the provider.
//!
//! Each inbound event is handled on its own task. Messages go through the
//! turn pipeline; reactions go to the quote flow.

mod pipeline;
mod quote;
mod typing;


use georgi_core::{
    config::{Config, ContextKeyPolicy},
    message::{ChannelEvent, IncomingMessage, MessageMetadata, OutgoingMessage},
    prompt::PromptBuilder,
    traits::{Channel, Provider},
};
use georgi_memory::ContextStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// The central gateway that routes events between channels and the provider.
pub struct Gateway {
    pub(super) provider: Arc<dyn Provider>,
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    pub(super) store: ContextStore,
    pub(super) prompts: PromptBuilder,
    pub(super) model: String,
    pub(super) timeout: Duration,
    pub(super) key_policy: ContextKeyPolicy,
    pub(super) typing_interval: Duration,
    /// Sent when generation fails. Empty = silent.
    pub(super) failure_message: String,
    pub(super) escape_markdown: bool,
    /// Name of the channel quotes are reposted to.
    pub(super) quotes_channel: String,
    pub(super) quote_emojis: Vec<String>,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(
        provider: Arc<dyn Provider>,
        channels: HashMap<String, Arc<dyn Channel>>,
        cfg: &Config,
    ) -> Self {
        Self {
            provider,
            channels,
            store: ContextStore::new(cfg.context.window()),
            prompts: PromptBuilder::new(&cfg.bot, &cfg.prompt),
            model: cfg.provider.ollama.model.clone(),
            timeout: cfg.provider.ollama.timeout(),
            key_policy: cfg.context.key,
            typing_interval: cfg.typing.interval(),
            failure_message: cfg.prompt.failure_message.clone(),
            escape_markdown: cfg.prompt.escape_markdown,
            quotes_channel: cfg.channel.discord.quotes_channel.clone(),
            quote_emojis: cfg.channel.discord.quote_emojis.clone(),
        }
    }

    /// Run the main event loop.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "georgibot gateway running | provider: {} | model: {} | channels: {} | context: per {} ({}m window)",
            self.provider.name(),
            self.model,
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
            self.key_policy,
            self.store.window().as_secs() / 60,
        );

        let (tx, mut rx) = mpsc::channel::<(String, ChannelEvent)>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(event) = channel_rx.recv().await {
                    if tx.send((channel_name.clone(), event)).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                Some((name, event)) = rx.recv() => {
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.dispatch(&name, event).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Route one event to the pipeline or the quote flow.
    async fn dispatch(&self, channel_name: &str, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(incoming) => {
                self.handle_message(incoming).await;
            }
            ChannelEvent::Reaction(reaction) => match self.channels.get(channel_name) {
                Some(channel) => {
                    self.handle_reaction(channel.clone(), reaction).await;
                }
                None => warn!("reaction from unknown channel {channel_name}"),
            },
        }
    }

    /// Stop all channels.
    async fn shutdown(&self) {
        info!("Shutting down...");

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        info!(
            "Shutdown complete. Dropped {} conversation context(s).",
            self.store.len()
        );
    }

    /// Reply to a message, falling back once to a plain send if the reply fails.
    pub(super) async fn reply(
        &self,
        incoming: &IncomingMessage,
        text: String,
        metadata: MessageMetadata,
    ) {
        let Some(channel) = self.channels.get(&incoming.channel) else {
            warn!("no channel named {} to reply on", incoming.channel);
            return;
        };

        let msg = OutgoingMessage {
            text,
            metadata,
            reply_target: incoming.reply_target.clone(),
            reply_to: Some(incoming.message_id.clone()),
        };

        if let Err(e) = channel.send(msg.clone()).await {
            warn!(
                "[{}] reply to {} failed, sending plain: {e}",
                incoming.channel, incoming.message_id
            );
            let plain = OutgoingMessage {
                reply_to: None,
                ..msg
            };
            if let Err(e) = channel.send(plain).await {
                error!("failed to send message: {e}");
            }
        }
    }

    /// Send a plain text message to a platform channel.
    pub(super) async fn send_text(channel: &dyn Channel, target: &str, text: &str) {
        let msg = OutgoingMessage {
            text: text.to_string(),
            reply_target: Some(target.to_string()),
            ..Default::default()
        };

        if let Err(e) = channel.send(msg).await {
            error!("failed to send message: {e}");
        }
    }
}
