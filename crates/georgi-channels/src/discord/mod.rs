//! Discord channel.
//!
//! Receives events over the v10 gateway websocket and talks to the REST API
//! for everything else (replies, typing, quote reposting through webhooks).
//! Docs: <https://discord.com/developers/docs>

mod gateway;
pub(crate) mod rest;
pub(crate) mod types;


use georgi_core::config::DiscordConfig;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const API_BASE: &str = "https://discord.com/api/v10";
const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Discord's per-message character limit.
pub const MESSAGE_LIMIT: usize = 2000;

/// GUILDS | GUILD_MESSAGES | GUILD_MESSAGE_REACTIONS | MESSAGE_CONTENT.
pub const INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 10) | (1 << 15);

/// Discord channel using the gateway for events and REST for actions.
pub struct DiscordChannel {
    config: DiscordConfig,
    client: reqwest::Client,
    api_base: String,
    gateway_url: String,
    /// Our own user id, learned from `READY`.
    self_id: Arc<Mutex<Option<String>>>,
    session_task: Mutex<Option<JoinHandle<()>>>,
}

impl DiscordChannel {
    /// Create a new Discord channel from config.
    pub fn new(config: DiscordConfig) -> Self {
        Self::with_endpoints(config, API_BASE, GATEWAY_URL)
    }

    /// Same as [`new`](Self::new) with custom REST and gateway endpoints.
    pub fn with_endpoints(config: DiscordConfig, api_base: &str, gateway_url: &str) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            gateway_url: gateway_url.to_string(),
            self_id: Arc::new(Mutex::new(None)),
            session_task: Mutex::new(None),
        }
    }
}
