//! Environment-variable overrides, applied on top of the TOML file.

use super::Config;
use crate::error::GeorgiError;
use std::path::Path;
use tracing::{debug, warn};

/// Docker secret holding the Discord token.
pub const DISCORD_TOKEN_SECRET: &str = "/run/secrets/discord_token";

/// Per-sender system prompt variables look like `SYSTEM_PROMPT_ALICE`.
const PER_USER_PROMPT_PREFIX: &str = "SYSTEM_PROMPT_";

impl Config {
    /// Apply environment overrides. Empty values are ignored.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), GeorgiError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if value.trim().is_empty() {
                continue;
            }
            match key.as_str() {
                "MENTION_PREFIX" => self.bot.prefix = value,
                "SYSTEM_PROMPT" => self.prompt.system_prompt = value,
                "OLLAMA_HOST" => self.provider.ollama.base_url = value,
                "OLLAMA_MODEL" => self.provider.ollama.model = value,
                "OLLAMA_TIMEOUT_SECS" => {
                    self.provider.ollama.timeout_secs = parse_number(&key, &value)?;
                }
                "CONTEXT_TIMEOUT_MINUTES" => {
                    self.context.inactivity_minutes = parse_number(&key, &value)?;
                }
                "CONTEXT_KEY" => self.context.key = value.parse()?,
                "DISCORD_TOKEN" => self.channel.discord.bot_token = value,
                _ => {
                    if let Some(user) = key.strip_prefix(PER_USER_PROMPT_PREFIX) {
                        if !user.is_empty() {
                            debug!("system prompt override for user {}", user.to_lowercase());
                            self.prompt.per_user.insert(user.to_lowercase(), value);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Read the Discord token from a secret file when nothing else set it.
    pub fn load_token_secret(&mut self, path: &Path) {
        if !self.channel.discord.bot_token.is_empty() || !path.exists() {
            return;
        }
        match std::fs::read_to_string(path) {
            Ok(token) => self.channel.discord.bot_token = token.trim().to_string(),
            Err(e) => warn!("failed to read token from {}: {e}", path.display()),
        }
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64, GeorgiError> {
    value
        .trim()
        .parse()
        .map_err(|e| GeorgiError::Config(format!("{key}='{value}' is not a number: {e}")))
}
