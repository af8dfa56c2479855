mod defaults;
mod env;


pub use env::DISCORD_TOKEN_SECRET;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::GeorgiError;
use defaults::*;

/// Top-level georgibot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

/// How the bot recognizes messages addressed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Mention prefix, e.g. "georgibot". Matched case-insensitively.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Separator expected after the prefix by the `prefix-separator` rule.
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Words that admit a message wherever they appear.
    #[serde(default = "default_trigger_keywords")]
    pub trigger_keywords: Vec<String>,
    /// Admission rules; any match admits the message.
    #[serde(default = "default_admission")]
    pub admission: Vec<AdmissionRule>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for a log file. Empty = stdout only.
    #[serde(default)]
    pub log_dir: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            separator: default_separator(),
            trigger_keywords: default_trigger_keywords(),
            admission: default_admission(),
            log_level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

/// Admission matcher strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdmissionRule {
    /// `prefix<sep>` or `@prefix<sep>` at the start of the message.
    PrefixSeparator,
    /// `prefix` or `@prefix` at the start of the message.
    MentionPrefix,
    /// Any trigger keyword anywhere in the message.
    Keyword,
}

/// Prompt assembly and reply policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Global system prompt. Empty = built-in default.
    #[serde(default)]
    pub system_prompt: String,
    /// Per-sender system prompts, keyed by lowercase username.
    #[serde(default)]
    pub per_user: HashMap<String, String>,
    /// Ceiling on the sanitized prompt, in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Sent when a prompt exceeds `max_chars`.
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,
    /// Sent when generation fails. Empty = fail silently.
    #[serde(default)]
    pub failure_message: String,
    /// Escape platform markdown in generated replies.
    #[serde(default = "default_true")]
    pub escape_markdown: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            per_user: HashMap::new(),
            max_chars: default_max_chars(),
            refusal_message: default_refusal_message(),
            failure_message: String::new(),
            escape_markdown: true,
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Ollama backend config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    /// Per-request timeout in seconds (default: 300).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which identity dialogue state is tracked against.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKeyPolicy {
    /// One conversation per user, across channels.
    #[default]
    User,
    /// One shared conversation per channel.
    Channel,
}

impl std::fmt::Display for ContextKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Channel => "channel",
        })
    }
}

impl std::str::FromStr for ContextKeyPolicy {
    type Err = GeorgiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "channel" => Ok(Self::Channel),
            other => Err(GeorgiError::Config(format!(
                "unknown context key policy '{other}' (expected 'user' or 'channel')"
            ))),
        }
    }
}

/// Conversation context cache config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub key: ContextKeyPolicy,
    /// Idle minutes after which a conversant starts over.
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_minutes: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            key: ContextKeyPolicy::default(),
            inactivity_minutes: default_inactivity_minutes(),
        }
    }
}

impl ContextConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.inactivity_minutes.saturating_mul(60))
    }
}

/// Typing indicator config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingConfig {
    #[serde(default = "default_typing_interval")]
    pub interval_secs: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_typing_interval(),
        }
    }
}

impl TypingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
}

/// Discord bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    /// Name of the channel quotes are reposted to.
    #[serde(default = "default_quotes_channel")]
    pub quotes_channel: String,
    /// Reactions that trigger a quote.
    #[serde(default = "default_quote_emojis")]
    pub quote_emojis: Vec<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bot_token: String::new(),
            quotes_channel: default_quotes_channel(),
            quote_emojis: default_quote_emojis(),
        }
    }
}

impl Config {
    /// Reject values that would make the bot misbehave silently.
    pub fn validate(&self) -> Result<(), GeorgiError> {
        if self.bot.prefix.trim().is_empty() {
            return Err(GeorgiError::Config("bot.prefix must not be empty".into()));
        }
        if self.bot.admission.is_empty() {
            return Err(GeorgiError::Config(
                "bot.admission must list at least one rule".into(),
            ));
        }
        if self.prompt.max_chars == 0 {
            return Err(GeorgiError::Config("prompt.max_chars must be > 0".into()));
        }
        if self.context.inactivity_minutes == 0 {
            return Err(GeorgiError::Config(
                "context.inactivity_minutes must be > 0".into(),
            ));
        }
        if self.typing.interval_secs == 0 {
            return Err(GeorgiError::Config("typing.interval_secs must be > 0".into()));
        }
        if self.provider.ollama.timeout_secs == 0 {
            return Err(GeorgiError::Config(
                "provider.ollama.timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, GeorgiError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GeorgiError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str::<Config>(&content)
            .map_err(|e| GeorgiError::Config(format!("failed to parse config: {}", e)))?
    } else {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    config.apply_env(std::env::vars())?;
    config.load_token_secret(Path::new(DISCORD_TOKEN_SECRET));
    config.validate()?;
    Ok(config)
}
