mod gateway;

use clap::{Parser, Subcommand};
use georgi_channels::discord::DiscordChannel;
use georgi_core::{
    config::{self, Config},
    inference::InferenceRequest,
    prompt::PromptBuilder,
    traits::{Channel, Provider},
};
use georgi_providers::ollama::OllamaProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "georgibot",
    version,
    about = "georgibot: a Discord bot that talks about Bulgaria through Ollama"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the Ollama model.
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Print the configuration summary and check the backend.
    Status,
    /// Send a one-shot question to the backend, without context.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(&cli.config)?;
    if let Some(model) = cli.model.clone().filter(|m| !m.trim().is_empty()) {
        cfg.provider.ollama.model = model;
    }

    // Held until exit so buffered file output is flushed.
    let _log_guard = init_tracing(&cfg);

    match cli.command {
        Commands::Start => {
            let provider = build_provider(&cfg);

            if !provider.is_available().await {
                anyhow::bail!(
                    "Ollama is not reachable at {}. Is `ollama serve` running?",
                    cfg.provider.ollama.base_url
                );
            }

            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();

            let discord = &cfg.channel.discord;
            if discord.enabled {
                if discord.bot_token.is_empty() {
                    anyhow::bail!(
                        "Discord is enabled but bot_token is empty. \
                         Set it in config.toml or the DISCORD_TOKEN env var."
                    );
                }
                let channel = DiscordChannel::new(discord.clone());
                channels.insert("discord".to_string(), Arc::new(channel));
            }

            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
            }

            println!("georgibot: starting...");
            let gw = Arc::new(gateway::Gateway::new(provider, channels, &cfg));
            gw.run().await?;
        }
        Commands::Status => {
            println!("georgibot status\n");
            println!("Config: {}", cli.config);
            println!("Prefix: {}", cfg.bot.prefix);
            println!(
                "Context: per {}, {}m inactivity window",
                cfg.context.key, cfg.context.inactivity_minutes
            );
            println!();

            let provider = build_provider(&cfg);
            let available = provider.is_available().await;
            println!(
                "  ollama ({} @ {}): {}",
                cfg.provider.ollama.model,
                cfg.provider.ollama.base_url,
                if available { "available" } else { "unreachable" }
            );

            let discord = &cfg.channel.discord;
            println!(
                "  discord: {}",
                if discord.enabled && !discord.bot_token.is_empty() {
                    "configured"
                } else if discord.enabled {
                    "enabled but missing bot_token"
                } else {
                    "disabled"
                }
            );
            println!("  quotes channel: #{}", discord.quotes_channel);
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: georgibot ask <message>");
            }

            let provider = build_provider(&cfg);
            if !provider.is_available().await {
                anyhow::bail!(
                    "Ollama is not reachable at {}",
                    cfg.provider.ollama.base_url
                );
            }

            let prompts = PromptBuilder::new(&cfg.bot, &cfg.prompt);
            let built = prompts.build(&message.join(" "), "cli", "cli", None);
            prompts.check_length(&built)?;

            let request = InferenceRequest::new(
                &cfg.provider.ollama.model,
                &built.prompt,
                &built.system,
                None,
            );
            let response = provider
                .generate(&request, cfg.provider.ollama.timeout())
                .await?;
            println!("{}", response.text);
        }
    }

    Ok(())
}

/// Install the stdout subscriber, plus a file writer when `bot.log_dir` is set.
fn init_tracing(cfg: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.bot.log_level));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    if cfg.bot.log_dir.trim().is_empty() {
        registry.init();
        return None;
    }

    let appender = tracing_appender::rolling::never(&cfg.bot.log_dir, "georgibot.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    registry
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Some(guard)
}

fn build_provider(cfg: &Config) -> Arc<dyn Provider> {
    Arc::new(OllamaProvider::from_config(
        cfg.provider.ollama.base_url.clone(),
        cfg.provider.ollama.model.clone(),
    ))
}
