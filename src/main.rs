mod analytics;
mod annotate;
mod clock;
mod commands;
mod gateway;
mod handlers;
mod humanize;
mod owner;
mod router;
mod safety;
#[cfg(test)]
mod testing;
mod trigger;

use clap::{Parser, Subcommand};
use doppel_channels::console::ConsoleChannel;
use doppel_core::{
    config::{self, Config},
    traits::{Channel, Provider, Speech},
};
use doppel_memory::Store;
use doppel_providers::{
    gemini::GeminiProvider,
    link::LinkPreview,
    llm::{LlmSummarizer, LlmTranslator},
    search::WebSearch,
    tts::GoogleTts,
    youtube::YouTubeSearch,
};
use gateway::{Gateway, Outcome};
use handlers::{Collaborators, Handlers};
use safety::SafetyFilter;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Parser)]
#[command(
    name = "doppel",
    version,
    about = "Doppel: a personal chat persona that answers like you do"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the persona on every enabled channel.
    Start,
    /// Check configuration, provider keys, and memory.
    Status,
    /// Run one message through the full pipeline and print the planned reply.
    Ask {
        /// The message to send. Console prefixes (`!group`, `!mention`, `!owner`) apply.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let _guard = init_logging(&cfg, true)?;
            start(cfg).await?;
        }
        Commands::Status => {
            init_logging(&cfg, false)?;
            status(&cli.config, &cfg).await?;
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: doppel ask <message>");
            }
            init_logging(&cfg, false)?;
            ask(cfg, &message.join(" ")).await?;
        }
    }

    Ok(())
}

/// Stderr logging always; a daily-rolled file under `{data_dir}/logs` when asked.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop and must live as long as the process.
fn init_logging(cfg: &Config, to_file: bool) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.doppel.log_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = if to_file {
        let dir = PathBuf::from(config::shellexpand(&cfg.doppel.data_dir)).join("logs");
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::daily(&dir, "doppel.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    Ok(guard)
}

/// Wire the configured collaborators around one shared LLM provider.
fn build_collaborators(cfg: &Config) -> Collaborators {
    let provider: Arc<dyn Provider> = Arc::new(GeminiProvider::from_config(&cfg.provider.gemini));
    let speech = cfg
        .voice
        .enabled
        .then(|| Arc::new(GoogleTts::from_config(&cfg.voice)) as Arc<dyn Speech>);

    Collaborators {
        summarizer: Arc::new(LlmSummarizer::new(provider.clone())),
        search: Arc::new(WebSearch::from_config(&cfg.search)),
        youtube: Arc::new(YouTubeSearch::from_config(&cfg.youtube)),
        link: Arc::new(LinkPreview::new(Duration::from_secs(cfg.search.timeout_secs))),
        translator: Arc::new(LlmTranslator::new(provider.clone())),
        speech,
        provider,
    }
}

async fn build_gateway(
    cfg: Config,
    store: Store,
    channels: HashMap<String, Arc<dyn Channel>>,
) -> anyhow::Result<Gateway> {
    let rules = store.safety_rules().await?;
    let handlers = Handlers::new(
        build_collaborators(&cfg),
        store.clone(),
        cfg.persona.clone(),
        Duration::from_secs(cfg.provider.gemini.timeout_secs),
        Duration::from_secs(cfg.search.timeout_secs),
    );
    Ok(Gateway::new(cfg, handlers, store, channels).with_safety(SafetyFilter::with_rules(&rules)))
}

async fn start(cfg: Config) -> anyhow::Result<()> {
    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();

    if let Some(ref console) = cfg.channel.console {
        if console.enabled {
            let channel = ConsoleChannel::new(console, &cfg.persona.bot_id);
            channels.insert("console".to_string(), Arc::new(channel));
        }
    }

    if channels.is_empty() {
        anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
    }

    if cfg.provider.gemini.api_key.is_empty() {
        tracing::warn!("no Gemini API key configured; replies will come from canned fallbacks");
    }

    let store = Store::new(&cfg.memory).await?;

    println!("Doppel: starting as {}...", cfg.persona.name);
    let gw = build_gateway(cfg, store, channels).await?;
    Arc::new(gw).run().await
}

async fn status(path: &str, cfg: &Config) -> anyhow::Result<()> {
    let configured = |key: &str| if key.is_empty() { "missing key" } else { "configured" };

    println!("Doppel: status check\n");
    println!("Config: {path}");
    println!("Persona: {} (bot id {})", cfg.persona.name, cfg.persona.bot_id);
    println!();

    let gemini = GeminiProvider::from_config(&cfg.provider.gemini);
    println!(
        "  gemini ({}): {}",
        cfg.provider.gemini.model,
        if gemini.is_available().await {
            "available"
        } else {
            "unavailable"
        }
    );
    println!("  search: {}", configured(&cfg.search.api_key));
    println!("  youtube: {}", configured(&cfg.youtube.api_key));
    println!(
        "  voice: {}",
        if cfg.voice.enabled { "enabled" } else { "disabled" }
    );
    println!();

    match cfg.channel.console {
        Some(ref console) if console.enabled => {
            println!("  console: enabled (sender {})", console.sender_id)
        }
        Some(_) => println!("  console: disabled"),
        None => println!("  console: not configured"),
    }
    println!();

    let store = Store::new(&cfg.memory).await?;
    let since = chrono::Utc::now().timestamp_millis() - 86_400_000;
    let stats = store.stats(since).await?;
    println!("Memory: {}", config::shellexpand(&cfg.memory.db_path));
    println!("  contacts: {}", stats.contacts);
    println!("  turns: {} ({} in the last day)", stats.turns, stats.turns_today);
    println!("  size: {} KiB", stats.db_size / 1024);

    Ok(())
}

/// One-shot run against a throwaway in-memory store.
async fn ask(cfg: Config, message: &str) -> anyhow::Result<()> {
    let console_cfg = cfg.channel.console.clone().unwrap_or_default();
    let console = ConsoleChannel::new(&console_cfg, &cfg.persona.bot_id);
    let Some(env) = console.parse_line(message) else {
        anyhow::bail!("nothing to send");
    };

    let store = Store::in_memory(&cfg.memory).await?;
    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
    channels.insert("console".to_string(), Arc::new(console));

    let gw = build_gateway(cfg, store, channels)
        .await?
        .without_typing_delays();

    match gw.handle_envelope(env).await {
        Outcome::Replied {
            handler,
            plan,
            delivered,
        } => {
            println!();
            println!("handler: {handler}");
            for (i, part) in plan.parts.iter().enumerate() {
                println!("  part {i} after {}ms: {}", part.delay_ms, part.text);
            }
            if !delivered {
                println!("(delivery failed)");
            }
        }
        Outcome::Command(reply) | Outcome::Canned(reply) => println!("{reply}"),
        other => println!("no reply: {other:?}"),
    }

    Ok(())
}
