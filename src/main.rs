use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inspirebot::bot::Bot;
use inspirebot::config::Config;
use inspirebot::platform::slack::SlackTransport;
use inspirebot::sources::RemoteSources;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,inspirebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An explicit path must exist; the default one is optional
    let config_path = match std::env::args().nth(1) {
        Some(arg) => Some(PathBuf::from(arg)),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            default.exists().then_some(default)
        }
    };

    match &config_path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("No {} found, using defaults", DEFAULT_CONFIG_PATH),
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Channel: {}", config.slack.channel);
    info!("  Bot name: {}", config.slack.bot_name);
    info!("  Quotes: {}", config.sources.quotes_url);
    info!("  Jokes: {}", config.sources.jokes_url);

    let sources = Arc::new(RemoteSources::new(&config.sources)?);

    let transport = Arc::new(
        SlackTransport::connect(&config.slack)
            .await
            .context("Failed to connect to Slack")?,
    );

    let bot = Arc::new(Bot::new(
        transport.clone(),
        sources.clone(),
        sources,
        transport.channel_id(),
        config.slack.bot_name.clone(),
        &config.bot,
    ));

    let (tx, rx) = mpsc::channel(64);
    let listener = tokio::spawn({
        let transport = transport.clone();
        async move { transport.listen(tx).await }
    });

    info!("Bot is starting...");
    tokio::select! {
        _ = bot.run(rx) => warn!("Slack listener stopped"),
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
        }
    }

    listener.abort();
    Ok(())
}
