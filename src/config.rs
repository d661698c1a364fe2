use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the Slack bot token.
pub const TOKEN_ENV: &str = "BOT_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlackConfig {
    /// Usually supplied through BOT_TOKEN rather than the file
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Per-request timeout for Slack API calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    #[serde(default = "default_quotes_url")]
    pub quotes_url: String,
    #[serde(default = "default_jokes_url")]
    pub jokes_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BotConfig {
    /// Post a short apology when a remote fetch fails instead of staying silent
    #[serde(default)]
    pub reply_on_failure: bool,
}

fn default_channel() -> String {
    "random".to_string()
}

fn default_bot_name() -> String {
    "inspire bot".to_string()
}

fn default_api_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_quotes_url() -> String {
    "https://raw.githubusercontent.com/BolajiAyodeji/inspireNuggets/master/src/quotes.json"
        .to_string()
}

fn default_jokes_url() -> String {
    "https://api.chucknorris.io/jokes/random".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel: default_channel(),
            bot_name: default_bot_name(),
            api_base_url: default_api_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            quotes_url: default_quotes_url(),
            jokes_url: default_jokes_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load the TOML file at `path` (or defaults when `path` is None), apply the
    /// BOT_TOKEN environment override and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let content = match path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            None => String::new(),
        };

        Self::from_toml(&content, std::env::var(TOKEN_ENV).ok())
    }

    /// Parse `content` and apply a token override. A non-blank override wins
    /// over `slack.bot_token` from the file.
    pub fn from_toml(content: &str, token_override: Option<String>) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).context("Failed to parse config file")?;

        if let Some(token) = token_override.filter(|t| !t.trim().is_empty()) {
            config.slack.bot_token = token;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.slack.bot_token.trim().is_empty() {
            anyhow::bail!(
                "Slack bot token is missing: set {} in the environment or .env, \
                 or slack.bot_token in the config file",
                TOKEN_ENV
            );
        }
        if self.slack.channel.trim_start_matches('#').trim().is_empty() {
            anyhow::bail!("slack.channel must not be empty");
        }
        if self.slack.poll_interval_secs == 0 {
            anyhow::bail!("slack.poll_interval_secs must be at least 1");
        }
        if self.slack.timeout_secs == 0 {
            anyhow::bail!("slack.timeout_secs must be at least 1");
        }
        if self.sources.timeout_secs == 0 {
            anyhow::bail!("sources.timeout_secs must be at least 1");
        }
        Ok(())
    }
}
