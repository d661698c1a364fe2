//! inspirebot setup wizard.
//!
//! Asks for the Slack bot token, the target channel and the bot's display
//! name, then writes `config.toml` and `.env` into the project root
//! (`INSPIREBOT_ROOT`, default the current directory). The token only goes
//! into `.env`, where the bot reads it as `BOT_TOKEN`.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use inspirebot::config::TOKEN_ENV;

// ── Formatting ─────────────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    channel: &'a str,
    bot_name: &'a str,
    reply_on_failure: bool,
}

/// TOML basic string with quotes and escapes.
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_owned()).to_string()
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let channel = quoted(p.channel);
    let bot_name = quoted(p.bot_name);
    let reply_on_failure = p.reply_on_failure;

    format!(
        r#"[slack]
# The bot token is read from {TOKEN_ENV} (see .env)
channel = {channel}
bot_name = {bot_name}
poll_interval_secs = 2
timeout_secs = 10

[sources]
quotes_url = "https://raw.githubusercontent.com/BolajiAyodeji/inspireNuggets/master/src/quotes.json"
jokes_url = "https://api.chucknorris.io/jokes/random"
timeout_secs = 10

[bot]
reply_on_failure = {reply_on_failure}
"#
    )
}

fn format_env(token: &str) -> String {
    format!("{TOKEN_ENV}={token}\n")
}

// ── Prompts ────────────────────────────────────────────────────────────────────

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_owned())
}

fn or_default(s: String, default: &str) -> String {
    if s.is_empty() {
        default.to_owned()
    } else {
        s
    }
}

fn confirm_overwrite(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let answer = read_line(&format!("{} exists, overwrite? [y/N]: ", path.display()))?;
    Ok(matches!(answer.as_str(), "y" | "Y" | "yes"))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if !confirm_overwrite(path)? {
        println!("   Skipped {}", path.display());
        return Ok(());
    }
    std::fs::write(path, content)
        .with_context(|| format!("Could not write {}", path.display()))?;
    println!("✓  {} saved", path.display());
    Ok(())
}

fn run(project_root: &Path) -> Result<()> {
    println!("=== inspirebot setup ===\n");

    let token = read_line("Slack bot token (xoxb-...): ")?;
    if token.is_empty() {
        anyhow::bail!("A bot token is required");
    }
    let channel = or_default(read_line("Channel [random]: ")?, "random");
    let bot_name = or_default(read_line("Bot name [inspire bot]: ")?, "inspire bot");
    let reply_on_failure = matches!(
        read_line("Post an apology when a fetch fails? [y/N]: ")?.as_str(),
        "y" | "Y" | "yes"
    );

    let config = format_config(&ConfigParams {
        channel: &channel,
        bot_name: &bot_name,
        reply_on_failure,
    });

    println!();
    write_file(&project_root.join("config.toml"), &config)?;
    write_file(&project_root.join(".env"), &format_env(&token))?;

    println!(
        "\n   Invite the bot to #{} and run it with:  cargo run",
        channel.trim_start_matches('#')
    );
    Ok(())
}

fn main() -> Result<()> {
    let project_root =
        PathBuf::from(std::env::var("INSPIREBOT_ROOT").unwrap_or_else(|_| ".".to_string()));
    run(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
