use anyhow::{Context, Result};
use rand::Rng;

use crate::platform::OutboundReply;
use crate::sources::{Joke, JokeSource, Quote, QuoteSource};

/// Slack emoji code prefixed to every fetched reply.
const LIGHTNING: &str = ":zap:";

/// Per-response icon pictograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Robot,
    Technologist,
    Smile,
    Question,
    Warning,
}

impl Icon {
    pub fn emoji(&self) -> &'static str {
        match self {
            Icon::Robot => ":robot_face:",
            Icon::Technologist => ":male-technologist:",
            Icon::Smile => ":smile:",
            Icon::Question => ":question:",
            Icon::Warning => ":warning:",
        }
    }
}

fn reply(channel: &str, text: String, icon: Icon) -> OutboundReply {
    OutboundReply {
        channel: channel.to_string(),
        text,
        icon_emoji: icon.emoji().to_string(),
    }
}

/// Uniform index in `[0, len)`, or `None` for an empty collection.
pub fn pick_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(rng.gen_range(0..len))
}

pub fn format_quote(quote: &Quote) -> String {
    format!("{} {} - *{}*", LIGHTNING, quote.text, quote.author)
}

pub fn format_joke(joke: &Joke) -> String {
    format!("{} {}", LIGHTNING, joke.text)
}

/// Reply with one quote drawn uniformly from `quotes`.
pub fn choose_quote<R: Rng + ?Sized>(
    quotes: &[Quote],
    channel: &str,
    rng: &mut R,
) -> Result<OutboundReply> {
    let index = pick_index(quotes.len(), rng).context("No quotes to choose from")?;
    Ok(reply(channel, format_quote(&quotes[index]), Icon::Technologist))
}

/// Fetch the quote collection and reply with one quote chosen at random.
pub async fn inspire_me(source: &dyn QuoteSource, channel: &str) -> Result<OutboundReply> {
    let quotes = source.fetch_quotes().await?;
    choose_quote(&quotes, channel, &mut rand::thread_rng())
}

pub async fn random_joke(source: &dyn JokeSource, channel: &str) -> Result<OutboundReply> {
    let joke = source.fetch_joke().await?;
    Ok(reply(channel, format_joke(&joke), Icon::Smile))
}

pub fn help_text(bot_name: &str) -> String {
    format!(
        "Type *@{}* with *inspire me* to get an inspiring techie quote, \
         *random joke* to get a Chuck Norris random joke \
         and *help* to get this instruction again",
        bot_name
    )
}

pub fn help(channel: &str, bot_name: &str) -> OutboundReply {
    reply(channel, help_text(bot_name), Icon::Question)
}

/// Posted once when the transport reports it is connected.
pub fn welcome(channel: &str, bot_name: &str) -> OutboundReply {
    let handle = bot_name.replace(' ', "_");
    reply(
        channel,
        format!("Get inspired while working with @{}", handle),
        Icon::Robot,
    )
}

/// User-visible notice for a failed fetch, used when replies on failure are enabled.
pub fn failure(channel: &str) -> OutboundReply {
    reply(
        channel,
        "Sorry, something went wrong while fetching that. Please try again later.".to_string(),
        Icon::Warning,
    )
}
