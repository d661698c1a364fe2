use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::commands::Command;
use crate::config::BotConfig;
use crate::platform::{BotEvent, ChatTransport, InboundMessage, OutboundReply};
use crate::responses;
use crate::sources::{JokeSource, QuoteSource};

/// Bot controller: turns transport events into replies on the target channel.
pub struct Bot {
    transport: Arc<dyn ChatTransport>,
    quotes: Arc<dyn QuoteSource>,
    jokes: Arc<dyn JokeSource>,
    channel: String,
    bot_name: String,
    reply_on_failure: bool,
}

impl Bot {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        quotes: Arc<dyn QuoteSource>,
        jokes: Arc<dyn JokeSource>,
        channel: impl Into<String>,
        bot_name: impl Into<String>,
        config: &BotConfig,
    ) -> Self {
        Self {
            transport,
            quotes,
            jokes,
            channel: channel.into(),
            bot_name: bot_name.into(),
            reply_on_failure: config.reply_on_failure,
        }
    }

    /// Handle events until the sender side closes. Each event runs in its own
    /// task, so replies may be posted in any order.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<BotEvent>) {
        info!("Bot is listening on channel {}", self.channel);

        while let Some(event) = events.recv().await {
            let bot = Arc::clone(&self);
            tokio::spawn(async move {
                bot.handle_event(event).await;
            });
        }

        info!("Event stream closed");
    }

    pub async fn handle_event(&self, event: BotEvent) {
        match event {
            BotEvent::Start => {
                info!("Transport connected, posting welcome message");
                self.post(&responses::welcome(&self.channel, &self.bot_name))
                    .await;
            }
            BotEvent::Error(e) => {
                error!("Transport error: {}", e);
            }
            BotEvent::Message(message) => self.handle_message(&message).await,
        }
    }

    async fn handle_message(&self, message: &InboundMessage) {
        if !message.is_ordinary() {
            return;
        }

        let command = Command::recognize(&message.text);
        if command == Command::None {
            debug!("No command in message: {}", message.text);
            return;
        }

        info!("Command '{}' received", command.name());

        let reply = match command {
            Command::InspireMe => responses::inspire_me(self.quotes.as_ref(), &self.channel).await,
            Command::RandomJoke => responses::random_joke(self.jokes.as_ref(), &self.channel).await,
            Command::Help => Ok(responses::help(&self.channel, &self.bot_name)),
            Command::None => return,
        };

        match reply {
            Ok(reply) => self.post(&reply).await,
            Err(e) => {
                error!("Failed to build '{}' reply: {:#}", command.name(), e);
                if self.reply_on_failure {
                    self.post(&responses::failure(&self.channel)).await;
                }
            }
        }
    }

    async fn post(&self, reply: &OutboundReply) {
        if let Err(e) = self
            .transport
            .post_message(&reply.channel, &reply.text, &reply.icon_emoji)
            .await
        {
            error!("Failed to post message to {}: {:#}", reply.channel, e);
        }
    }
}
