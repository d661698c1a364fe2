pub mod slack;

use anyhow::Result;
use async_trait::async_trait;

/// Event kind carried by ordinary user messages.
pub const MESSAGE_KIND: &str = "message";

/// A message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// The message text, including any bot mention
    pub text: String,
    /// "message" for plain messages; platform subtype otherwise (e.g. "channel_join")
    pub kind: String,
}

impl InboundMessage {
    pub fn is_ordinary(&self) -> bool {
        self.kind == MESSAGE_KIND
    }
}

/// Lifecycle events delivered by a transport to the bot controller.
#[derive(Debug, Clone)]
pub enum BotEvent {
    Start,
    Error(String),
    Message(InboundMessage),
}

/// A reply ready to be posted. Built per response and consumed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub channel: String,
    pub text: String,
    pub icon_emoji: String,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post `text` to `channel` with the given emoji code as the message icon.
    async fn post_message(&self, channel: &str, text: &str, icon_emoji: &str) -> Result<()>;
}
