use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SlackConfig;
use crate::platform::{BotEvent, ChatTransport, InboundMessage};

const PAGE_LIMIT: &str = "200";

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    user_id: String,
    #[serde(default)]
    bot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct ConversationsListResponse {
    #[serde(default)]
    channels: Vec<Channel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<SlackMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

/// One entry of `conversations.history`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackMessage {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    pub ts: String,
}

impl SlackMessage {
    fn is_from_bot(&self, own_user_id: &str) -> bool {
        self.bot_id.is_some() || self.user.as_deref() == Some(own_user_id)
    }

    fn into_inbound(self) -> InboundMessage {
        InboundMessage {
            text: self.text.unwrap_or_default(),
            kind: self.subtype.unwrap_or(self.event_type),
        }
    }
}

/// New channel messages since a cursor, oldest first.
#[derive(Debug, Default)]
pub struct HistoryBatch {
    pub messages: Vec<InboundMessage>,
    /// Newest timestamp seen, including skipped bot posts
    pub latest_ts: Option<String>,
}

/// Parse a Slack `ts` ("1700000000.000100") into an orderable pair.
fn parse_ts(ts: &str) -> Option<(u64, u64)> {
    let (secs, micros) = ts.split_once('.').unwrap_or((ts, "0"));
    Some((secs.parse().ok()?, micros.parse().ok()?))
}

fn now_ts() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Slack Web API transport bound to a single channel.
pub struct SlackTransport {
    client: reqwest::Client,
    api_base_url: String,
    token: String,
    bot_name: String,
    bot_user_id: String,
    channel_id: String,
    poll_interval: Duration,
}

impl SlackTransport {
    /// Authenticate and resolve the configured channel.
    pub async fn connect(config: &SlackConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for Slack")?;

        let mut transport = Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            bot_name: config.bot_name.clone(),
            bot_user_id: String::new(),
            channel_id: String::new(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        };

        let auth: AuthTestResponse = transport
            .post("auth.test", &json!({}))
            .await
            .context("Slack authentication failed")?;
        info!(
            "Authenticated with Slack as user {} (bot {})",
            auth.user_id,
            auth.bot_id.as_deref().unwrap_or("-")
        );
        transport.bot_user_id = auth.user_id;

        transport.channel_id = transport.resolve_channel(&config.channel).await?;
        info!(
            "Target channel '{}' resolved to {}",
            config.channel, transport.channel_id
        );

        Ok(transport)
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base_url, method)
    }

    async fn get<T: DeserializeOwned>(&self, method: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(self.url(method))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send Slack {} request", method))?;
        Self::parse_response(method, response).await
    }

    async fn post<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let response = self
            .client
            .post(self.url(method))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send Slack {} request", method))?;
        Self::parse_response(method, response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Slack {} returned {}: {}", method, status, body);
        }

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Slack {} response", method))?;

        if body["ok"].as_bool() != Some(true) {
            anyhow::bail!(
                "Slack {} error: {}",
                method,
                body["error"].as_str().unwrap_or("unknown")
            );
        }

        serde_json::from_value(body)
            .with_context(|| format!("Unexpected Slack {} response shape", method))
    }

    /// Find the channel id for a name ("random", "#random") or accept a raw id.
    async fn resolve_channel(&self, channel: &str) -> Result<String> {
        let wanted = channel.trim_start_matches('#');
        let mut cursor = String::new();

        loop {
            let page: ConversationsListResponse = {
                let mut query = vec![
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", PAGE_LIMIT),
                ];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor.as_str()));
                }
                self.get("conversations.list", &query).await?
            };

            if let Some(found) = page
                .channels
                .iter()
                .find(|c| c.name == wanted || c.id == wanted)
            {
                return Ok(found.id.clone());
            }

            if page.response_metadata.next_cursor.is_empty() {
                break;
            }
            cursor = page.response_metadata.next_cursor;
        }

        anyhow::bail!(
            "Channel '{}' not found or the bot cannot see it (invite the bot first)",
            channel
        )
    }

    /// Fetch messages newer than `oldest` from the target channel.
    /// Posts made by bots, including this one, are dropped.
    pub async fn fetch_new_messages(&self, oldest: &str) -> Result<HistoryBatch> {
        let mut raw: Vec<SlackMessage> = Vec::new();
        let mut cursor = String::new();

        loop {
            let page: HistoryResponse = {
                let mut query = vec![
                    ("channel", self.channel_id.as_str()),
                    ("oldest", oldest),
                    ("limit", PAGE_LIMIT),
                ];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor.as_str()));
                }
                self.get("conversations.history", &query).await?
            };
            raw.extend(page.messages);

            if !page.has_more || page.response_metadata.next_cursor.is_empty() {
                break;
            }
            cursor = page.response_metadata.next_cursor;
        }

        raw.retain(|m| parse_ts(&m.ts).is_some());
        raw.sort_by_key(|m| parse_ts(&m.ts));

        let latest_ts = raw.last().map(|m| m.ts.clone());
        let messages = raw
            .into_iter()
            .filter(|m| !m.is_from_bot(&self.bot_user_id))
            .map(SlackMessage::into_inbound)
            .collect();

        Ok(HistoryBatch {
            messages,
            latest_ts,
        })
    }

    /// Emit `Start`, then poll the channel and forward new messages until the
    /// receiver is dropped. Poll failures are reported as `Error` events.
    pub async fn listen(&self, events: mpsc::Sender<BotEvent>) {
        if events.send(BotEvent::Start).await.is_err() {
            return;
        }

        let mut oldest = now_ts();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if events.is_closed() {
                break;
            }

            let event_batch: Vec<BotEvent> = match self.fetch_new_messages(&oldest).await {
                Ok(batch) => {
                    if let Some(latest) = batch.latest_ts {
                        oldest = latest;
                    }
                    batch.messages.into_iter().map(BotEvent::Message).collect()
                }
                Err(e) => {
                    warn!("Slack poll failed: {:#}", e);
                    vec![BotEvent::Error(format!("{:#}", e))]
                }
            };

            for event in event_batch {
                if events.send(event).await.is_err() {
                    debug!("Event receiver closed, stopping Slack listener");
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ChatTransport for SlackTransport {
    async fn post_message(&self, channel: &str, text: &str, icon_emoji: &str) -> Result<()> {
        let body = json!({
            "channel": channel,
            "text": text,
            "username": self.bot_name,
            "icon_emoji": icon_emoji,
        });

        let posted: Value = self.post("chat.postMessage", &body).await?;
        debug!(
            "Posted message to Slack channel {}: ts={}",
            channel,
            posted["ts"].as_str().unwrap_or_default()
        );
        Ok(())
    }
}
