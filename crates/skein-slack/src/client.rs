use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use skein_core::errors::PlatformError;
use skein_core::message::{AttachmentRef, Message, Reaction};
use skein_core::platform::{ChatPlatform, SearchMatch};

const API_BASE: &str = "https://slack.com/api";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REPLIES_LIMIT: u32 = 1000;

/// Slack API client (xoxc token + cookie auth).
pub struct SlackClient {
    client: Client,
    token: SecretString,
    cookie: SecretString,
}

impl SlackClient {
    pub fn new(token: SecretString, cookie: SecretString) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            token,
            cookie,
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        let url = format!("{API_BASE}/{endpoint}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .header("Cookie", format!("d={}", self.cookie.expose_secret()))
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PlatformError::Timeout(REQUEST_TIMEOUT)
                } else {
                    PlatformError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::from_status(status.as_u16(), body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    #[instrument(skip(self), fields(channel_id, thread_ts))]
    async fn fetch_thread_messages(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<Message>, PlatformError> {
        let limit = REPLIES_LIMIT.to_string();
        let envelope: RepliesEnvelope = self
            .call(
                "conversations.replies",
                &[
                    ("channel", channel_id),
                    ("ts", thread_ts),
                    ("limit", &limit),
                ],
            )
            .await?;

        if !envelope.ok {
            return Err(PlatformError::Api(
                envelope.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }

        Ok(envelope
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(WireMessage::into_message)
            .collect())
    }

    #[instrument(skip(self, query), fields(limit))]
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchMatch>, PlatformError> {
        let count = limit.to_string();
        let envelope: SearchEnvelope = self
            .call("search.messages", &[("query", query), ("count", &count)])
            .await?;

        if !envelope.ok {
            return Err(PlatformError::Api(
                envelope.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }

        Ok(envelope
            .messages
            .map(|m| m.matches)
            .unwrap_or_default()
            .into_iter()
            .map(WireMatch::into_match)
            .collect())
    }
}

// Wire types for the Slack response envelopes. Only the fields this
// core consumes are modeled; everything else is ignored.

#[derive(Debug, Deserialize)]
struct RepliesEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<Vec<WireMessage>>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    ts: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    reactions: Vec<WireReaction>,
    #[serde(default)]
    files: Vec<WireFile>,
}

#[derive(Debug, Deserialize)]
struct WireReaction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    count: u32,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url_private: Option<String>,
}

impl WireMessage {
    fn into_message(self) -> Message {
        Message {
            ts: self.ts,
            user: self.user,
            user_name: self.user_name,
            text: self.text,
            reactions: self
                .reactions
                .into_iter()
                .map(|r| Reaction {
                    name: r.name,
                    count: r.count,
                })
                .collect(),
            attachments: self
                .files
                .into_iter()
                .map(|f| AttachmentRef {
                    id: f.id,
                    name: f.name,
                    url: f.url_private,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Option<SearchMatches>,
}

#[derive(Debug, Deserialize)]
struct SearchMatches {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    #[serde(default)]
    channel: Option<WireChannel>,
    #[serde(default)]
    ts: String,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    #[serde(default)]
    id: String,
}

impl WireMatch {
    fn into_match(self) -> SearchMatch {
        SearchMatch {
            channel_id: self.channel.map(|c| c.id).unwrap_or_default(),
            ts: self.ts,
            thread_ts: self.thread_ts,
            user: self.user,
            text: self.text,
        }
    }
}
