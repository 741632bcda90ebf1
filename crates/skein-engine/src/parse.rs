//! Tolerant parsing of generation-capability output. The capability
//! returns untrusted free text that *usually* contains the JSON we
//! asked for, often inside a fenced code block. Every parser here
//! degrades to a minimal result instead of failing the operation.

use serde::Deserialize;
use tracing::warn;

use skein_core::summary::{DailySummaryItem, TopicSummaryItem};

const FALLBACK_TOPIC: &str = "Discussion";
const FALLBACK_TOPIC_NAME: &str = "General discussion";
const FALLBACK_STATUS: &str = "in progress";

/// Strip a surrounding markdown code fence, if any, and return the
/// candidate JSON payload.
pub fn extract_fenced(text: &str) -> &str {
    if let Some(rest) = text.split("```json").nth(1) {
        rest.split("```").next().unwrap_or("").trim()
    } else if let Some(inner) = text.split("```").nth(1) {
        inner.trim()
    } else {
        text.trim()
    }
}

#[derive(Debug, Default, Deserialize)]
struct OverviewPayload {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    overview: String,
}

/// Parse the overview pass into `(topic, overview)`.
pub fn parse_overview(raw: &str) -> (String, String) {
    match serde_json::from_str::<OverviewPayload>(extract_fenced(raw)) {
        Ok(payload) => {
            let topic = if payload.topic.trim().is_empty() {
                FALLBACK_TOPIC.to_string()
            } else {
                payload.topic.trim().to_string()
            };
            (topic, payload.overview.trim().to_string())
        }
        Err(e) => {
            warn!(error = %e, "overview output was not valid JSON; using raw text");
            (FALLBACK_TOPIC.to_string(), truncate_chars(raw.trim(), 100))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TopicPayload {
    #[serde(default)]
    topic_name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    conclusion: Option<String>,
    #[serde(default)]
    participants: Vec<String>,
}

/// Parse the per-topic pass. Malformed output collapses to a single
/// catch-all topic carrying the raw text.
pub fn parse_topics(raw: &str) -> Vec<TopicSummaryItem> {
    match serde_json::from_str::<Vec<TopicPayload>>(extract_fenced(raw)) {
        Ok(payloads) => payloads
            .into_iter()
            .map(|p| TopicSummaryItem {
                topic_name: if p.topic_name.trim().is_empty() {
                    FALLBACK_TOPIC_NAME.to_string()
                } else {
                    p.topic_name.trim().to_string()
                },
                status: if p.status.trim().is_empty() {
                    FALLBACK_STATUS.to_string()
                } else {
                    p.status.trim().to_string()
                },
                summary: p.summary,
                conclusion: p.conclusion,
                participants: p.participants,
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "topic output was not valid JSON; using single fallback topic");
            vec![TopicSummaryItem {
                topic_name: FALLBACK_TOPIC_NAME.to_string(),
                status: FALLBACK_STATUS.to_string(),
                summary: truncate_chars(raw.trim(), 200),
                conclusion: None,
                participants: vec![],
            }]
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DailyPayload {
    #[serde(default)]
    date: String,
    #[serde(default)]
    message_count: u32,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    participants: Vec<String>,
}

/// Parse the per-day pass. Malformed output yields zero days.
pub fn parse_daily(raw: &str) -> Vec<DailySummaryItem> {
    match serde_json::from_str::<Vec<DailyPayload>>(extract_fenced(raw)) {
        Ok(payloads) => payloads
            .into_iter()
            .map(|p| DailySummaryItem {
                date: p.date,
                message_count: p.message_count,
                summary: p.summary,
                key_points: p.key_points,
                participants: p.participants,
            })
            .collect(),
        Err(e) => {
            warn!(error = %e, "daily output was not valid JSON; skipping daily breakdown");
            vec![]
        }
    }
}

/// Truncate on a char boundary.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
