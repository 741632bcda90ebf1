use serde::{Deserialize, Serialize};

use crate::ids::ThreadId;

/// Summary fingerprint fields carried on the thread record so list
/// views need no join against the summary store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryState {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub generated_at: Option<String>,
}

/// A tracked conversation anchored to a channel and a source timestamp.
///
/// `(channel_id, thread_ts)` is unique across all threads — the dedup
/// key for the whole system.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub channel_id: String,
    pub thread_ts: String,
    pub title: String,
    pub url: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_message_ts: Option<String>,
    pub message_count: u32,
    pub new_message_count: u32,
    pub is_read: bool,
    pub is_archived: bool,
    pub summary: SummaryState,
}

impl Thread {
    /// The watermark for new-message deltas: the last observed message
    /// timestamp, falling back to the thread's own anchor timestamp.
    pub fn watermark(&self) -> &str {
        self.last_message_ts.as_deref().unwrap_or(&self.thread_ts)
    }

    /// The dedup key identifying this thread across discovery and
    /// registration.
    pub fn dedup_key(&self) -> (String, String) {
        (self.channel_id.clone(), self.thread_ts.clone())
    }
}

/// Fields required to register a new thread.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadCreate {
    pub channel_id: String,
    pub thread_ts: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ThreadUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_read: Option<bool>,
    #[serde(default)]
    pub is_archived: Option<bool>,
}

/// Build the platform permalink for a thread.
pub fn permalink(workspace: &str, channel_id: &str, thread_ts: &str) -> String {
    let compact_ts = thread_ts.replace('.', "");
    if workspace.is_empty() {
        format!("https://slack.com/archives/{channel_id}/p{compact_ts}")
    } else {
        format!("https://{workspace}.slack.com/archives/{channel_id}/p{compact_ts}")
    }
}

/// Normalize a tag set: trimmed, deduplicated, sorted.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread() -> Thread {
        Thread {
            id: ThreadId::from_raw("thr_abc"),
            channel_id: "C123".into(),
            thread_ts: "1712000000.000100".into(),
            title: "deploy incident".into(),
            url: String::new(),
            tags: vec![],
            created_at: "2026-08-06T00:00:00Z".into(),
            updated_at: "2026-08-06T00:00:00Z".into(),
            last_message_ts: None,
            message_count: 0,
            new_message_count: 0,
            is_read: true,
            is_archived: false,
            summary: SummaryState::default(),
        }
    }

    #[test]
    fn watermark_falls_back_to_thread_ts() {
        let mut t = thread();
        assert_eq!(t.watermark(), "1712000000.000100");
        t.last_message_ts = Some("1712000005.000000".into());
        assert_eq!(t.watermark(), "1712000005.000000");
    }

    #[test]
    fn permalink_strips_timestamp_dot() {
        assert_eq!(
            permalink("acme", "C123", "1712000000.000100"),
            "https://acme.slack.com/archives/C123/p1712000000000100"
        );
        assert_eq!(
            permalink("", "C123", "1712000000.000100"),
            "https://slack.com/archives/C123/p1712000000000100"
        );
    }

    #[test]
    fn normalize_tags_dedupes_and_sorts() {
        let tags = vec![
            "infra".to_string(),
            " deploy ".to_string(),
            "infra".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["deploy", "infra"]);
    }

    #[test]
    fn thread_serde_roundtrip() {
        let t = thread();
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Thread = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, t.id);
        assert_eq!(parsed.dedup_key(), t.dedup_key());
    }
}
