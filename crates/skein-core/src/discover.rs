use serde::{Deserialize, Serialize};

/// Which configured condition surfaced a candidate thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Mention,
    Keyword,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mention => write!(f, "mention"),
            Self::Keyword => write!(f, "keyword"),
        }
    }
}

/// The trigger that fired for a discovered thread: kind plus the
/// configured value that matched (a user id or a keyword).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub value: String,
}

/// A candidate thread surfaced by discovery. Ephemeral — nothing is
/// persisted until the caller registers it, and `message_count` is a
/// nominal 1 until a sync runs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveredThread {
    pub channel_id: String,
    pub channel_name: String,
    pub thread_ts: String,
    pub first_message_text: String,
    pub first_message_user: String,
    pub created_at: String,
    pub message_count: u32,
    pub url: String,
    pub trigger: Trigger,
}

impl DiscoveredThread {
    pub fn dedup_key(&self) -> (String, String) {
        (self.channel_id.clone(), self.thread_ts.clone())
    }
}
