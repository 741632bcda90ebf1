use serde::{Deserialize, Serialize};

use crate::ids::ThreadId;

/// One day of activity within a thread.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummaryItem {
    /// YYYY-MM-DD.
    pub date: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// One discussed topic within a thread.
///
/// `status` is free text from the generation capability ("in progress",
/// "resolved", ...); it is untrusted and not an enum on purpose.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummaryItem {
    pub topic_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Derived summary of a thread, owned 1:1 by the thread.
///
/// `message_count_at_summary` is the staleness fingerprint: the summary
/// is fresh iff it equals the thread's current message count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: ThreadId,
    pub topic: String,
    pub overview: String,
    #[serde(default)]
    pub daily_summaries: Vec<DailySummaryItem>,
    #[serde(default)]
    pub topic_summaries: Vec<TopicSummaryItem>,
    pub last_updated: String,
    pub message_count_at_summary: u32,
}

impl ThreadSummary {
    /// Whether this summary still reflects a thread with the given
    /// message count.
    pub fn is_fresh(&self, current_message_count: u32) -> bool {
        self.message_count_at_summary == current_message_count
    }
}
