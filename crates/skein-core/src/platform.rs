use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PlatformError;
use crate::message::Message;

/// One search hit from the platform's message search.
///
/// `thread_ts` is the parent thread's timestamp when the hit is a
/// reply; for a parent message it is absent and `ts` identifies the
/// thread itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchMatch {
    pub channel_id: String,
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
}

impl SearchMatch {
    /// The timestamp anchoring the thread this match belongs to.
    pub fn anchor_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// The messaging platform, as consumed by this core.
///
/// The platform is the source of truth for a thread's message content:
/// `fetch_thread_messages` returns the complete current set, ordered by
/// `ts`, and callers replace rather than merge.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn fetch_thread_messages(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<Message>, PlatformError>;

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchMatch>, PlatformError>;
}
