use serde::{Deserialize, Serialize};

use crate::ids::ThreadId;

/// An emoji reaction tally on a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    pub count: u32,
}

/// A file or link attached to a message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One message in a thread. Immutable once fetched, except that
/// `user_name` may be filled in later from user-info enrichment.
///
/// `ts` is the platform's native ordering key and is compared as a
/// string throughout — never as wall-clock time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub ts: String,
    pub user: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

impl Message {
    /// Display name for transcripts: enriched name when present, raw
    /// user id otherwise.
    pub fn display_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.user)
    }
}

/// The full message content of one thread, ordered by `ts`.
/// Always reflects the most recent successful fetch in full.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageList {
    pub thread_id: ThreadId,
    pub channel_id: String,
    pub thread_ts: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub last_fetched_at: Option<String>,
}
