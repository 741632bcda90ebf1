use chrono::Utc;
use tracing::instrument;

use skein_core::ids::ThreadId;
use skein_core::message::{Message, MessageList};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Message lists stored as one JSON document per thread.
/// Replace-on-sync: the stored document always reflects the most
/// recent successful fetch in full.
pub struct MessageRepo {
    db: Database,
}

impl MessageRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the message list for a thread, if one has been synced.
    #[instrument(skip(self), fields(thread_id = %thread_id))]
    pub fn get(&self, thread_id: &ThreadId) -> Result<Option<MessageList>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT thread_id, channel_id, thread_ts, payload, last_fetched_at
                 FROM message_lists WHERE thread_id = ?1",
            )?;
            let mut rows = stmt.query([thread_id.as_str()])?;
            match rows.next()? {
                Some(row) => {
                    let payload: String = row_helpers::get(row, 3, "message_lists", "payload")?;
                    Ok(Some(MessageList {
                        thread_id: ThreadId::from_raw(row_helpers::get::<String>(
                            row,
                            0,
                            "message_lists",
                            "thread_id",
                        )?),
                        channel_id: row_helpers::get(row, 1, "message_lists", "channel_id")?,
                        thread_ts: row_helpers::get(row, 2, "message_lists", "thread_ts")?,
                        messages: row_helpers::parse_json(&payload, "message_lists", "payload")?,
                        last_fetched_at: row_helpers::get_opt(
                            row,
                            4,
                            "message_lists",
                            "last_fetched_at",
                        )?,
                    }))
                }
                None => Ok(None),
            }
        })
    }

    /// Replace a thread's message list wholesale, stamping
    /// `last_fetched_at`.
    #[instrument(skip(self, messages), fields(thread_id = %thread_id, count = messages.len()))]
    pub fn replace(
        &self,
        thread_id: &ThreadId,
        channel_id: &str,
        thread_ts: &str,
        messages: &[Message],
    ) -> Result<MessageList, StoreError> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(messages)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_lists (thread_id, channel_id, thread_ts, payload, last_fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(thread_id) DO UPDATE SET
                     channel_id = excluded.channel_id,
                     thread_ts = excluded.thread_ts,
                     payload = excluded.payload,
                     last_fetched_at = excluded.last_fetched_at",
                rusqlite::params![thread_id.as_str(), channel_id, thread_ts, payload, now],
            )?;
            Ok(())
        })?;

        Ok(MessageList {
            thread_id: thread_id.clone(),
            channel_id: channel_id.to_string(),
            thread_ts: thread_ts.to_string(),
            messages: messages.to_vec(),
            last_fetched_at: Some(now),
        })
    }

    /// Delete a thread's message list. Returns false when none existed.
    #[instrument(skip(self), fields(thread_id = %thread_id))]
    pub fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM message_lists WHERE thread_id = ?1",
                [thread_id.as_str()],
            )?;
            Ok(n > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threads::ThreadRepo;
    use skein_core::thread::ThreadCreate;

    fn setup() -> (MessageRepo, ThreadId) {
        let db = Database::in_memory().unwrap();
        let threads = ThreadRepo::new(db.clone());
        let t = threads
            .create(
                &ThreadCreate {
                    channel_id: "C123".into(),
                    thread_ts: "100.000".into(),
                    title: "t".into(),
                    tags: vec![],
                },
                "",
            )
            .unwrap();
        (MessageRepo::new(db), t.id)
    }

    fn msg(ts: &str, text: &str) -> Message {
        Message {
            ts: ts.into(),
            user: "U1".into(),
            user_name: None,
            text: text.into(),
            reactions: vec![],
            attachments: vec![],
        }
    }

    #[test]
    fn get_before_sync_is_none() {
        let (repo, id) = setup();
        assert!(repo.get(&id).unwrap().is_none());
    }

    #[test]
    fn replace_and_get() {
        let (repo, id) = setup();
        let stored = repo
            .replace(&id, "C123", "100.000", &[msg("100.000", "a"), msg("101.000", "b")])
            .unwrap();
        assert!(stored.last_fetched_at.is_some());

        let fetched = repo.get(&id).unwrap().unwrap();
        assert_eq!(fetched.messages.len(), 2);
        assert_eq!(fetched.messages[1].text, "b");
        assert_eq!(fetched.channel_id, "C123");
    }

    #[test]
    fn replace_is_full_not_merge() {
        let (repo, id) = setup();
        repo.replace(&id, "C123", "100.000", &[msg("100.000", "a"), msg("101.000", "b")])
            .unwrap();
        repo.replace(&id, "C123", "100.000", &[msg("100.000", "a (edited)")])
            .unwrap();

        let fetched = repo.get(&id).unwrap().unwrap();
        assert_eq!(fetched.messages.len(), 1);
        assert_eq!(fetched.messages[0].text, "a (edited)");
    }

    #[test]
    fn delete_message_list() {
        let (repo, id) = setup();
        repo.replace(&id, "C123", "100.000", &[msg("100.000", "a")]).unwrap();
        assert!(repo.delete(&id).unwrap());
        assert!(!repo.delete(&id).unwrap());
        assert!(repo.get(&id).unwrap().is_none());
    }
}
