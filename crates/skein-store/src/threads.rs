use chrono::Utc;
use tracing::instrument;

use skein_core::ids::ThreadId;
use skein_core::thread::{normalize_tags, SummaryState, Thread, ThreadCreate, ThreadUpdate};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const THREAD_COLUMNS: &str = "id, channel_id, thread_ts, title, url, tags, created_at, updated_at, \
     last_message_ts, message_count, new_message_count, is_read, is_archived, \
     summary_topic, summary_generated_at";

pub struct ThreadRepo {
    db: Database,
}

impl ThreadRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a new thread. The `(channel_id, thread_ts)` UNIQUE
    /// constraint is the authoritative dedup guard: a second create for
    /// the same source returns `Conflict`.
    #[instrument(skip(self, req), fields(channel_id = %req.channel_id, thread_ts = %req.thread_ts))]
    pub fn create(&self, req: &ThreadCreate, url: &str) -> Result<Thread, StoreError> {
        let id = ThreadId::new();
        let now = Utc::now().to_rfc3339();
        let tags = normalize_tags(&req.tags);
        let tags_json = serde_json::to_string(&tags)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO threads (id, channel_id, thread_ts, title, url, tags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id.as_str(),
                    req.channel_id,
                    req.thread_ts,
                    req.title,
                    url,
                    tags_json,
                    now,
                    now,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    StoreError::Conflict(format!(
                        "thread already registered: {}/{}",
                        req.channel_id, req.thread_ts
                    ))
                }
                other => StoreError::Database(other.to_string()),
            })?;

            Ok(Thread {
                id: id.clone(),
                channel_id: req.channel_id.clone(),
                thread_ts: req.thread_ts.clone(),
                title: req.title.clone(),
                url: url.to_string(),
                tags,
                created_at: now.clone(),
                updated_at: now,
                last_message_ts: None,
                message_count: 0,
                new_message_count: 0,
                is_read: true,
                is_archived: false,
                summary: SummaryState::default(),
            })
        })
    }

    /// Get a thread by ID.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub fn get(&self, id: &ThreadId) -> Result<Thread, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"
            ))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_thread(row),
                None => Err(StoreError::NotFound(format!("thread {id}"))),
            }
        })
    }

    /// Look up a thread by its dedup key.
    #[instrument(skip(self))]
    pub fn find_by_source(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Option<Thread>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads WHERE channel_id = ?1 AND thread_ts = ?2"
            ))?;
            let mut rows = stmt.query([channel_id, thread_ts])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_thread(row)?)),
                None => Ok(None),
            }
        })
    }

    /// All threads in registration order.
    pub fn list_all(&self) -> Result<Vec<Thread>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads ORDER BY id"
            ))?;
            let mut rows = stmt.query([])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_thread(row)?);
            }
            Ok(results)
        })
    }

    /// Apply a partial update; `None` fields are left untouched.
    #[instrument(skip(self, update), fields(thread_id = %id))]
    pub fn update(&self, id: &ThreadId, update: &ThreadUpdate) -> Result<Thread, StoreError> {
        let mut thread = self.get(id)?;

        if let Some(title) = &update.title {
            thread.title = title.clone();
        }
        if let Some(tags) = &update.tags {
            thread.tags = normalize_tags(tags);
        }
        if let Some(is_read) = update.is_read {
            thread.is_read = is_read;
        }
        if let Some(is_archived) = update.is_archived {
            thread.is_archived = is_archived;
        }
        thread.updated_at = Utc::now().to_rfc3339();

        let tags_json = serde_json::to_string(&thread.tags)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE threads SET title = ?1, tags = ?2, is_read = ?3, is_archived = ?4, updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    thread.title,
                    tags_json,
                    thread.is_read,
                    thread.is_archived,
                    thread.updated_at,
                    id.as_str(),
                ],
            )?;
            Ok(())
        })?;
        Ok(thread)
    }

    /// Delete a thread record. Returns false when the id was unknown.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub fn delete(&self, id: &ThreadId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute("DELETE FROM threads WHERE id = ?1", [id.as_str()])?;
            Ok(n > 0)
        })
    }

    /// Mark a thread read and reset its unread counter.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub fn mark_read(&self, id: &ThreadId) -> Result<Thread, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE threads SET is_read = 1, new_message_count = 0, updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, id.as_str()],
            )?;
            if n == 0 {
                return Err(StoreError::NotFound(format!("thread {id}")));
            }
            Ok(())
        })?;
        self.get(id)
    }

    /// Update message statistics after a sync.
    ///
    /// `last_message_ts = None` leaves the stored watermark unchanged
    /// (an empty fetch must not regress it). A positive unread count
    /// clears `is_read`.
    #[instrument(skip(self), fields(thread_id = %id, message_count, new_message_count))]
    pub fn update_message_stats(
        &self,
        id: &ThreadId,
        message_count: u32,
        new_message_count: u32,
        last_message_ts: Option<&str>,
    ) -> Result<Thread, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let n = match last_message_ts {
                Some(ts) => conn.execute(
                    "UPDATE threads SET message_count = ?1, new_message_count = ?2,
                            last_message_ts = ?3,
                            is_read = CASE WHEN ?2 > 0 THEN 0 ELSE is_read END,
                            updated_at = ?4
                     WHERE id = ?5",
                    rusqlite::params![message_count, new_message_count, ts, now, id.as_str()],
                )?,
                None => conn.execute(
                    "UPDATE threads SET message_count = ?1, new_message_count = ?2,
                            is_read = CASE WHEN ?2 > 0 THEN 0 ELSE is_read END,
                            updated_at = ?3
                     WHERE id = ?4",
                    rusqlite::params![message_count, new_message_count, now, id.as_str()],
                )?,
            };
            if n == 0 {
                return Err(StoreError::NotFound(format!("thread {id}")));
            }
            Ok(())
        })?;
        self.get(id)
    }

    /// Propagate a freshly generated summary topic onto the thread.
    #[instrument(skip(self, topic), fields(thread_id = %id))]
    pub fn set_summary_topic(&self, id: &ThreadId, topic: &str) -> Result<Thread, StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE threads SET summary_topic = ?1, summary_generated_at = ?2, updated_at = ?2
                 WHERE id = ?3",
                rusqlite::params![topic, now, id.as_str()],
            )?;
            if n == 0 {
                return Err(StoreError::NotFound(format!("thread {id}")));
            }
            Ok(())
        })?;
        self.get(id)
    }
}

fn row_to_thread(row: &rusqlite::Row<'_>) -> Result<Thread, StoreError> {
    let tags_raw: String = row_helpers::get(row, 5, "threads", "tags")?;

    Ok(Thread {
        id: ThreadId::from_raw(row_helpers::get::<String>(row, 0, "threads", "id")?),
        channel_id: row_helpers::get(row, 1, "threads", "channel_id")?,
        thread_ts: row_helpers::get(row, 2, "threads", "thread_ts")?,
        title: row_helpers::get(row, 3, "threads", "title")?,
        url: row_helpers::get(row, 4, "threads", "url")?,
        tags: row_helpers::parse_json(&tags_raw, "threads", "tags")?,
        created_at: row_helpers::get(row, 6, "threads", "created_at")?,
        updated_at: row_helpers::get(row, 7, "threads", "updated_at")?,
        last_message_ts: row_helpers::get_opt(row, 8, "threads", "last_message_ts")?,
        message_count: row_helpers::get::<i64>(row, 9, "threads", "message_count")? as u32,
        new_message_count: row_helpers::get::<i64>(row, 10, "threads", "new_message_count")? as u32,
        is_read: row_helpers::get::<bool>(row, 11, "threads", "is_read")?,
        is_archived: row_helpers::get::<bool>(row, 12, "threads", "is_archived")?,
        summary: SummaryState {
            topic: row_helpers::get(row, 13, "threads", "summary_topic")?,
            generated_at: row_helpers::get_opt(row, 14, "threads", "summary_generated_at")?,
        },
    })
}
