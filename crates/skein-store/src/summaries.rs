use chrono::Utc;
use tracing::instrument;

use skein_core::ids::ThreadId;
use skein_core::summary::ThreadSummary;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Summaries stored as one JSON document per thread.
pub struct SummaryRepo {
    db: Database,
}

impl SummaryRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(thread_id = %thread_id))]
    pub fn get(&self, thread_id: &ThreadId) -> Result<Option<ThreadSummary>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT payload FROM summaries WHERE thread_id = ?1")?;
            let mut rows = stmt.query([thread_id.as_str()])?;
            match rows.next()? {
                Some(row) => {
                    let payload: String = row_helpers::get(row, 0, "summaries", "payload")?;
                    Ok(Some(row_helpers::parse_json(&payload, "summaries", "payload")?))
                }
                None => Ok(None),
            }
        })
    }

    /// Store a summary, replacing any previous one for the thread.
    #[instrument(skip(self, summary), fields(thread_id = %summary.thread_id))]
    pub fn put(&self, summary: &ThreadSummary) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(summary)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO summaries (thread_id, payload, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(thread_id) DO UPDATE SET
                     payload = excluded.payload,
                     updated_at = excluded.updated_at",
                rusqlite::params![summary.thread_id.as_str(), payload, now],
            )?;
            Ok(())
        })
    }

    /// Delete a thread's summary. Returns false when none existed.
    #[instrument(skip(self), fields(thread_id = %thread_id))]
    pub fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM summaries WHERE thread_id = ?1",
                [thread_id.as_str()],
            )?;
            Ok(n > 0)
        })
    }
}
