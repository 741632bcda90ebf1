use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use skein_core::ids::ThreadId;
use skein_core::platform::ChatPlatform;
use skein_store::{Database, MessageRepo, ThreadRepo};

use crate::error::EngineError;

/// Result of syncing one thread.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub thread_id: ThreadId,
    pub total_messages: u32,
    pub new_messages: u32,
    pub synced_at: String,
}

/// One failed thread in a batch sync. Carries enough identity to
/// retry the thread individually later.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncFailure {
    pub thread_id: ThreadId,
    pub error: String,
}

/// Aggregate result of a batch sync.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub total_threads: u32,
    pub synced: u32,
    pub failed: u32,
    pub new_messages_total: u32,
    pub errors: Vec<SyncFailure>,
}

/// Pulls a thread's authoritative message set from the platform,
/// computes the new-message delta against the stored watermark, and
/// updates the thread's statistics.
pub struct SyncEngine {
    threads: ThreadRepo,
    messages: MessageRepo,
    platform: Arc<dyn ChatPlatform>,
    /// Per-thread-id guards so two concurrent syncs of the same thread
    /// cannot interleave their read-modify-write.
    locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl SyncEngine {
    pub fn new(db: Database, platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            threads: ThreadRepo::new(db.clone()),
            messages: MessageRepo::new(db),
            platform,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: &ThreadId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry(id.as_str().to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Sync one thread from the platform. The fetched set replaces the
    /// stored message list in full; nothing is written when the fetch
    /// fails.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub async fn sync_thread(&self, id: &ThreadId) -> Result<SyncOutcome, EngineError> {
        let guard = self.lock_for(id);
        let _held = guard.lock().await;

        let thread = self
            .threads
            .get(id)
            .map_err(|e| EngineError::from_store_lookup(e, id))?;

        let fetched = self
            .platform
            .fetch_thread_messages(&thread.channel_id, &thread.thread_ts)
            .await?;

        let watermark = thread.watermark();
        let new_messages = fetched
            .iter()
            .filter(|m| m.ts.as_str() > watermark)
            .count() as u32;

        self.messages
            .replace(&thread.id, &thread.channel_id, &thread.thread_ts, &fetched)?;

        // An empty fetch leaves the watermark unchanged.
        let last_ts = fetched.last().map(|m| m.ts.as_str());
        self.threads
            .update_message_stats(&thread.id, fetched.len() as u32, new_messages, last_ts)?;

        info!(
            total = fetched.len(),
            new = new_messages,
            "thread synced"
        );

        Ok(SyncOutcome {
            thread_id: id.clone(),
            total_messages: fetched.len() as u32,
            new_messages,
            synced_at: Utc::now().to_rfc3339(),
        })
    }

    /// Sync every known thread, sequentially. One thread's failure
    /// does not abort the batch; failures are reported per thread.
    #[instrument(skip(self))]
    pub async fn sync_all_threads(&self) -> Result<SyncReport, EngineError> {
        let threads = self.threads.list_all()?;
        let mut report = SyncReport {
            total_threads: threads.len() as u32,
            ..Default::default()
        };

        for thread in &threads {
            match self.sync_thread(&thread.id).await {
                Ok(outcome) => {
                    report.synced += 1;
                    report.new_messages_total += outcome.new_messages;
                }
                Err(e) => {
                    error!(thread_id = %thread.id, error = %e, "thread sync failed");
                    report.failed += 1;
                    report.errors.push(SyncFailure {
                        thread_id: thread.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            synced = report.synced,
            failed = report.failed,
            new_messages = report.new_messages_total,
            "batch sync complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_core::errors::PlatformError;
    use skein_core::thread::ThreadCreate;
    use skein_slack::MockPlatform;

    fn setup() -> (Database, Arc<MockPlatform>, SyncEngine) {
        let db = Database::in_memory().unwrap();
        let platform = Arc::new(MockPlatform::new());
        let engine = SyncEngine::new(db.clone(), platform.clone());
        (db, platform, engine)
    }

    fn register(db: &Database, channel: &str, ts: &str) -> ThreadId {
        ThreadRepo::new(db.clone())
            .create(
                &ThreadCreate {
                    channel_id: channel.into(),
                    thread_ts: ts.into(),
                    title: format!("{channel}/{ts}"),
                    tags: vec![],
                },
                "",
            )
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn sync_unknown_thread_is_not_found() {
        let (_db, _platform, engine) = setup();
        let err = engine
            .sync_thread(&ThreadId::from_raw("thr_missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ThreadNotFound(_)));
    }

    #[tokio::test]
    async fn first_sync_counts_replies_as_new() {
        let (db, platform, engine) = setup();
        let id = register(&db, "C1", "100.000");
        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "first reply"),
            MockPlatform::message("102.000", "U1", "second reply"),
        ]));

        let outcome = engine.sync_thread(&id).await.unwrap();
        assert_eq!(outcome.total_messages, 3);
        // Watermark falls back to thread_ts: the root message does not
        // strictly exceed it, the two replies do.
        assert_eq!(outcome.new_messages, 2);

        let thread = ThreadRepo::new(db.clone()).get(&id).unwrap();
        assert_eq!(thread.last_message_ts.as_deref(), Some("102.000"));
        assert_eq!(thread.message_count, 3);
        assert_eq!(thread.new_message_count, 2);
        assert!(!thread.is_read);

        let list = MessageRepo::new(db).get(&id).unwrap().unwrap();
        assert_eq!(list.messages.len(), 3);
    }

    #[tokio::test]
    async fn repeated_sync_watermark_is_monotonic() {
        let (db, platform, engine) = setup();
        let id = register(&db, "C1", "100.000");
        let threads = ThreadRepo::new(db.clone());

        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "reply"),
        ]));
        engine.sync_thread(&id).await.unwrap();
        assert_eq!(
            threads.get(&id).unwrap().last_message_ts.as_deref(),
            Some("101.000")
        );

        // Identical fetch: no messages exceed the watermark
        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "reply"),
        ]));
        let outcome = engine.sync_thread(&id).await.unwrap();
        assert_eq!(outcome.new_messages, 0);
        assert_eq!(
            threads.get(&id).unwrap().last_message_ts.as_deref(),
            Some("101.000")
        );

        // One more message advances it
        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "reply"),
            MockPlatform::message("103.000", "U3", "late reply"),
        ]));
        let outcome = engine.sync_thread(&id).await.unwrap();
        assert_eq!(outcome.new_messages, 1);
        assert_eq!(
            threads.get(&id).unwrap().last_message_ts.as_deref(),
            Some("103.000")
        );
    }

    #[tokio::test]
    async fn empty_fetch_keeps_watermark() {
        let (db, platform, engine) = setup();
        let id = register(&db, "C1", "100.000");
        let threads = ThreadRepo::new(db.clone());

        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("102.000", "U2", "reply"),
        ]));
        engine.sync_thread(&id).await.unwrap();

        platform.push_fetch(Ok(vec![]));
        let outcome = engine.sync_thread(&id).await.unwrap();
        assert_eq!(outcome.total_messages, 0);
        assert_eq!(outcome.new_messages, 0);
        assert_eq!(
            threads.get(&id).unwrap().last_message_ts.as_deref(),
            Some("102.000")
        );
    }

    #[tokio::test]
    async fn failed_fetch_writes_nothing() {
        let (db, platform, engine) = setup();
        let id = register(&db, "C1", "100.000");

        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "reply"),
        ]));
        engine.sync_thread(&id).await.unwrap();

        platform.push_fetch(Err(PlatformError::Network("connection reset".into())));
        let err = engine.sync_thread(&id).await.unwrap_err();
        assert!(matches!(err, EngineError::Platform(_)));

        // Prior state is intact
        let thread = ThreadRepo::new(db.clone()).get(&id).unwrap();
        assert_eq!(thread.message_count, 2);
        assert_eq!(thread.last_message_ts.as_deref(), Some("101.000"));
        let list = MessageRepo::new(db).get(&id).unwrap().unwrap();
        assert_eq!(list.messages.len(), 2);
    }

    #[tokio::test]
    async fn watermark_example_from_contract() {
        let (db, platform, engine) = setup();
        let id = register(&db, "C1", "100.000");
        let threads = ThreadRepo::new(db.clone());

        platform.push_fetch(Ok(vec![MockPlatform::message("100.000", "U1", "root")]));
        engine.sync_thread(&id).await.unwrap();
        assert_eq!(
            threads.get(&id).unwrap().last_message_ts.as_deref(),
            Some("100.000")
        );

        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "a"),
            MockPlatform::message("102.000", "U3", "b"),
        ]));
        let outcome = engine.sync_thread(&id).await.unwrap();
        assert_eq!(outcome.new_messages, 2);
        assert_eq!(
            threads.get(&id).unwrap().last_message_ts.as_deref(),
            Some("102.000")
        );
    }

    #[tokio::test]
    async fn batch_sync_continues_past_failures() {
        let (db, platform, engine) = setup();
        let mut ids = Vec::new();
        for i in 1..=5 {
            ids.push(register(&db, "C1", &format!("{i}00.000")));
        }

        // Threads sync in registration order; the third one fails.
        for i in 1..=5 {
            if i == 3 {
                platform.push_fetch(Err(PlatformError::Http {
                    status: 500,
                    body: "internal".into(),
                }));
            } else {
                platform.push_fetch(Ok(vec![
                    MockPlatform::message(&format!("{i}00.000"), "U1", "root"),
                    MockPlatform::message(&format!("{i}01.000"), "U2", "reply"),
                ]));
            }
        }

        let report = engine.sync_all_threads().await.unwrap();
        assert_eq!(report.total_threads, 5);
        assert_eq!(report.synced, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.new_messages_total, 4);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].thread_id, ids[2]);
        assert!(report.errors[0].error.contains("500"));
    }

    #[tokio::test]
    async fn batch_sync_with_no_threads() {
        let (_db, _platform, engine) = setup();
        let report = engine.sync_all_threads().await.unwrap();
        assert_eq!(report.total_threads, 0);
        assert_eq!(report.synced, 0);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn concurrent_same_thread_syncs_serialize() {
        let (db, platform, engine) = setup();
        let id = register(&db, "C1", "100.000");
        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "reply"),
        ]));
        platform.push_fetch(Ok(vec![
            MockPlatform::message("100.000", "U1", "root"),
            MockPlatform::message("101.000", "U2", "reply"),
        ]));

        let engine = Arc::new(engine);
        let (a, b) = tokio::join!(engine.sync_thread(&id), engine.sync_thread(&id));
        let (a, b) = (a.unwrap(), b.unwrap());

        // Whichever ran second saw the first run's watermark.
        assert_eq!(a.new_messages + b.new_messages, 1);
        let thread = ThreadRepo::new(db).get(&id).unwrap();
        assert_eq!(thread.last_message_ts.as_deref(), Some("101.000"));
    }
}
