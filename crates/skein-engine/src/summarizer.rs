use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use skein_core::generate::TextGenerator;
use skein_core::ids::ThreadId;
use skein_core::message::Message;
use skein_core::summary::ThreadSummary;
use skein_store::{Database, MessageRepo, SummaryRepo, ThreadRepo};

use crate::error::EngineError;
use crate::{parse, prompts};

/// Decides whether an existing summary is reusable or must be
/// regenerated, and persists newly generated summaries.
///
/// Staleness is keyed purely on the message count recorded at
/// generation time: any additional message invalidates the cached
/// summary, whatever it changed.
pub struct Summarizer {
    threads: ThreadRepo,
    messages: MessageRepo,
    summaries: SummaryRepo,
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(db: Database, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            threads: ThreadRepo::new(db.clone()),
            messages: MessageRepo::new(db.clone()),
            summaries: SummaryRepo::new(db),
            generator,
        }
    }

    /// Get a thread's summary, generating one if none exists yet.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub async fn get_summary(&self, id: &ThreadId) -> Result<ThreadSummary, EngineError> {
        if let Some(existing) = self.summaries.get(id)? {
            return Ok(existing);
        }
        debug!("no summary on record; generating");
        self.generate_summary(id, false).await
    }

    /// Generate (or reuse) a thread's summary.
    ///
    /// With `force` false, a summary whose fingerprint matches the
    /// current message count is returned unchanged — a cache hit that
    /// issues no generation calls.
    #[instrument(skip(self), fields(thread_id = %id, force))]
    pub async fn generate_summary(
        &self,
        id: &ThreadId,
        force: bool,
    ) -> Result<ThreadSummary, EngineError> {
        self.threads
            .get(id)
            .map_err(|e| EngineError::from_store_lookup(e, id))?;

        let messages = self
            .messages
            .get(id)?
            .map(|list| list.messages)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| EngineError::EmptyThread(id.to_string()))?;
        let message_count = messages.len() as u32;

        if !force {
            if let Some(existing) = self.summaries.get(id)? {
                if existing.is_fresh(message_count) {
                    debug!(fingerprint = message_count, "summary fresh; reusing");
                    return Ok(existing);
                }
            }
        }

        let summary = self.generate(id, &messages, message_count).await?;

        self.summaries.put(&summary)?;
        self.threads.set_summary_topic(id, &summary.topic)?;

        info!(
            fingerprint = message_count,
            topic = %summary.topic,
            "summary generated"
        );
        Ok(summary)
    }

    /// Delete a thread's summary. Returns false when none existed.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub fn delete_summary(&self, id: &ThreadId) -> Result<bool, EngineError> {
        Ok(self.summaries.delete(id)?)
    }

    /// The three generation passes. Transport failures propagate;
    /// malformed content never does.
    async fn generate(
        &self,
        id: &ThreadId,
        messages: &[Message],
        message_count: u32,
    ) -> Result<ThreadSummary, EngineError> {
        let overview_raw = self.generator.generate(messages, prompts::OVERVIEW).await?;
        let (topic, overview) = parse::parse_overview(&overview_raw);

        let topics_raw = self.generator.generate(messages, prompts::TOPICS).await?;
        let topic_summaries = parse::parse_topics(&topics_raw);

        let daily_raw = self.generator.generate(messages, prompts::DAILY).await?;
        let daily_summaries = parse::parse_daily(&daily_raw);

        Ok(ThreadSummary {
            thread_id: id.clone(),
            topic,
            overview,
            daily_summaries,
            topic_summaries,
            last_updated: Utc::now().to_rfc3339(),
            message_count_at_summary: message_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_core::errors::GenerateError;
    use skein_core::thread::ThreadCreate;
    use skein_llm::MockGenerator;

    const OVERVIEW_JSON: &str =
        r#"```json
{"topic": "release planning", "overview": "who ships what and when"}
```"#;
    const TOPICS_JSON: &str = r#"[{"topic_name": "rollout", "status": "resolved", "summary": "canary then full", "conclusion": "ship Tuesday", "participants": ["alice"]}]"#;
    const DAILY_JSON: &str = r#"[{"date": "2026-08-05", "message_count": 2, "summary": "rollout agreed", "key_points": ["canary first"], "participants": ["alice", "bob"]}]"#;

    fn setup(generator: Arc<MockGenerator>) -> (Database, Summarizer) {
        let db = Database::in_memory().unwrap();
        let summarizer = Summarizer::new(db.clone(), generator);
        (db, summarizer)
    }

    fn register(db: &Database) -> ThreadId {
        ThreadRepo::new(db.clone())
            .create(
                &ThreadCreate {
                    channel_id: "C1".into(),
                    thread_ts: "100.000".into(),
                    title: "t".into(),
                    tags: vec![],
                },
                "",
            )
            .unwrap()
            .id
    }

    fn store_messages(db: &Database, id: &ThreadId, count: usize) {
        let messages: Vec<Message> = (0..count)
            .map(|i| Message {
                ts: format!("10{i}.000"),
                user: "U1".into(),
                user_name: None,
                text: format!("message {i}"),
                reactions: vec![],
                attachments: vec![],
            })
            .collect();
        MessageRepo::new(db.clone())
            .replace(id, "C1", "100.000", &messages)
            .unwrap();
    }

    fn push_full_generation(generator: &MockGenerator) {
        generator.push(Ok(OVERVIEW_JSON.into()));
        generator.push(Ok(TOPICS_JSON.into()));
        generator.push(Ok(DAILY_JSON.into()));
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found() {
        let generator = Arc::new(MockGenerator::new());
        let (_db, summarizer) = setup(generator);
        let err = summarizer
            .generate_summary(&ThreadId::from_raw("thr_missing"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ThreadNotFound(_)));
    }

    #[tokio::test]
    async fn unsynced_thread_is_empty_thread() {
        let generator = Arc::new(MockGenerator::new());
        let (db, summarizer) = setup(generator.clone());
        let id = register(&db);

        let err = summarizer.generate_summary(&id, false).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyThread(_)));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn zero_message_list_is_empty_thread() {
        let generator = Arc::new(MockGenerator::new());
        let (db, summarizer) = setup(generator);
        let id = register(&db);
        store_messages(&db, &id, 0);

        let err = summarizer.generate_summary(&id, false).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptyThread(_)));
    }

    #[tokio::test]
    async fn generation_builds_and_persists_summary() {
        let generator = Arc::new(MockGenerator::new());
        push_full_generation(&generator);
        let (db, summarizer) = setup(generator.clone());
        let id = register(&db);
        store_messages(&db, &id, 2);

        let summary = summarizer.generate_summary(&id, false).await.unwrap();
        assert_eq!(summary.topic, "release planning");
        assert_eq!(summary.overview, "who ships what and when");
        assert_eq!(summary.topic_summaries.len(), 1);
        assert_eq!(summary.daily_summaries.len(), 1);
        assert_eq!(summary.message_count_at_summary, 2);
        assert_eq!(generator.call_count(), 3);

        // Persisted, and the topic label is propagated onto the thread
        let stored = SummaryRepo::new(db.clone()).get(&id).unwrap().unwrap();
        assert_eq!(stored, summary);
        let thread = ThreadRepo::new(db).get(&id).unwrap();
        assert_eq!(thread.summary.topic, "release planning");
        assert!(thread.summary.generated_at.is_some());
    }

    #[tokio::test]
    async fn matching_fingerprint_is_a_cache_hit() {
        let generator = Arc::new(MockGenerator::new());
        push_full_generation(&generator);
        let (db, summarizer) = setup(generator.clone());
        let id = register(&db);
        store_messages(&db, &id, 2);

        let first = summarizer.generate_summary(&id, false).await.unwrap();
        let second = summarizer.generate_summary(&id, false).await.unwrap();
        assert_eq!(first, second);
        // No generation calls beyond the first pass
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn fingerprint_drift_regenerates() {
        let generator = Arc::new(MockGenerator::new());
        push_full_generation(&generator);
        push_full_generation(&generator);
        let (db, summarizer) = setup(generator.clone());
        let id = register(&db);
        store_messages(&db, &id, 2);

        summarizer.generate_summary(&id, false).await.unwrap();

        // One more message lands and is synced
        store_messages(&db, &id, 3);
        let regenerated = summarizer.generate_summary(&id, false).await.unwrap();
        assert_eq!(regenerated.message_count_at_summary, 3);
        assert_eq!(generator.call_count(), 6);
    }

    #[tokio::test]
    async fn force_regenerates_despite_fresh_fingerprint() {
        let generator = Arc::new(MockGenerator::new());
        push_full_generation(&generator);
        push_full_generation(&generator);
        let (db, summarizer) = setup(generator.clone());
        let id = register(&db);
        store_messages(&db, &id, 2);

        summarizer.generate_summary(&id, false).await.unwrap();
        summarizer.generate_summary(&id, true).await.unwrap();
        assert_eq!(generator.call_count(), 6);
    }

    #[tokio::test]
    async fn get_summary_generates_on_miss_then_reads() {
        let generator = Arc::new(MockGenerator::new());
        push_full_generation(&generator);
        let (db, summarizer) = setup(generator.clone());
        let id = register(&db);
        store_messages(&db, &id, 2);

        let first = summarizer.get_summary(&id).await.unwrap();
        assert_eq!(generator.call_count(), 3);

        let second = summarizer.get_summary(&id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn malformed_generation_output_falls_back() {
        let generator = Arc::new(MockGenerator::new());
        generator.push(Ok("I cannot produce JSON today.".into()));
        generator.push(Ok("still no JSON".into()));
        generator.push(Ok("none here either".into()));
        let (db, summarizer) = setup(generator);
        let id = register(&db);
        store_messages(&db, &id, 2);

        let summary = summarizer.generate_summary(&id, false).await.unwrap();
        assert_eq!(summary.topic, "Discussion");
        assert_eq!(summary.overview, "I cannot produce JSON today.");
        assert_eq!(summary.topic_summaries.len(), 1);
        assert_eq!(summary.topic_summaries[0].topic_name, "General discussion");
        assert!(summary.daily_summaries.is_empty());
        assert_eq!(summary.message_count_at_summary, 2);

        // The fallback result is persisted like any other
        let thread = ThreadRepo::new(db).get(&id).unwrap();
        assert_eq!(thread.summary.topic, "Discussion");
    }

    #[tokio::test]
    async fn generator_transport_failure_propagates_and_writes_nothing() {
        let generator = Arc::new(MockGenerator::new());
        generator.push(Err(GenerateError::Http {
            status: 500,
            body: "overloaded".into(),
        }));
        let (db, summarizer) = setup(generator);
        let id = register(&db);
        store_messages(&db, &id, 2);

        let err = summarizer.generate_summary(&id, false).await.unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
        assert!(SummaryRepo::new(db).get(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_summary_roundtrip() {
        let generator = Arc::new(MockGenerator::new());
        push_full_generation(&generator);
        let (db, summarizer) = setup(generator);
        let id = register(&db);
        store_messages(&db, &id, 2);

        summarizer.generate_summary(&id, false).await.unwrap();
        assert!(summarizer.delete_summary(&id).unwrap());
        assert!(!summarizer.delete_summary(&id).unwrap());
    }
}
