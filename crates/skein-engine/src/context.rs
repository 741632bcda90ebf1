use std::sync::Arc;

use tracing::instrument;

use skein_core::config::AppConfig;
use skein_core::generate::TextGenerator;
use skein_core::ids::ThreadId;
use skein_core::platform::ChatPlatform;
use skein_store::{Database, MessageRepo, SummaryRepo, ThreadRepo};

use crate::confidence::ConfidenceScorer;
use crate::discovery::DiscoveryEngine;
use crate::error::EngineError;
use crate::summarizer::Summarizer;
use crate::sync::SyncEngine;

/// Fully wired application context: every engine constructed with its
/// store and capability dependencies injected, no module globals.
pub struct AppContext {
    pub config: AppConfig,
    pub threads: ThreadRepo,
    pub messages: MessageRepo,
    pub summaries: SummaryRepo,
    pub sync: SyncEngine,
    pub discovery: DiscoveryEngine,
    pub summarizer: Summarizer,
    pub scorer: ConfidenceScorer,
}

impl AppContext {
    pub fn new(
        db: Database,
        platform: Arc<dyn ChatPlatform>,
        generator: Arc<dyn TextGenerator>,
        config: AppConfig,
    ) -> Self {
        Self {
            threads: ThreadRepo::new(db.clone()),
            messages: MessageRepo::new(db.clone()),
            summaries: SummaryRepo::new(db.clone()),
            sync: SyncEngine::new(db.clone(), platform.clone()),
            discovery: DiscoveryEngine::new(db.clone(), platform, config.clone()),
            summarizer: Summarizer::new(db, generator),
            scorer: ConfidenceScorer::default(),
            config,
        }
    }

    /// Delete a thread and everything derived from it: summary and
    /// message list first, then the thread record.
    #[instrument(skip(self), fields(thread_id = %id))]
    pub fn delete_thread(&self, id: &ThreadId) -> Result<bool, EngineError> {
        self.summaries.delete(id)?;
        self.messages.delete(id)?;
        Ok(self.threads.delete(id)?)
    }
}
