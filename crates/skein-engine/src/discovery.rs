use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use skein_core::config::{AppConfig, MonitoredSource};
use skein_core::discover::{DiscoveredThread, Trigger, TriggerKind};
use skein_core::platform::{ChatPlatform, SearchMatch};
use skein_core::thread::{permalink, ThreadCreate};
use skein_store::{Database, ThreadRepo};

use crate::error::EngineError;

const SEARCH_LIMIT: u32 = 100;
const PREVIEW_CHARS: usize = 200;

/// A thread selected for registration after discovery.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadRegistration {
    pub channel_id: String,
    pub thread_ts: String,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Aggregate result of a bulk registration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegisterReport {
    pub registered: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

/// Scans monitored sources for mention- and keyword-triggered threads,
/// deduplicating against registered threads and within the scan.
pub struct DiscoveryEngine {
    threads: ThreadRepo,
    platform: Arc<dyn ChatPlatform>,
    config: AppConfig,
}

impl DiscoveryEngine {
    pub fn new(db: Database, platform: Arc<dyn ChatPlatform>, config: AppConfig) -> Self {
        Self {
            threads: ThreadRepo::new(db),
            platform,
            config,
        }
    }

    /// Scan for candidate threads from the past `days` days.
    ///
    /// Triggers run in a fixed order — sources as configured, mention
    /// users before keywords, each in configured list order — and the
    /// first trigger to surface a thread claims it. Performs no writes.
    #[instrument(skip(self, channel_ids), fields(days))]
    pub async fn discover_threads(
        &self,
        channel_ids: Option<&[String]>,
        days: u32,
    ) -> Result<Vec<DiscoveredThread>, EngineError> {
        let sources = self.config.resolve_sources(channel_ids);
        if sources.is_empty() {
            warn!("no monitored sources resolve; nothing to discover");
            return Ok(vec![]);
        }

        // Seed the dedup set with every registered thread's key.
        let mut seen: HashSet<(String, String)> = self
            .threads
            .list_all()?
            .iter()
            .map(|t| t.dedup_key())
            .collect();

        let mut discovered = Vec::new();

        for source in sources {
            debug!(channel = %source.channel_name, "scanning source");

            for user_id in &source.mention_users {
                let query = skein_slack::query::mention_query(&source.channel_id, user_id, days);
                let matches = self.run_search(&query).await;
                self.collect(
                    source,
                    matches,
                    Trigger {
                        kind: TriggerKind::Mention,
                        value: user_id.clone(),
                    },
                    &mut seen,
                    &mut discovered,
                );
            }

            for keyword in &source.keywords {
                let query = skein_slack::query::keyword_query(&source.channel_id, keyword, days);
                let matches = self.run_search(&query).await;
                self.collect(
                    source,
                    matches,
                    Trigger {
                        kind: TriggerKind::Keyword,
                        value: keyword.clone(),
                    },
                    &mut seen,
                    &mut discovered,
                );
            }
        }

        info!(count = discovered.len(), "discovery complete");
        Ok(discovered)
    }

    /// One bad trigger must not blank the pass: a failed search is
    /// logged and treated as zero results.
    async fn run_search(&self, query: &str) -> Vec<SearchMatch> {
        match self.platform.search(query, SEARCH_LIMIT).await {
            Ok(matches) => matches,
            Err(e) => {
                error!(error = %e, kind = e.error_kind(), "search failed; skipping trigger");
                vec![]
            }
        }
    }

    fn collect(
        &self,
        source: &MonitoredSource,
        matches: Vec<SearchMatch>,
        trigger: Trigger,
        seen: &mut HashSet<(String, String)>,
        discovered: &mut Vec<DiscoveredThread>,
    ) {
        for m in matches {
            let channel_id = if m.channel_id.is_empty() {
                source.channel_id.clone()
            } else {
                m.channel_id.clone()
            };
            let thread_ts = m.anchor_ts().to_string();
            let key = (channel_id.clone(), thread_ts.clone());

            // Claim the key immediately so a later trigger on the same
            // physical thread cannot emit a duplicate.
            if !seen.insert(key) {
                continue;
            }

            discovered.push(DiscoveredThread {
                url: permalink(&self.config.workspace, &channel_id, &thread_ts),
                channel_id,
                channel_name: source.channel_name.clone(),
                created_at: ts_to_rfc3339(&thread_ts),
                thread_ts,
                first_message_text: m.text.chars().take(PREVIEW_CHARS).collect(),
                first_message_user: m.user,
                // The real count is only known after a sync.
                message_count: 1,
                trigger: trigger.clone(),
            });
        }
    }

    /// Register discovered threads in bulk. The dedup key is re-checked
    /// at write time — time may have passed since discovery — and the
    /// store's UNIQUE constraint remains the authoritative guard.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub fn register_threads(
        &self,
        requests: &[ThreadRegistration],
    ) -> Result<RegisterReport, EngineError> {
        let mut report = RegisterReport::default();

        for req in requests {
            match self.register_one(req) {
                Ok(()) => report.registered += 1,
                Err(msg) => {
                    warn!(channel_id = %req.channel_id, thread_ts = %req.thread_ts, error = %msg, "registration failed");
                    report.failed += 1;
                    report.errors.push(msg);
                }
            }
        }

        info!(
            registered = report.registered,
            failed = report.failed,
            "bulk registration complete"
        );
        Ok(report)
    }

    fn register_one(&self, req: &ThreadRegistration) -> Result<(), String> {
        match self.threads.find_by_source(&req.channel_id, &req.thread_ts) {
            Ok(Some(_)) => {
                return Err(format!(
                    "thread already registered: {}/{}",
                    req.channel_id, req.thread_ts
                ));
            }
            Ok(None) => {}
            Err(e) => return Err(e.to_string()),
        }

        let create = ThreadCreate {
            channel_id: req.channel_id.clone(),
            thread_ts: req.thread_ts.clone(),
            title: req.title.clone(),
            tags: req.tags.clone(),
        };
        let url = permalink(&self.config.workspace, &req.channel_id, &req.thread_ts);
        self.threads
            .create(&create, &url)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Best-effort conversion of a platform timestamp ("1712000000.000100")
/// to RFC 3339. Falls back to the current time on garbage.
fn ts_to_rfc3339(ts: &str) -> String {
    ts.split('.')
        .next()
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}
