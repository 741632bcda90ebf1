use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use skein_core::errors::PlatformError;
use skein_core::message::Message;
use skein_core::platform::{ChatPlatform, SearchMatch};

/// Scriptable platform for deterministic testing without API calls.
///
/// Responses are consumed in push order. An exhausted search queue
/// yields empty results (a trigger with no hits); an exhausted fetch
/// queue is an error, since sync must never fabricate content.
#[derive(Default)]
pub struct MockPlatform {
    fetches: Mutex<VecDeque<Result<Vec<Message>, PlatformError>>>,
    searches: Mutex<VecDeque<Result<Vec<SearchMatch>, PlatformError>>>,
    fetch_log: Mutex<Vec<(String, String)>>,
    search_log: Mutex<Vec<String>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_fetch(&self, response: Result<Vec<Message>, PlatformError>) {
        self.fetches.lock().push_back(response);
    }

    pub fn push_search(&self, response: Result<Vec<SearchMatch>, PlatformError>) {
        self.searches.lock().push_back(response);
    }

    /// `(channel_id, thread_ts)` pairs fetched, in call order.
    pub fn fetch_calls(&self) -> Vec<(String, String)> {
        self.fetch_log.lock().clone()
    }

    /// Search query strings issued, in call order.
    pub fn search_queries(&self) -> Vec<String> {
        self.search_log.lock().clone()
    }

    /// Convenience: build a message with only the fields tests care about.
    pub fn message(ts: &str, user: &str, text: &str) -> Message {
        Message {
            ts: ts.into(),
            user: user.into(),
            user_name: None,
            text: text.into(),
            reactions: vec![],
            attachments: vec![],
        }
    }

    /// Convenience: build a parent-message search match.
    pub fn parent_match(channel_id: &str, ts: &str, user: &str, text: &str) -> SearchMatch {
        SearchMatch {
            channel_id: channel_id.into(),
            ts: ts.into(),
            thread_ts: None,
            user: user.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn fetch_thread_messages(
        &self,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<Vec<Message>, PlatformError> {
        self.fetch_log
            .lock()
            .push((channel_id.to_string(), thread_ts.to_string()));
        self.fetches
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(PlatformError::Api("no scripted fetch response".into())))
    }

    async fn search(&self, query: &str, _limit: u32) -> Result<Vec<SearchMatch>, PlatformError> {
        self.search_log.lock().push(query.to_string());
        self.searches.lock().pop_front().unwrap_or_else(|| Ok(vec![]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_consume_in_order() {
        let mock = MockPlatform::new();
        mock.push_fetch(Ok(vec![MockPlatform::message("1.0", "U1", "first")]));
        mock.push_fetch(Ok(vec![]));

        let first = mock.fetch_thread_messages("C1", "1.0").await.unwrap();
        assert_eq!(first.len(), 1);
        let second = mock.fetch_thread_messages("C1", "1.0").await.unwrap();
        assert!(second.is_empty());
        assert_eq!(mock.fetch_calls().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_fetch_queue_is_error() {
        let mock = MockPlatform::new();
        let result = mock.fetch_thread_messages("C1", "1.0").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn exhausted_search_queue_is_empty() {
        let mock = MockPlatform::new();
        let result = mock.search("anything", 100).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(mock.search_queries(), vec!["anything"]);
    }

    #[tokio::test]
    async fn scripted_search_error_propagates() {
        let mock = MockPlatform::new();
        mock.push_search(Err(PlatformError::Api("search_disabled".into())));
        let result = mock.search("q", 100).await;
        assert!(matches!(result, Err(PlatformError::Api(_))));
    }
}
