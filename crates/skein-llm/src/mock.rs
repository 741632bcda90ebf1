use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use skein_core::errors::GenerateError;
use skein_core::generate::TextGenerator;
use skein_core::message::Message;

/// Pre-programmed completions for deterministic testing without API
/// calls. Responses are consumed in push order; the call counter lets
/// tests assert that cached paths issued no generation at all.
#[derive(Default)]
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, GenerateError>>>,
    call_count: AtomicUsize,
    prompt_log: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a generator that answers every call with the same text.
    pub fn repeating(text: &str) -> Self {
        let mock = Self::new();
        for _ in 0..64 {
            mock.push(Ok(text.to_string()));
        }
        mock
    }

    pub fn push(&self, response: Result<String, GenerateError>) {
        self.responses.lock().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompt_log.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        _messages: &[Message],
        prompt: &str,
    ) -> Result<String, GenerateError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompt_log.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(GenerateError::Decode("no scripted completion".into())))
    }
}
