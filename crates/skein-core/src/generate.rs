use async_trait::async_trait;

use crate::errors::GenerateError;
use crate::message::Message;

/// Text-completion capability used for summaries and answers.
///
/// Output is untrusted free text. It may embed structured data (fenced
/// JSON blocks) but callers must tolerate anything, including garbage.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[Message], prompt: &str)
        -> Result<String, GenerateError>;
}

/// Render a message list into the transcript form fed to generators:
/// one `[ts] name: text` line per message.
pub fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}] {}: {}", m.ts, m.display_name(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}
