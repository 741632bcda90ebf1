use skein_core::errors::{GenerateError, PlatformError};
use skein_core::ids::ThreadId;
use skein_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Unknown thread identifier. Surfaced as a 404-class condition.
    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    /// The thread exists but has no synchronized messages yet; sync
    /// must run first. Surfaced as a 404-class "not ready" condition.
    #[error("thread has no synced messages: {0}")]
    EmptyThread(String),

    /// Messaging-platform failure. Surfaced as a 500-class condition;
    /// not retried by this core.
    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Generation-capability transport failure. Malformed *content*
    /// never reaches this variant — it is recovered locally.
    #[error("generation error: {0}")]
    Generation(#[from] GenerateError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Map a store lookup failure, promoting NotFound to the engine's
    /// thread-level variant.
    pub(crate) fn from_store_lookup(e: StoreError, id: &ThreadId) -> Self {
        if e.is_not_found() {
            Self::ThreadNotFound(id.to_string())
        } else {
            Self::Store(e)
        }
    }
}
