pub mod config;
pub mod discover;
pub mod errors;
pub mod generate;
pub mod ids;
pub mod message;
pub mod platform;
pub mod summary;
pub mod thread;

pub use errors::{GenerateError, PlatformError};
pub use ids::ThreadId;
