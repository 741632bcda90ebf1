use std::time::Duration;

/// Typed errors for the messaging-platform capability.
/// All variants are upstream failures; this core does not retry them.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("platform API error: {0}")]
    Api(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl PlatformError {
    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            _ => Self::Http { status, body },
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::Api(_) => "api_error",
            Self::Http { .. } => "http_error",
            Self::Network(_) => "network_error",
            Self::Decode(_) => "decode_error",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Typed errors for the text-generation capability.
///
/// Malformed *content* (e.g. a completion that fails to parse as the
/// requested JSON) is not an error here — callers must treat generated
/// text as untrusted and recover locally.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GenerateError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            _ => Self::Http { status, body },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_from_status_mapping() {
        assert!(matches!(
            PlatformError::from_status(401, "unauthorized".into()),
            PlatformError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            PlatformError::from_status(403, "forbidden".into()),
            PlatformError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            PlatformError::from_status(500, "internal".into()),
            PlatformError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn generate_from_status_mapping() {
        assert!(matches!(
            GenerateError::from_status(401, "bad key".into()),
            GenerateError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GenerateError::from_status(429, "rate limited".into()),
            GenerateError::Http { status: 429, .. }
        ));
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(PlatformError::Api("bad".into()).error_kind(), "api_error");
        assert_eq!(
            PlatformError::Network("tcp".into()).error_kind(),
            "network_error"
        );
    }
}
