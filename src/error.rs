//! # Provider Error Taxonomy
//!
//! Typed errors for calls against the hosted generation API, with the
//! transient/permanent classification the retry coordinator keys off.

use crate::resilience::retry::RetryClassification;

/// Errors surfaced by calls to the generation provider.
///
/// The variants mirror the failure modes a client actually sees: transport
/// failures, quota pushback, upstream outages, caller mistakes, and payloads
/// that do not parse into the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure before any HTTP status was received
    #[error("network error: {0}")]
    Network(String),

    /// Provider returned HTTP 429
    #[error("rate limited by provider")]
    RateLimited,

    /// Provider returned a 5xx status
    #[error("server error: status {status}")]
    Server { status: u16 },

    /// Provider rejected the request with a 4xx status (other than 429)
    #[error("request rejected: status {status}")]
    Client { status: u16 },

    /// Response arrived but did not match the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Map an HTTP status code onto the taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => ApiError::RateLimited,
            s if s >= 500 => ApiError::Server { status: s },
            s => ApiError::Client { status: s },
        }
    }

    /// Whether a retry has a realistic chance of succeeding.
    ///
    /// Network failures, quota pushback, and upstream outages are transient;
    /// caller mistakes and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::RateLimited | ApiError::Server { .. }
        )
    }
}

impl RetryClassification for ApiError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::from_status(429), ApiError::RateLimited);
        assert_eq!(ApiError::from_status(503), ApiError::Server { status: 503 });
        assert_eq!(ApiError::from_status(400), ApiError::Client { status: 400 });
    }

    #[test]
    fn transient_classification() {
        assert!(ApiError::Network("connection reset".into()).is_transient());
        assert!(ApiError::RateLimited.is_transient());
        assert!(ApiError::Server { status: 502 }.is_transient());
        assert!(!ApiError::Client { status: 404 }.is_transient());
        assert!(!ApiError::InvalidResponse("truncated json".into()).is_transient());
    }
}
