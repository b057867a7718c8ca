//! Error types for the metadata client core
//!
//! Every failure mode surfaces as a distinct, inspectable kind; internal
//! retries are invisible to callers except through added latency and the
//! stats snapshot. Batch layers above this crate catch these per item so
//! one file's failure never aborts a whole import.

use thiserror::Error;

/// Result type for metadata client operations
pub type Result<T> = std::result::Result<T, MetaError>;

/// Metadata client errors
#[derive(Debug, Error)]
pub enum MetaError {
    /// Token bucket stayed empty past `token_acquire_timeout`
    #[error("Rate limit wait timed out after {waited_ms}ms")]
    RateLimitWaitTimeout { waited_ms: u64 },

    /// Retry budget consumed on repeated 429 responses
    #[error("Rate limit retries exhausted after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    /// Circuit breaker is open and no cached fallback was available
    #[error("Circuit breaker open, no cached result for this request")]
    CircuitOpen,

    /// Terminal non-429 HTTP error status
    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// Connection-level failure (timeout, refused, DNS) after retries
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx response whose body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid configuration detected at client construction
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MetaError {
    /// True for errors where degrading to cached data is a sensible
    /// caller response (the provider is unhealthy, not the request).
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            MetaError::RateLimitWaitTimeout { .. }
                | MetaError::RateLimitExhausted { .. }
                | MetaError::CircuitOpen
                | MetaError::Network(_)
        )
    }
}
