//! # curator-meta
//!
//! Resilient remote-metadata client core for the Curator media
//! organizer. Everything here exists to make high-volume calls to a
//! rate-limited, occasionally degraded metadata provider survivable:
//! - Token bucket pacing outbound calls
//! - Bounded concurrency over in-flight requests
//! - Backoff policy honoring Retry-After hints
//! - Circuit breaker falling back to cached results when the provider
//!   is unhealthy
//!
//! Scanning, filename parsing, match scoring, and file moves live in
//! the surrounding services; this crate only talks to the provider and
//! to an abstract cache.

pub mod backoff;
pub mod cache;
pub mod client;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod health;
pub mod stats;
pub mod token_bucket;
pub mod types;

pub use crate::backoff::BackoffPolicy;
pub use crate::cache::{MemoryCache, MetadataCache};
pub use crate::client::MetadataClient;
pub use crate::concurrency::ConcurrencyLimiter;
pub use crate::config::RateLimitConfig;
pub use crate::error::{MetaError, Result};
pub use crate::health::{CircuitState, HealthMonitor};
pub use crate::stats::ClientStats;
pub use crate::token_bucket::TokenBucket;
pub use crate::types::{MediaDetails, MediaType, SearchResult};
