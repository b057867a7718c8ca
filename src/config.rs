//! Rate limit and circuit breaker configuration
//!
//! `RateLimitConfig` is supplied once at client construction and never
//! mutated. Defaults match the provider limits Curator ships against;
//! deployments override them via the `[metadata]` table of the module
//! TOML config.

use crate::error::{MetaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Rate limiting and resilience configuration for one metadata client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained outbound request pace
    pub max_requests_per_second: f64,
    /// Simultaneous in-flight request cap
    pub max_concurrent_requests: usize,
    /// Token bucket burst capacity (must be >= max_requests_per_second)
    pub token_bucket_capacity: f64,
    /// Tokens regained per second
    pub token_bucket_refill_rate: f64,
    /// Longest a call waits for a token before failing, in seconds
    pub token_acquire_timeout_seconds: f64,
    /// Physical attempts per logical call
    pub max_retries: u32,
    /// Honor Retry-After headers on 429 responses
    pub respect_retry_after: bool,
    /// Rolling failure rate that opens the circuit, in (0, 1]
    pub circuit_breaker_failure_threshold: f64,
    /// Minimum attempts before the failure rate is trusted
    pub circuit_breaker_min_samples: u64,
    /// Seconds the circuit stays open before a half-open probe
    pub circuit_breaker_timeout_seconds: u64,
    /// Fixed pause before every logical call (0 disables)
    pub proactive_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: 4.0,
            max_concurrent_requests: 8,
            token_bucket_capacity: 10.0,
            token_bucket_refill_rate: 4.0,
            token_acquire_timeout_seconds: 10.0,
            max_retries: 3,
            respect_retry_after: true,
            circuit_breaker_failure_threshold: 0.5,
            circuit_breaker_min_samples: 15,
            circuit_breaker_timeout_seconds: 60,
            proactive_delay_ms: 0,
        }
    }
}

impl RateLimitConfig {
    /// Validate constraints that would otherwise surface as runtime
    /// misbehavior (a bucket that never refills, a breaker that can
    /// never open).
    pub fn validate(&self) -> Result<()> {
        if self.max_requests_per_second <= 0.0 {
            return Err(MetaError::Config(format!(
                "max_requests_per_second must be positive, got {}",
                self.max_requests_per_second
            )));
        }
        if self.max_concurrent_requests == 0 {
            return Err(MetaError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.token_bucket_capacity < self.max_requests_per_second {
            return Err(MetaError::Config(format!(
                "token_bucket_capacity ({}) must be >= max_requests_per_second ({})",
                self.token_bucket_capacity, self.max_requests_per_second
            )));
        }
        if self.token_bucket_refill_rate <= 0.0 {
            return Err(MetaError::Config(format!(
                "token_bucket_refill_rate must be positive, got {}",
                self.token_bucket_refill_rate
            )));
        }
        if self.max_retries == 0 {
            return Err(MetaError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.circuit_breaker_failure_threshold <= 0.0
            || self.circuit_breaker_failure_threshold > 1.0
        {
            return Err(MetaError::Config(format!(
                "circuit_breaker_failure_threshold must be in (0, 1], got {}",
                self.circuit_breaker_failure_threshold
            )));
        }
        Ok(())
    }

    pub fn token_acquire_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.token_acquire_timeout_seconds.max(0.0))
    }

    pub fn circuit_breaker_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_timeout_seconds)
    }

    pub fn proactive_delay(&self) -> Option<Duration> {
        if self.proactive_delay_ms > 0 {
            Some(Duration::from_millis(self.proactive_delay_ms))
        } else {
            None
        }
    }

    /// Parse a config from TOML text. Unknown keys are ignored and
    /// missing keys fall back to defaults, so a partial `[metadata]`
    /// table is enough.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RateLimitConfig = toml::from_str(content)
            .map_err(|e| MetaError::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file on disk.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MetaError::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}
