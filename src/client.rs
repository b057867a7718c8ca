//! Resilient metadata provider client
//!
//! Composes the token bucket, concurrency limiter, backoff policy, and
//! circuit breaker around one request-execution loop. Safe for
//! concurrent use from many tasks; multiple independently-configured
//! clients (one per credential) can coexist because all state is owned
//! by the instance.

use crate::backoff::BackoffPolicy;
use crate::cache::MetadataCache;
use crate::concurrency::ConcurrencyLimiter;
use crate::config::RateLimitConfig;
use crate::error::{MetaError, Result};
use crate::health::{CircuitGate, CircuitState, HealthMonitor};
use crate::stats::ClientStats;
use crate::token_bucket::TokenBucket;
use crate::types::{MediaDetails, MediaType, SearchResponse, SearchResult};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const USER_AGENT: &str = "Curator/0.1.0 (https://github.com/curator-media/curator)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How often an empty bucket is re-checked while a caller waits
const TOKEN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// TTL for write-through cache entries after a successful live fetch
const CACHE_WARM_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Rate-limited, circuit-protected client for one metadata provider
pub struct MetadataClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    config: RateLimitConfig,
    bucket: TokenBucket,
    limiter: ConcurrencyLimiter,
    backoff: BackoffPolicy,
    health: HealthMonitor,
    cache: Option<Arc<dyn MetadataCache>>,
    last_request: Mutex<Option<DateTime<Utc>>>,
}

impl MetadataClient {
    /// Create a client for `base_url` with a static credential.
    /// Validates the config up front so misconfiguration fails here,
    /// not on the first call.
    pub fn new(base_url: &str, api_key: &str, config: RateLimitConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| MetaError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: TokenBucket::new(
                config.token_bucket_capacity,
                config.token_bucket_refill_rate,
            ),
            limiter: ConcurrencyLimiter::new(config.max_concurrent_requests),
            backoff: BackoffPolicy::new(config.respect_retry_after),
            health: HealthMonitor::new(
                config.circuit_breaker_failure_threshold,
                config.circuit_breaker_min_samples,
                config.circuit_breaker_timeout(),
            ),
            cache: None,
            last_request: Mutex::new(None),
            config,
        })
    }

    /// Attach the cache consulted for OPEN-state fallback and warmed
    /// after successful live fetches.
    pub fn with_cache(mut self, cache: Arc<dyn MetadataCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Search the provider by title.
    pub async fn search(&self, query: &str, media_type: MediaType) -> Result<Vec<SearchResult>> {
        let path = format!("search/{}", media_type.as_path_segment());
        let params = [("query", query.to_string())];

        let payload = self.execute_request(&path, &params).await?;
        let response: SearchResponse =
            serde_json::from_value(payload).map_err(|e| MetaError::Parse(e.to_string()))?;

        tracing::debug!(
            query = %query,
            media_type = media_type.as_path_segment(),
            hits = response.results.len(),
            "Provider search complete"
        );
        Ok(response.results)
    }

    /// Fetch full details for one provider id.
    pub async fn fetch_details(&self, id: i64, media_type: MediaType) -> Result<MediaDetails> {
        let path = format!("{}/{}", media_type.as_path_segment(), id);

        let payload = self.execute_request(&path, &[]).await?;
        serde_json::from_value(payload).map_err(|e| MetaError::Parse(e.to_string()))
    }

    /// One logical call: circuit gate, then up to `max_retries`
    /// physical attempts through the bucket and permit.
    async fn execute_request(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        if let Some(delay) = self.config.proactive_delay() {
            tokio::time::sleep(delay).await;
        }

        let cache_key = Self::cache_key(path, params);

        match self.health.gate() {
            CircuitGate::Proceed => {}
            CircuitGate::Probe => {
                tracing::info!(path = %path, "Issuing half-open probe request");
            }
            CircuitGate::Blocked => {
                if let Some(cache) = &self.cache {
                    if let Some(hit) = cache.get(&cache_key).await {
                        tracing::info!(key = %cache_key, "Circuit open, serving cached result");
                        return Ok(hit);
                    }
                }
                tracing::warn!(key = %cache_key, "Circuit open, no cached fallback");
                return Err(MetaError::CircuitOpen);
            }
        }

        let url = format!("{}/{}", self.base_url, path);
        let max_retries = self.config.max_retries;

        for attempt in 0..max_retries {
            self.wait_for_token().await?;

            let permit = self
                .limiter
                .acquire(self.config.token_acquire_timeout())
                .await
                .ok_or_else(|| MetaError::RateLimitWaitTimeout {
                    waited_ms: self.config.token_acquire_timeout().as_millis() as u64,
                })?;

            self.mark_request_started();
            let send_result = self
                .http_client
                .get(&url)
                .query(params)
                .query(&[("api_key", self.api_key.as_str())])
                .send()
                .await;

            match send_result {
                Err(e) => {
                    drop(permit);
                    self.health.record_failure(false);
                    if attempt + 1 >= max_retries {
                        return Err(MetaError::Network(e.to_string()));
                    }
                    let wait = BackoffPolicy::exponential(attempt);
                    tracing::debug!(
                        error = %e,
                        attempt = attempt,
                        wait_seconds = wait.as_secs(),
                        "Connection error, backing off before retry"
                    );
                    tokio::time::sleep(wait).await;
                }
                Ok(response) => {
                    let status = response.status();

                    if status.as_u16() == 429 {
                        let hint = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        drop(permit);

                        let state = self.health.record_failure(true);
                        if attempt + 1 >= max_retries {
                            return Err(MetaError::RateLimitExhausted {
                                attempts: max_retries,
                            });
                        }

                        let wait = state.floor_throttle_wait(self.backoff.compute_wait(
                            attempt,
                            hint.as_deref(),
                            Utc::now(),
                        ));
                        tracing::info!(
                            attempt = attempt,
                            retry_after = hint.as_deref().unwrap_or("-"),
                            wait_ms = wait.as_millis() as u64,
                            "Provider throttled request, backing off"
                        );
                        tokio::time::sleep(wait).await;
                    } else if !status.is_success() {
                        // Terminal for this call; transport-level retry
                        // of transient 5xx belongs to the provider edge
                        self.health.record_failure(false);
                        let message = response.text().await.unwrap_or_default();
                        return Err(MetaError::RequestFailed {
                            status: status.as_u16(),
                            message,
                        });
                    } else {
                        let parsed = response.json::<Value>().await;
                        drop(permit);

                        match parsed {
                            Ok(payload) => {
                                self.health.record_success();
                                if let Some(cache) = &self.cache {
                                    cache.set(&cache_key, payload.clone(), CACHE_WARM_TTL).await;
                                }
                                return Ok(payload);
                            }
                            Err(e) => {
                                // The attempt itself was a 2xx: the
                                // provider is healthy, only the body is
                                // unusable. Counts as a success in the
                                // ledger; the caller still sees the
                                // parse error.
                                self.health.record_success();
                                return Err(MetaError::Parse(e.to_string()));
                            }
                        }
                    }
                }
            }
        }

        // Every continuing branch above checks the attempt budget
        Err(MetaError::RateLimitExhausted {
            attempts: max_retries,
        })
    }

    /// Block until a token is available, bounded by
    /// `token_acquire_timeout`. The bucket itself never sleeps.
    async fn wait_for_token(&self) -> Result<()> {
        let timeout = self.config.token_acquire_timeout();
        let deadline = Instant::now() + timeout;

        loop {
            if self.bucket.consume(1.0) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Token bucket starved past acquire timeout"
                );
                return Err(MetaError::RateLimitWaitTimeout {
                    waited_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(TOKEN_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Stats snapshot across bucket, limiter, and health ledger.
    pub fn stats(&self) -> ClientStats {
        let health = self.health.snapshot();
        ClientStats {
            tokens_available: self.bucket.tokens_available(),
            permits_available: self.limiter.permits_available(),
            total_requests: health.total_requests,
            failure_count: health.failure_count,
            failure_rate: health.failure_rate,
            circuit_state: health.state,
            circuit_opened_at: health.circuit_opened_at,
            last_request_timestamp: *self
                .last_request
                .lock()
                .expect("last request lock poisoned"),
        }
    }

    /// Force the breaker and all counters back to NORMAL/zero and the
    /// bucket to capacity. Operational escape hatch; tests use it to
    /// establish known starting states.
    pub fn reset(&self) {
        self.health.reset();
        self.bucket.refill_to_capacity();
        *self
            .last_request
            .lock()
            .expect("last request lock poisoned") = None;
        tracing::info!("Metadata client state reset");
    }

    fn mark_request_started(&self) {
        *self
            .last_request
            .lock()
            .expect("last request lock poisoned") = Some(Utc::now());
    }

    /// Cache key for one call. The credential is deliberately excluded
    /// so cached entries never embed the API key.
    fn cache_key(path: &str, params: &[(&str, String)]) -> String {
        if params.is_empty() {
            return path.to_string();
        }
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        format!("{}?{}", path, query.join("&"))
    }
}
