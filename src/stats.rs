//! Client statistics snapshot
//!
//! Point-in-time view over the bucket, limiter, and health ledger.
//! Serialized as-is into the diagnostics endpoint of the importing
//! service, so field names are part of the operational surface.

use crate::health::CircuitState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observability snapshot for one metadata client
#[derive(Debug, Clone, Serialize)]
pub struct ClientStats {
    /// Tokens currently in the bucket
    pub tokens_available: f64,
    /// Concurrency permits not in use
    pub permits_available: usize,
    /// Completed physical attempts since construction or reset
    pub total_requests: u64,
    /// Attempts with a non-2xx terminal outcome
    pub failure_count: u64,
    /// failure_count / total_requests, 0.0 when no requests yet
    pub failure_rate: f64,
    /// Circuit breaker state
    pub circuit_state: CircuitState,
    /// When the circuit last opened; null unless OPEN
    pub circuit_opened_at: Option<DateTime<Utc>>,
    /// Wall-clock time of the most recent physical attempt
    pub last_request_timestamp: Option<DateTime<Utc>>,
}
