//! Circuit breaker health monitor
//!
//! Tracks rolling success/failure counts for one metadata client and
//! drives the NORMAL / THROTTLED / COOLING_DOWN / OPEN state machine.
//! All transitions are linearized through one mutex, so a caller that
//! observes OPEN never partially applies NORMAL-path logic.
//!
//! Counting rule: every completed physical attempt increments
//! `total_requests`; every non-2xx terminal outcome increments
//! `failure_count`. Retried 429s count per physical attempt, so
//! sustained throttling accumulates evidence of an unhealthy provider.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Consecutive throttled attempts (no intervening success) that
/// escalate THROTTLED to COOLING_DOWN
const CONSECUTIVE_THROTTLE_LIMIT: u32 = 3;

/// Fixed pause the driver applies on entering COOLING_DOWN, longer than
/// any early exponential step so the client stops oscillating between
/// NORMAL and THROTTLED
pub const COOLING_DOWN_PAUSE: Duration = Duration::from_secs(10);

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls flow normally
    Normal,
    /// Saw a 429; clears on the next success
    Throttled,
    /// Sustained sub-threshold throttling; one longer pause enforced
    CoolingDown,
    /// Failure rate over threshold; live calls suspended
    Open,
}

impl CircuitState {
    /// Wait the driver applies after a throttled attempt: the computed
    /// backoff, floored at the fixed pause while cooling down so the
    /// client actually stops oscillating instead of retrying on an
    /// early exponential step.
    pub fn floor_throttle_wait(self, wait: Duration) -> Duration {
        if self == CircuitState::CoolingDown {
            wait.max(COOLING_DOWN_PAUSE)
        } else {
            wait
        }
    }
}

/// Verdict of the pre-call gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitGate {
    /// Circuit closed, proceed normally
    Proceed,
    /// Circuit open and inside the cool-off window; serve from cache
    /// or fail fast
    Blocked,
    /// Cool-off elapsed; ledger was reset and this call runs as the
    /// half-open probe
    Probe,
}

struct Ledger {
    state: CircuitState,
    total_requests: u64,
    failure_count: u64,
    consecutive_throttles: u32,
    opened_at: Option<Instant>,
    opened_at_utc: Option<DateTime<Utc>>,
}

impl Ledger {
    fn fresh() -> Self {
        Self {
            state: CircuitState::Normal,
            total_requests: 0,
            failure_count: 0,
            consecutive_throttles: 0,
            opened_at: None,
            opened_at_utc: None,
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.failure_count as f64 / self.total_requests as f64
        }
    }
}

/// Point-in-time view of the ledger for the stats snapshot
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub state: CircuitState,
    pub total_requests: u64,
    pub failure_count: u64,
    pub failure_rate: f64,
    pub circuit_opened_at: Option<DateTime<Utc>>,
}

/// Circuit breaker over one remote provider
pub struct HealthMonitor {
    failure_threshold: f64,
    min_samples: u64,
    open_timeout: Duration,
    ledger: Mutex<Ledger>,
}

impl HealthMonitor {
    pub fn new(failure_threshold: f64, min_samples: u64, open_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            min_samples,
            open_timeout,
            ledger: Mutex::new(Ledger::fresh()),
        }
    }

    /// Gate consulted before any live call. When OPEN and the cool-off
    /// has elapsed, resets the ledger and admits the caller as the
    /// half-open probe; reset and admission happen under one lock so
    /// exactly one caller becomes the probe.
    pub fn gate(&self) -> CircuitGate {
        let mut ledger = self.ledger.lock().expect("health ledger lock poisoned");

        if ledger.state != CircuitState::Open {
            return CircuitGate::Proceed;
        }

        let opened_at = match ledger.opened_at {
            Some(at) => at,
            None => {
                // Unreachable by construction; recover rather than wedge
                *ledger = Ledger::fresh();
                return CircuitGate::Proceed;
            }
        };

        if opened_at.elapsed() >= self.open_timeout {
            tracing::info!(
                open_for_seconds = opened_at.elapsed().as_secs(),
                "Circuit cool-off elapsed, admitting half-open probe"
            );
            *ledger = Ledger::fresh();
            CircuitGate::Probe
        } else {
            CircuitGate::Blocked
        }
    }

    /// Record a successful physical attempt. Clears THROTTLED and
    /// COOLING_DOWN back to NORMAL.
    pub fn record_success(&self) -> CircuitState {
        let mut ledger = self.ledger.lock().expect("health ledger lock poisoned");
        ledger.total_requests += 1;
        ledger.consecutive_throttles = 0;

        if matches!(
            ledger.state,
            CircuitState::Throttled | CircuitState::CoolingDown
        ) {
            tracing::debug!(from = ?ledger.state, "Provider recovered, circuit back to NORMAL");
            ledger.state = CircuitState::Normal;
        }

        ledger.state
    }

    /// Record a failed physical attempt. `throttled` marks a 429 as
    /// opposed to a terminal error or connection failure. Returns the
    /// state after the transition so the driver can pick its wait.
    pub fn record_failure(&self, throttled: bool) -> CircuitState {
        let mut ledger = self.ledger.lock().expect("health ledger lock poisoned");
        ledger.total_requests += 1;
        ledger.failure_count += 1;

        if ledger.total_requests >= self.min_samples
            && ledger.failure_rate() >= self.failure_threshold
        {
            if ledger.state != CircuitState::Open {
                tracing::warn!(
                    total_requests = ledger.total_requests,
                    failure_count = ledger.failure_count,
                    failure_rate = ledger.failure_rate(),
                    "Failure rate over threshold, opening circuit"
                );
                ledger.state = CircuitState::Open;
                ledger.opened_at = Some(Instant::now());
                ledger.opened_at_utc = Some(Utc::now());
            }
            return ledger.state;
        }

        if throttled {
            ledger.consecutive_throttles += 1;
            match ledger.state {
                CircuitState::Normal => {
                    ledger.state = CircuitState::Throttled;
                }
                CircuitState::Throttled
                    if ledger.consecutive_throttles >= CONSECUTIVE_THROTTLE_LIMIT =>
                {
                    tracing::info!(
                        consecutive_throttles = ledger.consecutive_throttles,
                        "Sustained throttling, entering COOLING_DOWN"
                    );
                    ledger.state = CircuitState::CoolingDown;
                }
                _ => {}
            }
        }

        ledger.state
    }

    pub fn state(&self) -> CircuitState {
        self.ledger
            .lock()
            .expect("health ledger lock poisoned")
            .state
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let ledger = self.ledger.lock().expect("health ledger lock poisoned");
        HealthSnapshot {
            state: ledger.state,
            total_requests: ledger.total_requests,
            failure_count: ledger.failure_count,
            failure_rate: ledger.failure_rate(),
            circuit_opened_at: ledger.opened_at_utc,
        }
    }

    /// Force the breaker back to NORMAL with zeroed counters.
    pub fn reset(&self) {
        let mut ledger = self.ledger.lock().expect("health ledger lock poisoned");
        *ledger = Ledger::fresh();
    }

    /// Backdate an open circuit so tests can cross the cool-off window
    /// without sleeping.
    #[cfg(test)]
    pub(crate) fn backdate_open(&self, age: Duration) {
        let mut ledger = self.ledger.lock().expect("health ledger lock poisoned");
        if let Some(at) = ledger.opened_at {
            ledger.opened_at = at.checked_sub(age).or(Some(at));
        }
    }
}
