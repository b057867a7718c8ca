//! Token bucket rate limiter
//!
//! Bounds the outbound call pace to the metadata provider. The bucket
//! never sleeps; `consume` answers immediately and waiting is the
//! caller's job, bounded by `token_acquire_timeout`. A single mutex
//! serializes all callers.

use std::sync::Mutex;
use std::time::Instant;

struct BucketState {
    tokens_available: f64,
    last_refill_at: Instant,
}

/// Token bucket with lazy refill
///
/// Tokens accumulate at `refill_rate` per second up to `capacity` and
/// are recomputed on every `consume`, so an idle bucket costs nothing.
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a bucket that starts full.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens_available: capacity,
                last_refill_at: Instant::now(),
            }),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Take `cost` tokens if available. Returns false without blocking
    /// when the bucket is too empty.
    pub fn consume(&self, cost: f64) -> bool {
        self.consume_at(cost, Instant::now())
    }

    /// Current token count after a refill pass, for the stats snapshot.
    pub fn tokens_available(&self) -> f64 {
        let mut state = self.state.lock().expect("token bucket lock poisoned");
        Self::refill(&mut state, self.capacity, self.refill_rate, Instant::now());
        state.tokens_available
    }

    /// Refill to capacity immediately. Used by `reset()` to establish a
    /// known starting state.
    pub fn refill_to_capacity(&self) {
        let mut state = self.state.lock().expect("token bucket lock poisoned");
        state.tokens_available = self.capacity;
        state.last_refill_at = Instant::now();
    }

    /// Time-injected consume so tests can advance a simulated clock.
    /// `now` values must be monotonically non-decreasing per bucket.
    pub(crate) fn consume_at(&self, cost: f64, now: Instant) -> bool {
        let mut state = self.state.lock().expect("token bucket lock poisoned");
        Self::refill(&mut state, self.capacity, self.refill_rate, now);

        if state.tokens_available >= cost {
            state.tokens_available -= cost;
            true
        } else {
            false
        }
    }

    fn refill(state: &mut BucketState, capacity: f64, refill_rate: f64, now: Instant) {
        // saturating_duration_since: a stale `now` (clock race between
        // callers) must not produce a negative elapsed
        let elapsed = now.saturating_duration_since(state.last_refill_at);
        if elapsed.as_secs_f64() > 0.0 {
            let refilled = state.tokens_available + elapsed.as_secs_f64() * refill_rate;
            state.tokens_available = refilled.min(capacity);
            state.last_refill_at = now;
        }
    }
}
