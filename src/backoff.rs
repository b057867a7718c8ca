//! Backoff wait computation
//!
//! Pure decision layer for the retry loop: both 429 Retry-After hints
//! and connection-error exponential backoff funnel through here so the
//! driver never duplicates sleep logic. `now` is injected, so no test
//! ever has to sleep to exercise a schedule.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Wait applied when a Retry-After hint is present but unparsable
const UNPARSABLE_HINT_WAIT: Duration = Duration::from_secs(5);

/// Largest exponent fed into the 2^attempt schedule. max_retries is
/// validated well below this; the cap only guards the shift.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Computes inter-retry waits from server hints or an exponential schedule
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    respect_retry_after: bool,
}

impl BackoffPolicy {
    pub fn new(respect_retry_after: bool) -> Self {
        Self { respect_retry_after }
    }

    /// Wait before retry number `attempt` (0-based).
    ///
    /// A parsable Retry-After hint wins when `respect_retry_after` is
    /// set: digit values are seconds, HTTP-date values become the delta
    /// to that instant clamped at zero. A hint that parses as neither
    /// yields a fixed 5 second wait. With no hint (or the flag off) the
    /// schedule is 2^attempt seconds.
    pub fn compute_wait(
        &self,
        attempt: u32,
        server_hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> Duration {
        if self.respect_retry_after {
            if let Some(hint) = server_hint {
                return Self::parse_hint(hint, now);
            }
        }
        Self::exponential(attempt)
    }

    /// The connection-error schedule: 2^attempt seconds, no hint input.
    pub fn exponential(attempt: u32) -> Duration {
        Duration::from_secs(1u64 << attempt.min(MAX_BACKOFF_EXPONENT))
    }

    fn parse_hint(hint: &str, now: DateTime<Utc>) -> Duration {
        let hint = hint.trim();

        // Integer seconds is the common provider form
        if let Ok(seconds) = hint.parse::<u64>() {
            return Duration::from_secs(seconds);
        }

        // HTTP-date form: "Tue, 01 Jan 2030 00:00:05 GMT"
        if let Ok(at) = DateTime::parse_from_rfc2822(hint) {
            let delta = at.with_timezone(&Utc) - now;
            return match delta.to_std() {
                Ok(wait) => wait,
                // Hint already in the past
                Err(_) => Duration::ZERO,
            };
        }

        tracing::warn!(hint = %hint, "Unparsable Retry-After hint, using default wait");
        UNPARSABLE_HINT_WAIT
    }
}
