//! Retry timing for throttled and failed Drive requests
//!
//! Drive answers quota exhaustion with 429 (sometimes 403 `rateLimitExceeded`)
//! and transient faults with 5xx. Throttled responses carry an optional
//! `Retry-After` header; everything else uses exponential backoff.

use std::time::Duration;

use tracing::warn;

/// Base delay for exponential backoff
const BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for a single backoff sleep
const MAX_DELAY: Duration = Duration::from_secs(32);

/// Longest `Retry-After` honoured from an HTTP-date header
const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Parses a `Retry-After` header value
///
/// Accepts delta-seconds (`"30"`) or an HTTP-date. Anything unparseable,
/// or a date in the past, yields `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Some(secs) = (target - now)
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= MAX_RETRY_AFTER_SECS)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Delay before retry number `attempt` (0-based): 0.5s, 1s, 2s, ... capped at 32s
pub fn backoff_delay(attempt: u32) -> Duration {
    BASE_DELAY
        .checked_mul(2u32.saturating_pow(attempt))
        .map_or(MAX_DELAY, |d| d.min(MAX_DELAY))
}
