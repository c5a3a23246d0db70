use std::time::Duration;

use chrono::{DateTime, Utc};

/// Interpret a `Retry-After` header value relative to `now`.
///
/// Accepts delta-seconds or an HTTP date. Zero, past dates and unparseable
/// values yield `None`, leaving the decision to the backoff policy.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return (secs > 0).then(|| Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok().filter(|d| !d.is_zero())
}
