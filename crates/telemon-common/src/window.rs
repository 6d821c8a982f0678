//! Trailing time windows.
//!
//! Query surfaces accept windows as short strings (`30s`, `5m`, `1h`,
//! `24h`, `7d`, `all`). Bad input never errors out of the engine: callers
//! fall back to a default and negative durations clamp to zero.

use chrono::{DateTime, Duration, Utc};

/// Window strings advertised to clients.
pub const SUPPORTED_WINDOWS: &[&str] = &["30s", "5m", "1h", "24h", "7d", "all"];

/// Parse `"<n><unit>"` with unit `s|m|h|d`, or `all` for an unbounded window.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use telemon_common::window::parse_window;
///
/// assert_eq!(parse_window("5m"), Some(Duration::minutes(5)));
/// assert_eq!(parse_window("24h"), Some(Duration::hours(24)));
/// assert_eq!(parse_window("all"), Some(Duration::MAX));
/// assert_eq!(parse_window("soon"), None);
/// ```
pub fn parse_window(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Some(Duration::MAX);
    }
    if raw.len() < 2 || !raw.is_ascii() {
        return None;
    }
    let (num, unit) = raw.split_at(raw.len() - 1);
    let n: i64 = num.parse().ok()?;
    if n < 0 {
        return None;
    }
    match unit {
        "s" => Duration::try_seconds(n),
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        _ => None,
    }
}

/// Parse `raw` or fall back to `default`.
pub fn window_or(raw: Option<&str>, default: Duration) -> Duration {
    raw.and_then(parse_window).unwrap_or(default)
}

/// Negative windows clamp to zero.
pub fn clamp_window(window: Duration) -> Duration {
    if window < Duration::zero() {
        Duration::zero()
    } else {
        window
    }
}

/// Duration from a configured number of seconds, saturating at the
/// longest representable duration.
pub fn secs(value: u64) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Like [`secs`] for a number of days.
pub fn days(value: u64) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_days)
        .unwrap_or(Duration::MAX)
}

/// `now + ttl`, saturating at the latest representable instant.
pub fn expires_at(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(clamp_window(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Inclusive start of `[now - window, now]`, saturating at the earliest
/// representable instant for unbounded windows.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(clamp_window(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Window length in minutes for rate calculations; unbounded windows
/// fall back to `span`, the time actually covered by data.
pub fn effective_minutes(window: Duration, span: Duration) -> f64 {
    let window = clamp_window(window);
    let chosen = if window == Duration::MAX { span } else { window };
    (chosen.num_milliseconds() as f64 / 60_000.0).max(1.0 / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_window_clamps_to_now() {
        let now = Utc::now();
        assert_eq!(window_start(now, Duration::seconds(-30)), now);
    }

    #[test]
    fn unbounded_window_does_not_overflow() {
        let now = Utc::now();
        assert_eq!(window_start(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn rejects_unknown_units() {
        assert_eq!(parse_window("10w"), None);
        assert_eq!(parse_window("-5m"), None);
        assert_eq!(parse_window(""), None);
        assert_eq!(window_or(Some("bogus"), Duration::hours(1)), Duration::hours(1));
    }

    #[test]
    fn configured_durations_saturate() {
        assert_eq!(secs(90), Duration::seconds(90));
        assert_eq!(days(7), Duration::days(7));
        assert_eq!(secs(u64::MAX), Duration::MAX);
        assert_eq!(days(u64::MAX), Duration::MAX);

        let now = Utc::now();
        assert_eq!(expires_at(now, secs(30)), now + Duration::seconds(30));
        assert_eq!(expires_at(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
    }
}
