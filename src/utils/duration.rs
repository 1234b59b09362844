// Parsing for the `--every` and `--daily` schedule arguments.
use chrono::NaiveTime;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::errors::{BackupError, Result};

static DURATION_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|ms|s|m|h))+$")
        .expect("duration pattern is valid")
});

static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|ms|s|m|h)").expect("duration part pattern is valid")
});

/// Parses a duration such as `1h30m`, `45s`, `1.5h` or `250ms`.
///
/// Every number needs a unit. Negative and zero durations are rejected since
/// they make no sense as a schedule interval.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() || !DURATION_FULL.is_match(s) {
        return Err(BackupError::Config(format!(
            "invalid duration {input:?} (expected e.g. 1h, 30m, 1h30m, 45s)"
        )));
    }

    let mut nanos: f64 = 0.0;
    for caps in DURATION_PART.captures_iter(s) {
        let value: f64 = caps[1]
            .parse()
            .map_err(|_| BackupError::Config(format!("invalid number in duration {input:?}")))?;
        let unit_nanos = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => unreachable!("unit alternatives are fixed by the pattern"),
        };
        nanos += value * unit_nanos;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(BackupError::Config(format!("duration {input:?} is too large")));
    }
    let duration = Duration::from_nanos(nanos.round() as u64);
    if duration.is_zero() {
        return Err(BackupError::Config(format!(
            "duration {input:?} must be greater than zero"
        )));
    }
    Ok(duration)
}

/// Parses a 24-hour `HH:MM` wall-clock time.
pub fn parse_daily_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|e| {
        BackupError::Config(format!("invalid time {input:?} for daily schedule (expected HH:MM): {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_single_units() {
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(30 * 60));
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(24 * 3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_duration_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2m0.5s").unwrap(), Duration::from_millis(120_500));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for bad in ["", "10", "h", "1d", "-5m", "1h 30m", "abc"] {
            assert!(parse_duration(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_duration_rejects_zero() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("0h0m").is_err());
    }

    #[test]
    fn test_parse_daily_time() {
        assert_eq!(
            parse_daily_time("09:00").unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            parse_daily_time("23:59").unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap()
        );
        assert!(parse_daily_time("24:00").is_err());
        assert!(parse_daily_time("9am").is_err());
        assert!(parse_daily_time("").is_err());
    }
}
