//! Human readable durations.

/// Shown instead of a duration when no estimate is available.
pub const INFINITY_SYMBOL: &str = "∞";

const SECOND: u64 = 1_000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Turns a millisecond count into a short string.
pub trait DurationFormatter {
    /// Format `millis` milliseconds.
    fn format(&self, millis: f64) -> String;
}

/// Duration formatter using `y d h m s ms` units.
///
/// Seconds are floored and sub-second values are shown in milliseconds, so
/// `61_500.0` becomes `1m 1s` (or `1m` when compact) and `250.0` becomes
/// `250ms`. Zero units are skipped; a zero duration is `0ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrettyDuration {
    /// Keep only the largest unit
    pub compact: bool,
}

impl PrettyDuration {
    /// Largest unit only, e.g. `1m`.
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Every non-zero unit, e.g. `1m 10s`.
    pub fn verbose() -> Self {
        Self { compact: false }
    }
}

impl Default for PrettyDuration {
    fn default() -> Self {
        Self::compact()
    }
}

impl DurationFormatter for PrettyDuration {
    fn format(&self, millis: f64) -> String {
        if !millis.is_finite() {
            return INFINITY_SYMBOL.to_string();
        }

        let sign = if millis < 0.0 { "-" } else { "" };
        let millis = millis.abs();
        let whole = millis.trunc() as u64;
        let days = whole / DAY;

        let mut parts = Vec::new();
        push_unit(&mut parts, days / 365, "y");
        push_unit(&mut parts, days % 365, "d");
        push_unit(&mut parts, whole / HOUR % 24, "h");
        push_unit(&mut parts, whole / MINUTE % 60, "m");
        if millis < SECOND as f64 {
            let rounded = if millis >= 1.0 { millis.round() } else { millis.ceil() };
            push_unit(&mut parts, rounded as u64, "ms");
        } else {
            push_unit(&mut parts, whole / SECOND % 60, "s");
        }

        match parts.first() {
            None => "0ms".to_string(),
            Some(first) if self.compact => format!("{sign}{first}"),
            Some(_) => format!("{sign}{}", parts.join(" ")),
        }
    }
}

fn push_unit(parts: &mut Vec<String>, value: u64, unit: &str) {
    if value > 0 {
        parts.push(format!("{value}{unit}"));
    }
}
