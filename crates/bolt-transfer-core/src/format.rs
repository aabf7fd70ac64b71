//! Human readable progress strings.

use std::time::Duration;

/// ETA rendered when the remaining time cannot be estimated.
pub const UNKNOWN_ETA: &str = "--";

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Render a byte rate as `B/s`, `KB/s`, or `MB/s` with one decimal.
#[must_use]
pub fn format_speed(bytes_per_second: f64) -> String {
    let rate = if bytes_per_second.is_finite() {
        bytes_per_second.max(0.0)
    } else {
        0.0
    };
    if rate < KIB {
        format!("{rate:.1} B/s")
    } else if rate < MIB {
        format!("{:.1} KB/s", rate / KIB)
    } else {
        format!("{:.1} MB/s", rate / MIB)
    }
}

/// Render a duration as `H:MM:SS` when at least an hour, otherwise `MM:SS`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3_600, (total % 3_600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Estimate the remaining time for a transfer.
///
/// Returns [`UNKNOWN_ETA`] when the total is unknown, the rate is not positive,
/// or the estimate does not fit in a [`Duration`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_eta(done: u64, total: u64, bytes_per_second: f64) -> String {
    if total == 0 || !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return UNKNOWN_ETA.to_string();
    }
    let remaining = total.saturating_sub(done) as f64;
    Duration::try_from_secs_f64(remaining / bytes_per_second)
        .map_or_else(|_| UNKNOWN_ETA.to_string(), format_duration)
}

/// Completion percentage, clamped to `[0, 100]`; zero when the total is unknown.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64 * 100.0).min(100.0)
}
