//! Host resource sampling for the periodic stats broadcast.

use systemstat::{Platform, System};

use crate::error::{TelemetryError, TelemetryResult};

const MIB: f64 = 1024.0 * 1024.0;

/// Memory utilisation at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    /// Used memory as a percentage of total.
    pub used_percent: f64,
    /// Used memory in MiB.
    pub used_mib: f64,
    /// Total memory in MiB.
    pub total_mib: f64,
}

impl MemorySample {
    /// Build a sample from raw byte counts, rounding to one decimal place.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_bytes(total: u64, free: u64) -> Self {
        let used = total.saturating_sub(free);
        let used_percent = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };
        Self {
            used_percent: round1(used_percent),
            used_mib: round1(used as f64 / MIB),
            total_mib: round1(total as f64 / MIB),
        }
    }
}

/// Source of memory samples; the real host or a test double.
pub trait MemorySampler: Send + Sync {
    /// Take a sample.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform cannot report memory statistics.
    fn sample(&self) -> TelemetryResult<MemorySample>;
}

/// Sampler backed by `systemstat`.
pub struct HostMemorySampler {
    system: System,
}

impl HostMemorySampler {
    /// Create a sampler for the current host.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for HostMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for HostMemorySampler {
    fn sample(&self) -> TelemetryResult<MemorySample> {
        let memory = self
            .system
            .memory()
            .map_err(|source| TelemetryError::HostSample {
                resource: "memory",
                source,
            })?;
        Ok(MemorySample::from_bytes(
            memory.total.as_u64(),
            memory.free.as_u64(),
        ))
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_rounded_to_one_decimal() {
        let total = 8 * 1024 * 1024 * 1024_u64;
        let free = 5 * 1024 * 1024 * 1024_u64;
        let sample = MemorySample::from_bytes(total, free);
        assert!((sample.used_percent - 37.5).abs() < f64::EPSILON);
        assert!((sample.used_mib - 3_072.0).abs() < f64::EPSILON);
        assert!((sample.total_mib - 8_192.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_total_reports_zero_percent() {
        let sample = MemorySample::from_bytes(0, 0);
        assert!(sample.used_percent.abs() < f64::EPSILON);
    }
}
