use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ring_buffer::RingBuffer;
use crate::error::{MonitorError, Result};

// ─── Time units ──────────────────────────────────────────────────

/// Unit a monitor reports its average in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    #[default]
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    const fn nanos_per_unit(self) -> u64 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
        }
    }

    /// Converts a nanosecond count into this unit, truncating.
    pub const fn from_nanos(self, nanos: u64) -> u64 {
        nanos / self.nanos_per_unit()
    }

    /// Short suffix used in formatted attribute values.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for TimeUnit {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ns" | "nanos" | "nanoseconds" => Ok(Self::Nanoseconds),
            "us" | "µs" | "micros" | "microseconds" => Ok(Self::Microseconds),
            "ms" | "millis" | "milliseconds" => Ok(Self::Milliseconds),
            "s" | "secs" | "seconds" => Ok(Self::Seconds),
            other => Err(MonitorError::InvalidConfiguration(format!(
                "unknown time unit '{other}'"
            ))),
        }
    }
}

// ─── LatencyMonitor ──────────────────────────────────────────────

/// Rolling average over the last N call durations of one call-site.
///
/// Samples go in as nanoseconds; `average()` comes out in the configured unit.
#[derive(Debug)]
pub struct LatencyMonitor {
    samples: RingBuffer<u64>,
    unit: TimeUnit,
}

impl LatencyMonitor {
    pub fn new(sample_size: usize, unit: TimeUnit) -> Result<Self> {
        Ok(Self {
            samples: RingBuffer::new(sample_size)?,
            unit,
        })
    }

    pub fn with_capacity(sample_size: NonZeroUsize, unit: TimeUnit) -> Self {
        Self {
            samples: RingBuffer::with_capacity(sample_size),
            unit,
        }
    }

    /// Records one call duration in nanoseconds.
    pub fn add_sample(&self, duration_nanos: u64) {
        self.samples.add(duration_nanos);
    }

    /// Average over the whole buffer, in nanoseconds.
    ///
    /// The sum of populated slots is divided by the buffer capacity, not by
    /// the number of samples, so a buffer that has not filled up yet reports
    /// a value biased toward zero.
    pub fn average_nanos(&self) -> u64 {
        let snapshot = self.samples.snapshot();
        if snapshot.is_empty() {
            return 0;
        }

        let total: u128 = snapshot.iter().flatten().map(|&d| u128::from(d)).sum();
        (total / snapshot.len() as u128) as u64
    }

    /// Average in the configured unit, truncated.
    pub fn average(&self) -> u64 {
        self.unit.from_nanos(self.average_nanos())
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn sample_size(&self) -> usize {
        self.samples.capacity()
    }

    /// Total samples ever recorded, evicted ones included.
    pub fn samples_recorded(&self) -> u64 {
        self.samples.total_written()
    }

    /// Retained samples in nanoseconds, oldest first.
    pub fn recent_samples(&self) -> Vec<u64> {
        self.samples.ordered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_monitor_averages_zero() {
        let monitor = LatencyMonitor::new(10, TimeUnit::Milliseconds).unwrap();
        assert_eq!(monitor.average(), 0);
        assert_eq!(monitor.average_nanos(), 0);
    }

    #[test]
    fn full_buffer_of_one_millisecond() {
        let monitor = LatencyMonitor::new(10, TimeUnit::Milliseconds).unwrap();
        for _ in 0..10 {
            monitor.add_sample(1_000_000);
        }
        assert_eq!(monitor.average(), 1);
    }

    #[test]
    fn average_truncates_on_conversion() {
        let monitor = LatencyMonitor::new(10, TimeUnit::Microseconds).unwrap();
        for v in (100..=1_000).step_by(100) {
            monitor.add_sample(v);
        }
        // sum 5500 ns / 10 = 550 ns → 0 us
        assert_eq!(monitor.average_nanos(), 550);
        assert_eq!(monitor.average(), 0);

        let monitor = LatencyMonitor::new(10, TimeUnit::Milliseconds).unwrap();
        for v in (1..=10u64).map(|i| i * 1_000_000) {
            monitor.add_sample(v);
        }
        // 55_000_000 / 10 = 5_500_000 ns → 5 ms
        assert_eq!(monitor.average(), 5);
    }

    #[test]
    fn warming_buffer_divides_by_capacity() {
        let monitor = LatencyMonitor::new(4, TimeUnit::Nanoseconds).unwrap();
        monitor.add_sample(400);
        assert_eq!(monitor.average(), 100);
    }

    #[test]
    fn only_last_samples_count_after_overflow() {
        let monitor = LatencyMonitor::new(10, TimeUnit::Nanoseconds).unwrap();
        for _ in 0..5 {
            monitor.add_sample(1_000_000);
        }
        for _ in 0..10 {
            monitor.add_sample(10);
        }
        assert_eq!(monitor.average(), 10);
        assert_eq!(monitor.samples_recorded(), 15);
        assert_eq!(monitor.recent_samples(), vec![10; 10]);
    }

    #[test]
    fn large_samples_do_not_overflow_the_sum() {
        let monitor = LatencyMonitor::new(4, TimeUnit::Seconds).unwrap();
        for _ in 0..4 {
            monitor.add_sample(u64::MAX);
        }
        assert_eq!(monitor.average_nanos(), u64::MAX);
    }

    #[test]
    fn time_unit_parses_short_and_long_names() {
        assert_eq!("ms".parse::<TimeUnit>().unwrap(), TimeUnit::Milliseconds);
        assert_eq!("Seconds".parse::<TimeUnit>().unwrap(), TimeUnit::Seconds);
        assert_eq!(" us ".parse::<TimeUnit>().unwrap(), TimeUnit::Microseconds);
        assert!("fortnights".parse::<TimeUnit>().is_err());
    }
}
