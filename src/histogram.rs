//! Fixed-resolution latency histogram.
//!
//! Latencies are recorded in hundredths of a millisecond: bucket `i` counts
//! samples whose rounded latency is `i / 100` ms. The bucket count is derived
//! from the per-request timeout (`--timeout`), so the last bucket sits at the
//! timeout ceiling. Every worker owns one histogram; the aggregator merges
//! them element-wise into the report's `latency_stats` array.

use std::time::Duration;

/// Histogram buckets per millisecond of latency.
pub const BUCKETS_PER_MS: u64 = 100;

/// Fixed-bucket latency accumulator with running min/max.
///
/// Samples past the configured ceiling are clamped into the last bucket and
/// counted separately rather than written out of bounds; the overflow count
/// is a sizing signal (the timeout is too small for the observed workload),
/// not a fatal condition. Min/max always track the true, unclamped value.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    buckets: Vec<u64>,
    min: f64,
    max: f64,
    overflows: u64,
}

impl LatencyHistogram {
    /// Create a histogram sized for the given per-request timeout.
    pub fn for_timeout(timeout: Duration) -> Self {
        Self::with_buckets(timeout.as_millis() as usize * BUCKETS_PER_MS as usize)
    }

    /// Create a histogram with an explicit bucket count.
    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            buckets: vec![0; buckets.max(1)],
            min: f64::INFINITY,
            max: 0.0,
            overflows: 0,
        }
    }

    /// Rebuild a histogram view over an existing bucket array (quantile
    /// lookups on an already-aggregated report).
    pub fn from_buckets(buckets: Vec<u64>) -> Self {
        let min = buckets
            .iter()
            .position(|&count| count > 0)
            .map_or(f64::INFINITY, |i| i as f64);
        let max = buckets
            .iter()
            .rposition(|&count| count > 0)
            .map_or(0.0, |i| i as f64);
        Self {
            buckets,
            min,
            max,
            overflows: 0,
        }
    }

    /// Record one sample.
    pub fn record(&mut self, elapsed: Duration) {
        let units = (elapsed.as_secs_f64() * 1_000.0 * BUCKETS_PER_MS as f64).round();

        if units < self.min {
            self.min = units;
        }
        if units > self.max {
            self.max = units;
        }

        let mut index = units as usize;
        if index >= self.buckets.len() {
            self.overflows += 1;
            index = self.buckets.len() - 1;
        }
        self.buckets[index] += 1;
    }

    /// Element-wise sum of another histogram into this one.
    ///
    /// Both sides are sized from the same run configuration; the bucket
    /// counts always match by construction.
    pub fn merge(&mut self, other: &LatencyHistogram) {
        debug_assert_eq!(self.buckets.len(), other.buckets.len());
        for (bucket, count) in self.buckets.iter_mut().zip(&other.buckets) {
            *bucket += count;
        }
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.overflows += other.overflows;
    }

    /// Total number of recorded samples.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Smallest recorded latency, in hundredths of a millisecond.
    /// Infinite when nothing has been recorded.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest recorded latency, in hundredths of a millisecond.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Samples that exceeded the timeout ceiling and were clamped.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    pub fn into_buckets(self) -> Vec<u64> {
        self.buckets
    }

    /// Latency in milliseconds at the given quantile, at bucket resolution.
    ///
    /// Returns `None` for an empty histogram.
    pub fn value_at_quantile(&self, quantile: f64) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let rank = (quantile.clamp(0.0, 1.0) * total as f64).ceil().max(1.0) as u64;
        let mut seen = 0u64;
        for (index, count) in self.buckets.iter().enumerate() {
            seen += count;
            if seen >= rank {
                return Some(index as f64 / BUCKETS_PER_MS as f64);
            }
        }
        None
    }
}
