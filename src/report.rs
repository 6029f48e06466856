//! Result aggregation and report output.
//!
//! Aggregation is a pure fold over per-worker results: counts are summed,
//! histograms merged element-wise, min/max taken globally. The fold is
//! deterministic, associative and commutative — merge order never affects
//! the report, and the tests hold it to that.

use crate::cli::OutputFormat;
use crate::histogram::LatencyHistogram;
use crate::worker::WorkerResult;
use colored::Colorize;
use serde::Serialize;
use std::time::Duration;

/// Running aggregate of worker results.
#[derive(Debug, Clone)]
pub struct RunTotals {
    pub queries: u64,
    pub rows: u64,
    pub histogram: LatencyHistogram,
    pub min_latency: f64,
    pub max_latency: f64,
}

impl RunTotals {
    pub fn new(timeout: Duration) -> Self {
        Self {
            queries: 0,
            rows: 0,
            histogram: LatencyHistogram::for_timeout(timeout),
            min_latency: f64::INFINITY,
            max_latency: 0.0,
        }
    }

    /// Fold one worker's result into the aggregate.
    pub fn absorb(&mut self, result: &WorkerResult) {
        self.queries += result.queries;
        self.rows += result.rows;
        self.histogram.merge(&result.histogram);
        if result.min_latency < self.min_latency {
            self.min_latency = result.min_latency;
        }
        if result.max_latency > self.max_latency {
            self.max_latency = result.max_latency;
        }
    }

    /// Combine two partial aggregates.
    pub fn merge(&mut self, other: &RunTotals) {
        self.queries += other.queries;
        self.rows += other.rows;
        self.histogram.merge(&other.histogram);
        if other.min_latency < self.min_latency {
            self.min_latency = other.min_latency;
        }
        if other.max_latency > self.max_latency {
            self.max_latency = other.max_latency;
        }
    }

    pub fn from_results(results: &[WorkerResult], timeout: Duration) -> Self {
        let mut totals = Self::new(timeout);
        for result in results {
            totals.absorb(result);
        }
        totals
    }
}

/// Terminal artifact of a benchmark run. Written out once.
///
/// Latency fields are in hundredths of a millisecond, matching the
/// histogram's bucket unit; `duration` is in seconds.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub queries: u64,
    pub rows: u64,
    pub duration: f64,
    pub min_latency: f64,
    pub max_latency: f64,
    pub latency_stats: Vec<u64>,
    pub output_format: String,
}

impl BenchmarkReport {
    pub fn assemble(totals: RunTotals, wall: Duration, format: OutputFormat) -> Self {
        Self {
            queries: totals.queries,
            rows: totals.rows,
            duration: wall.as_secs_f64(),
            min_latency: totals.min_latency,
            max_latency: totals.max_latency,
            latency_stats: totals.histogram.into_buckets(),
            output_format: format.to_string(),
        }
    }

    /// Print the report to stdout in the configured format.
    pub fn print(&self) -> anyhow::Result<()> {
        match self.output_format.as_str() {
            "json" => println!("{}", serde_json::to_string(self)?),
            _ => self.print_text(),
        }
        Ok(())
    }

    fn print_text(&self) {
        let histogram = LatencyHistogram::from_buckets(self.latency_stats.clone());
        let per_second = |count: u64| {
            if self.duration > 0.0 {
                count as f64 / self.duration
            } else {
                0.0
            }
        };

        println!("{}", "─── benchmark report ───".bold().cyan());
        println!(
            "  queries:   {} ({:.1}/s)",
            self.queries,
            per_second(self.queries)
        );
        println!("  rows:      {} ({:.1}/s)", self.rows, per_second(self.rows));
        println!("  duration:  {:.2}s", self.duration);
        println!(
            "  latency:   min {}  p50 {}  p95 {}  p99 {}  max {}",
            format_hundredths(self.min_latency),
            format_quantile(&histogram, 0.50),
            format_quantile(&histogram, 0.95),
            format_quantile(&histogram, 0.99),
            format_hundredths(self.max_latency),
        );
    }
}

fn format_hundredths(units: f64) -> String {
    if units.is_finite() {
        format!("{:.2}ms", units / 100.0)
    } else {
        "-".to_string()
    }
}

fn format_quantile(histogram: &LatencyHistogram, quantile: f64) -> String {
    match histogram.value_at_quantile(quantile) {
        Some(ms) => format!("{ms:.2}ms"),
        None => "-".to_string(),
    }
}
