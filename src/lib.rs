//! # PostgreSQL Driver Benchmark Harness
//!
//! A load-generation benchmark harness measuring the throughput and latency
//! of query execution against a PostgreSQL server, abstracted over
//! interchangeable client-driver backends.
//!
//! ## Supported Backends
//!
//! - **tokio-postgres**: asynchronous driver; workers run as cooperatively
//!   scheduled tasks sharing one timeline
//! - **postgres**: synchronous driver; workers run on a pool of exactly
//!   `concurrency` OS threads
//!
//! Both backends sit behind one driver adapter contract, so the benchmark
//! core is agnostic to which was selected and the two concurrency models
//! produce identically shaped results.
//!
//! ## Architecture Overview
//!
//! - `cli`: command-line surface and run configuration
//! - `job`: benchmark job description, COPY grammar, workload compilation
//! - `driver`: the adapter contract and the backend registry
//! - `worker`: per-connection sample loops and the two scheduling models
//! - `runner`: run lifecycle (validate, setup, warmup, measure, teardown)
//! - `histogram`: fixed-resolution latency accumulator
//! - `report`: result aggregation and text/JSON output
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use pgdriver_bench::{driver, JobDescription, RunConfig, Runner};
//! use pgdriver_bench::cli::{DriverKind, OutputFormat};
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let job = JobDescription::from_json(r#"{"query": "SELECT 1"}"#)?;
//! let config = RunConfig {
//!     concurrency: 10,
//!     duration: Duration::from_secs(30),
//!     timeout: Duration::from_secs(2),
//!     warmup: Duration::from_secs(5),
//!     output_format: OutputFormat::Text,
//! };
//! let adapter = driver::select(DriverKind::TokioPostgres);
//! let report = Runner::new(config, Default::default(), adapter, job)
//!     .run()
//!     .await?;
//! println!("{} queries", report.queries);
//! # Ok(())
//! # }
//! ```

/// Command-line interface and run configuration
pub mod cli;

/// Driver adapter contract, backend implementations and registry
pub mod driver;

/// Error taxonomy for a benchmark run
pub mod error;

/// Fixed-resolution latency histogram
pub mod histogram;

/// Benchmark job description and workload compilation
pub mod job;

/// Colorized stderr diagnostics formatter
pub mod logging;

/// Typed query parameters (JSON to wire values and COPY text fields)
pub mod params;

/// Result aggregation and report output
pub mod report;

/// Run orchestration and release discipline
pub mod runner;

/// Sample loops and the two scheduling models
pub mod worker;

pub use cli::{Args, DriverKind, OutputFormat, RunConfig};
pub use driver::{AdapterSelection, ConcurrencyModel, TargetConfig};
pub use error::{BenchError, BenchResult};
pub use histogram::LatencyHistogram;
pub use job::JobDescription;
pub use report::BenchmarkReport;
pub use runner::Runner;
pub use worker::WorkerResult;

/// The current version of the benchmark harness, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values.
///
/// These mirror the documented command-line defaults; the CLI layer is the
/// only consumer, but they live here so library users get the same run
/// shape without parsing arguments.
pub mod defaults {
    /// Default number of concurrent connections.
    ///
    /// Ten connections keep a single-node server busy without saturating
    /// the client machine, which would shift the measurement from the
    /// driver under test to the harness itself.
    pub const CONCURRENCY: usize = 10;

    /// Default measured-pass duration in seconds.
    pub const DURATION_SECS: u64 = 30;

    /// Default per-request latency ceiling in seconds.
    ///
    /// Sizes the histogram: the ceiling expressed in hundredths of a
    /// millisecond is the bucket count. Samples past it are clamped and
    /// reported as a sizing problem rather than recorded out of range.
    pub const TIMEOUT_SECS: u64 = 2;

    /// Default warmup duration in seconds.
    ///
    /// A short discarded pass lets connection state, caches and the
    /// server's buffers settle before measurement begins.
    pub const WARMUP_SECS: u64 = 5;
}
