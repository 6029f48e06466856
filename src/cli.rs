use crate::driver::TargetConfig;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// pgdriver-bench - concurrent PostgreSQL driver benchmark
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Driver backend to benchmark
    #[clap(value_enum)]
    pub driver: DriverKind,

    /// Benchmark job JSON file, or '-' to read it from stdin
    pub queryfile: String,

    /// Number of concurrent connections
    #[clap(short = 'C', long, default_value_t = crate::defaults::CONCURRENCY)]
    pub concurrency: usize,

    /// Duration of the measured pass in seconds
    #[clap(short = 'D', long, default_value_t = crate::defaults::DURATION_SECS)]
    pub duration: u64,

    /// Per-request latency ceiling in seconds; sizes the histogram
    #[clap(long, default_value_t = crate::defaults::TIMEOUT_SECS)]
    pub timeout: u64,

    /// Duration of the discarded warmup pass in seconds (0 disables)
    #[clap(long = "warmup-time", default_value_t = crate::defaults::WARMUP_SECS)]
    pub warmup_time: u64,

    /// Report format
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// PostgreSQL server host
    #[clap(long, default_value = "127.0.0.1")]
    pub pghost: String,

    /// PostgreSQL server port
    #[clap(long, default_value_t = 5432)]
    pub pgport: u16,

    /// PostgreSQL server user
    #[clap(long, default_value = "postgres")]
    pub pguser: String,
}

/// Available driver backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum DriverKind {
    /// Asynchronous driver (cooperative workers)
    #[clap(name = "tokio-postgres")]
    TokioPostgres,

    /// Synchronous driver (OS-thread workers)
    #[clap(name = "postgres")]
    Postgres,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::TokioPostgres => write!(f, "tokio-postgres"),
            DriverKind::Postgres => write!(f, "postgres"),
        }
    }
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    #[clap(name = "text")]
    Text,
    #[clap(name = "json")]
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Run parameters consumed by the benchmark core.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub concurrency: usize,
    pub duration: Duration,
    pub timeout: Duration,
    pub warmup: Duration,
    pub output_format: OutputFormat,
}

impl From<&Args> for RunConfig {
    fn from(args: &Args) -> Self {
        Self {
            concurrency: args.concurrency,
            duration: Duration::from_secs(args.duration),
            timeout: Duration::from_secs(args.timeout),
            warmup: Duration::from_secs(args.warmup_time),
            output_format: args.output_format,
        }
    }
}

impl From<&Args> for TargetConfig {
    fn from(args: &Args) -> Self {
        Self {
            host: args.pghost.clone(),
            port: args.pgport,
            user: args.pguser.clone(),
        }
    }
}
