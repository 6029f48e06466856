//! # pgdriver-bench - Main Entry Point
//!
//! Process bootstrap for the benchmark harness:
//!
//! 1. **Initialize logging**: colorized tracing diagnostics on stderr
//! 2. **Parse arguments**: driver selection and run parameters
//! 3. **Load the job**: benchmark job JSON from a file or stdin
//! 4. **Select the runtime**: event-loop policy follows the adapter's
//!    concurrency model
//! 5. **Run the benchmark**: the `Runner` owns the full lifecycle
//! 6. **Emit the report**: exactly one report on stdout
//!
//! Any fatal condition prints a single `fatal:` diagnostic line and exits
//! with a non-zero status; stdout stays reserved for the report.

use anyhow::Result;
use clap::Parser;
use pgdriver_bench::{
    cli::Args,
    driver::{self, ConcurrencyModel},
    job::JobDescription,
    logging::ColorizedFormatter,
    runner::Runner,
    RunConfig, TargetConfig,
};
use tracing::debug;

fn main() {
    // Log level is controlled via RUST_LOG; diagnostics go to stderr so a
    // JSON report on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .event_format(ColorizedFormatter)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    debug!("pgdriver-bench {} starting: {:?}", pgdriver_bench::VERSION, args);

    let job = JobDescription::load(&args.queryfile)?;
    let adapter = driver::select(args.driver);
    let config = RunConfig::from(&args);
    let target = TargetConfig::from(&args);

    // Runtime flavor follows the adapter's concurrency model: cooperative
    // workers share one event-loop thread, while the OS-thread pool gets a
    // multi-thread runtime so the administrative session stays serviced
    // while the pool blocks.
    let runtime = match adapter.concurrency_model() {
        ConcurrencyModel::CooperativeAsync => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?,
        ConcurrencyModel::OsThread => tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?,
    };

    let report = runtime.block_on(Runner::new(config, target, adapter, job).run())?;
    report.print()
}
