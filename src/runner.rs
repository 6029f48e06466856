//! Benchmark orchestration.
//!
//! The runner owns one benchmark run end to end: validate the job, compile
//! the workload, open the administrative session and exactly `concurrency`
//! worker connections, run the discarded warmup pass and the measured pass
//! under the scheduling model the adapter dictates, and aggregate the
//! per-worker results into one report.
//!
//! Release discipline: the connection batch and the administrative session
//! are released in two independently captured scopes, so an error anywhere
//! in the measured phases still closes every connection and still runs the
//! teardown statement (the job may have created external residue such as
//! tables). Error priority follows the phases: measured body, then
//! connection release, then copy post-check, then teardown.

use crate::cli::RunConfig;
use crate::driver::{
    AdapterSelection, AdminSession, AsyncConnection, AsyncQueryDriver, DriverHandle,
    SyncConnection, SyncQueryDriver, TargetConfig,
};
use crate::error::{BenchError, BenchResult};
use crate::job::{CopyMetadata, JobDescription, Workload};
use crate::report::{BenchmarkReport, RunTotals};
use crate::worker::{cooperative_pass, threaded_pass, WorkerResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Runner {
    config: RunConfig,
    target: TargetConfig,
    adapter: AdapterSelection,
    job: JobDescription,
}

impl Runner {
    pub fn new(
        config: RunConfig,
        target: TargetConfig,
        adapter: AdapterSelection,
        job: JobDescription,
    ) -> Self {
        Self {
            config,
            target,
            adapter,
            job,
        }
    }

    /// Execute the full benchmark lifecycle and return the report.
    pub async fn run(self) -> BenchResult<BenchmarkReport> {
        self.job.validate()?;
        let workload = Workload::prepare(
            &self.job,
            self.adapter.dialect,
            self.adapter.supports_bulk_copy,
        )?;

        info!(
            "benchmarking {} with {} connections, {}s measured pass",
            self.adapter.name,
            self.config.concurrency,
            self.config.duration.as_secs()
        );

        // Setup, teardown and the copy post-check run out-of-band on a
        // dedicated session, never on a worker connection.
        let mut admin = if self.job.setup.is_some() || workload.is_bulk_copy() {
            Some(self.adapter.admin.connect(&self.target).await?)
        } else {
            None
        };

        let outcome = self.run_with_admin(&mut admin, &workload).await;

        if let Some(session) = admin.take() {
            if let Err(e) = session.close().await {
                debug!("administrative session close failed: {e}");
            }
        }

        let (results, wall) = outcome?;
        let totals = RunTotals::from_results(&results, self.config.timeout);
        if totals.histogram.overflows() > 0 {
            warn!(
                "{} samples exceeded the {}s latency ceiling and were clamped; \
                 consider raising --timeout",
                totals.histogram.overflows(),
                self.config.timeout.as_secs()
            );
        }
        info!(
            "measured pass complete: {} queries over {:.2}s",
            totals.queries,
            wall.as_secs_f64()
        );

        Ok(BenchmarkReport::assemble(
            totals,
            wall,
            self.config.output_format,
        ))
    }

    /// Everything between admin connect and admin close. The teardown leg
    /// runs whenever setup ran, no matter how the measured body ended.
    async fn run_with_admin(
        &self,
        admin: &mut Option<Box<dyn AdminSession>>,
        workload: &Workload,
    ) -> BenchResult<(Vec<WorkerResult>, Duration)> {
        let mut setup_ran = false;
        if let Some(sql) = &self.job.setup {
            let session = admin.as_mut().ok_or_else(|| {
                BenchError::Config("administrative session unavailable".to_string())
            })?;
            info!("running setup statement");
            session.execute_batch(sql).await?;
            setup_ran = true;
        }

        let measured = self.acquire_and_measure(workload).await;

        // Post-check precedes teardown: teardown usually drops the copy
        // target table.
        let post_check = match (&measured, workload) {
            (Ok((results, _)), Workload::BulkCopy { rows, meta }) => {
                self.check_copy_rowcount(admin, meta, rows.len() as u64, results)
                    .await
            }
            _ => Ok(()),
        };

        let teardown = if setup_ran {
            self.run_teardown(admin).await
        } else {
            Ok(())
        };

        let (results, wall) = measured?;
        post_check?;
        teardown?;
        Ok((results, wall))
    }

    /// Open the worker connection batch, run warmup and measured passes,
    /// release the batch. The release leg runs no matter how the passes
    /// ended; a partial batch is released if any connect fails.
    async fn acquire_and_measure(
        &self,
        workload: &Workload,
    ) -> BenchResult<(Vec<WorkerResult>, Duration)> {
        match &self.adapter.workers {
            DriverHandle::Cooperative(driver) => {
                let mut conns =
                    open_async_batch(driver.as_ref(), &self.target, self.config.concurrency)
                        .await?;
                let body = self.passes_async(&mut conns, workload).await;
                let released = close_async_batch(conns).await;
                body.and_then(|ok| released.map(|_| ok))
            }
            DriverHandle::Threaded(driver) => {
                let cpus = num_cpus::get();
                if self.config.concurrency > cpus {
                    warn!(
                        "{} worker threads on {} CPUs; thread scheduling may skew latency",
                        self.config.concurrency, cpus
                    );
                }

                // Blocking driver calls stay off the async runtime.
                let opener = Arc::clone(driver);
                let target = self.target.clone();
                let count = self.config.concurrency;
                let mut conns = tokio::task::spawn_blocking(move || {
                    open_sync_batch(opener.as_ref(), &target, count)
                })
                .await
                .map_err(|e| BenchError::Connect(format!("connection worker panicked: {e}")))??;

                let body = self.passes_sync(&mut conns, workload);
                let released = tokio::task::spawn_blocking(move || close_sync_batch(conns))
                    .await
                    .map_err(|e| BenchError::Execute(format!("connection worker panicked: {e}")))
                    .and_then(|r| r);
                body.and_then(|ok| released.map(|_| ok))
            }
        }
    }

    async fn passes_async(
        &self,
        conns: &mut [Box<dyn AsyncConnection>],
        workload: &Workload,
    ) -> BenchResult<(Vec<WorkerResult>, Duration)> {
        if !self.config.warmup.is_zero() {
            info!("warmup pass: {}s (discarded)", self.config.warmup.as_secs());
            cooperative_pass(conns, workload, self.config.warmup, self.config.timeout).await?;
        }
        cooperative_pass(conns, workload, self.config.duration, self.config.timeout).await
    }

    fn passes_sync(
        &self,
        conns: &mut [Box<dyn SyncConnection>],
        workload: &Workload,
    ) -> BenchResult<(Vec<WorkerResult>, Duration)> {
        if !self.config.warmup.is_zero() {
            info!("warmup pass: {}s (discarded)", self.config.warmup.as_secs());
            threaded_pass(conns, workload, self.config.warmup, self.config.timeout)?;
        }
        threaded_pass(conns, workload, self.config.duration, self.config.timeout)
    }

    async fn run_teardown(&self, admin: &mut Option<Box<dyn AdminSession>>) -> BenchResult<()> {
        // validate() guarantees teardown is present whenever setup is.
        if let (Some(sql), Some(session)) = (&self.job.teardown, admin.as_mut()) {
            info!("running teardown statement");
            session.execute_batch(sql).await?;
        }
        Ok(())
    }

    /// Assert the server-side row count covers everything the workers
    /// claimed to have copied. A short count is a lost-write fault in the
    /// adapter, reported distinctly from execution errors.
    async fn check_copy_rowcount(
        &self,
        admin: &mut Option<Box<dyn AdminSession>>,
        meta: &CopyMetadata,
        rows_per_iteration: u64,
        results: &[WorkerResult],
    ) -> BenchResult<()> {
        let session = admin.as_mut().ok_or_else(|| {
            BenchError::Config("administrative session unavailable for COPY post-check".to_string())
        })?;

        let total_queries: u64 = results.iter().map(|r| r.queries).sum();
        let expected = rows_per_iteration * total_queries;
        let observed = session.table_count(&meta.table).await?;
        debug!("COPY post-check: {} rows in \"{}\"", observed, meta.table);

        if observed < expected {
            return Err(BenchError::IncompleteCopy {
                table: meta.table.clone(),
                expected,
                observed,
            });
        }
        Ok(())
    }
}

async fn open_async_batch(
    driver: &dyn AsyncQueryDriver,
    target: &TargetConfig,
    count: usize,
) -> BenchResult<Vec<Box<dyn AsyncConnection>>> {
    let mut conns = Vec::with_capacity(count);
    for i in 0..count {
        match driver.connect(target).await {
            Ok(conn) => {
                debug!("connection {i} established");
                conns.push(conn);
            }
            Err(e) => {
                let _ = close_async_batch(conns).await;
                return Err(e);
            }
        }
    }
    Ok(conns)
}

async fn close_async_batch(conns: Vec<Box<dyn AsyncConnection>>) -> BenchResult<()> {
    let mut first_error = None;
    for conn in conns {
        if let Err(e) = conn.close().await {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn open_sync_batch(
    driver: &dyn SyncQueryDriver,
    target: &TargetConfig,
    count: usize,
) -> BenchResult<Vec<Box<dyn SyncConnection>>> {
    let mut conns = Vec::with_capacity(count);
    for i in 0..count {
        match driver.connect(target) {
            Ok(conn) => {
                debug!("connection {i} established");
                conns.push(conn);
            }
            Err(e) => {
                let _ = close_sync_batch(conns);
                return Err(e);
            }
        }
    }
    Ok(conns)
}

fn close_sync_batch(conns: Vec<Box<dyn SyncConnection>>) -> BenchResult<()> {
    let mut first_error = None;
    for conn in conns {
        if let Err(e) = conn.close() {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
