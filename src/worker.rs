//! Worker sample loops and the two scheduling models.
//!
//! A worker is one logical concurrent client: it owns one connection and
//! repeatedly executes the workload against it until the shared deadline,
//! recording one histogram sample per iteration. The two pass functions
//! wrap the loops in the scheduling model the backend dictates — a
//! cooperative join of futures, or a pool of exactly N scoped OS threads —
//! behind the same contract: launch N workers, barrier-join all N, return
//! N results plus the measured wall-clock span.

use crate::driver::{AsyncConnection, SyncConnection};
use crate::error::{BenchError, BenchResult};
use crate::histogram::LatencyHistogram;
use crate::job::Workload;
use std::time::{Duration, Instant};

/// Per-worker totals, produced exactly once at loop exit.
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub queries: u64,
    pub rows: u64,
    pub histogram: LatencyHistogram,
    /// Smallest observed latency, hundredths of a millisecond.
    pub min_latency: f64,
    /// Largest observed latency, hundredths of a millisecond.
    pub max_latency: f64,
}

/// Sample loop for one cooperative worker.
///
/// `start` is shared by all workers of a pass so they observe one deadline.
/// A failed execution is fatal: partial results are discarded, never
/// salvaged — the contract is clean measurement or no measurement.
pub async fn run_async_worker(
    conn: &mut dyn AsyncConnection,
    workload: &Workload,
    start: Instant,
    run_duration: Duration,
    timeout: Duration,
) -> BenchResult<WorkerResult> {
    let mut histogram = LatencyHistogram::for_timeout(timeout);
    let mut queries = 0u64;
    let mut rows = 0u64;

    while start.elapsed() < run_duration {
        let sample_start = Instant::now();
        rows += match workload {
            Workload::Query { sql, params } => conn.execute(sql, params).await?,
            Workload::BulkCopy { rows: payload, meta } => conn.bulk_copy(payload, meta).await?,
        };
        histogram.record(sample_start.elapsed());
        queries += 1;
    }

    Ok(WorkerResult {
        queries,
        rows,
        min_latency: histogram.min(),
        max_latency: histogram.max(),
        histogram,
    })
}

/// Sample loop for one OS-thread worker; contract identical to
/// [`run_async_worker`].
pub fn run_sync_worker(
    conn: &mut dyn SyncConnection,
    workload: &Workload,
    start: Instant,
    run_duration: Duration,
    timeout: Duration,
) -> BenchResult<WorkerResult> {
    let mut histogram = LatencyHistogram::for_timeout(timeout);
    let mut queries = 0u64;
    let mut rows = 0u64;

    while start.elapsed() < run_duration {
        let sample_start = Instant::now();
        rows += match workload {
            Workload::Query { sql, params } => conn.execute(sql, params)?,
            Workload::BulkCopy { rows: payload, meta } => conn.bulk_copy(payload, meta)?,
        };
        histogram.record(sample_start.elapsed());
        queries += 1;
    }

    Ok(WorkerResult {
        queries,
        rows,
        min_latency: histogram.min(),
        max_latency: histogram.max(),
        histogram,
    })
}

/// Run one pass with every worker polled cooperatively on this task.
///
/// Concurrency here means overlapping in-flight requests, not parallel CPU
/// use; suspension happens only at the execute/bulk-copy boundary. All
/// workers are joined before any error is propagated.
pub async fn cooperative_pass(
    conns: &mut [Box<dyn AsyncConnection>],
    workload: &Workload,
    run_duration: Duration,
    timeout: Duration,
) -> BenchResult<(Vec<WorkerResult>, Duration)> {
    let start = Instant::now();
    let workers = conns
        .iter_mut()
        .map(|conn| run_async_worker(conn.as_mut(), workload, start, run_duration, timeout));
    let outcomes = futures::future::join_all(workers).await;
    let wall = start.elapsed();

    let results = outcomes.into_iter().collect::<BenchResult<Vec<_>>>()?;
    Ok((results, wall))
}

/// Run one pass on a pool of exactly `conns.len()` scoped OS threads.
///
/// No queuing, no oversubscription: one thread per connection, joined as a
/// barrier before any error is propagated.
pub fn threaded_pass(
    conns: &mut [Box<dyn SyncConnection>],
    workload: &Workload,
    run_duration: Duration,
    timeout: Duration,
) -> BenchResult<(Vec<WorkerResult>, Duration)> {
    let start = Instant::now();
    let outcomes = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = conns
            .iter_mut()
            .map(|conn| {
                scope.spawn(move |_| {
                    run_sync_worker(conn.as_mut(), workload, start, run_duration, timeout)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(BenchError::Execute("worker thread panicked".to_string()))
                })
            })
            .collect::<Vec<_>>()
    })
    .map_err(|_| BenchError::Execute("worker pool panicked".to_string()))?;
    let wall = start.elapsed();

    let results = outcomes.into_iter().collect::<BenchResult<Vec<_>>>()?;
    Ok((results, wall))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::CopyMetadata;
    use crate::params::SqlParam;
    use async_trait::async_trait;

    struct InstantStub {
        rows_per_query: u64,
    }

    #[async_trait]
    impl AsyncConnection for InstantStub {
        async fn execute(&mut self, _sql: &str, _params: &[SqlParam]) -> BenchResult<u64> {
            Ok(self.rows_per_query)
        }

        async fn close(self: Box<Self>) -> BenchResult<()> {
            Ok(())
        }
    }

    struct SyncInstantStub {
        rows_per_query: u64,
    }

    impl SyncConnection for SyncInstantStub {
        fn execute(&mut self, _sql: &str, _params: &[SqlParam]) -> BenchResult<u64> {
            Ok(self.rows_per_query)
        }

        fn close(self: Box<Self>) -> BenchResult<()> {
            Ok(())
        }
    }

    fn query_workload() -> Workload {
        Workload::Query {
            sql: "SELECT 1".to_string(),
            params: Vec::new(),
        }
    }

    #[tokio::test]
    async fn async_worker_counts_queries_and_rows() {
        let mut conn = InstantStub { rows_per_query: 2 };
        let result = run_async_worker(
            &mut conn,
            &query_workload(),
            Instant::now(),
            Duration::from_millis(20),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert!(result.queries > 0);
        assert_eq!(result.rows, result.queries * 2);
        assert_eq!(result.histogram.total(), result.queries);
        assert!(result.min_latency <= result.max_latency);
    }

    #[test]
    fn sync_worker_matches_the_async_contract() {
        let mut conn = SyncInstantStub { rows_per_query: 1 };
        let result = run_sync_worker(
            &mut conn,
            &query_workload(),
            Instant::now(),
            Duration::from_millis(20),
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(result.queries > 0);
        assert_eq!(result.rows, result.queries);
        assert_eq!(result.histogram.total(), result.queries);
    }

    #[tokio::test]
    async fn default_bulk_copy_is_an_execution_error() {
        let mut conn = InstantStub { rows_per_query: 1 };
        let workload = Workload::BulkCopy {
            rows: vec![vec![SqlParam::Int(1)]],
            meta: CopyMetadata {
                table: "t".to_string(),
                columns: vec!["a".to_string()],
            },
        };
        let outcome = run_async_worker(
            &mut conn,
            &workload,
            Instant::now(),
            Duration::from_millis(20),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(outcome, Err(BenchError::Execute(_))));
    }
}
