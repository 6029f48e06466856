//! Stub backends for integration tests.
//!
//! The stubs implement the public driver contract exactly as a third-party
//! backend would, with observable counters so tests can assert on the
//! runner's lifecycle (connections opened/closed, admin statements issued,
//! rows copied) without a live server.

#![allow(dead_code)]

use async_trait::async_trait;
use pgdriver_bench::driver::{
    AdapterSelection, AdminConnector, AdminSession, ArgumentDialect, AsyncConnection,
    AsyncQueryDriver, DriverHandle, SyncConnection, SyncQueryDriver, TargetConfig,
};
use pgdriver_bench::error::{BenchError, BenchResult};
use pgdriver_bench::job::CopyMetadata;
use pgdriver_bench::params::SqlParam;
use pgdriver_bench::{OutputFormat, RunConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Observable counters shared between a stub backend and its test.
#[derive(Default)]
pub struct StubState {
    pub connects: AtomicU64,
    pub closes: AtomicU64,
    pub copied_rows: AtomicU64,
    pub admin_scripts: Mutex<Vec<String>>,
}

impl StubState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_count(&self, sql: &str) -> usize {
        self.admin_scripts
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == sql)
            .count()
    }
}

/// Knobs controlling stub behavior.
#[derive(Clone)]
pub struct StubBehavior {
    /// Simulated per-request latency.
    pub latency: Duration,
    pub rows_per_query: u64,
    /// Fail the connection's Nth execute/bulk-copy call (1-based).
    pub fail_on_iteration: Option<u64>,
    /// Fail every connect attempt after this many have succeeded.
    pub fail_connect_after: Option<u64>,
    /// Rows to under-report from the admin `table_count`.
    pub copy_shortfall: u64,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            rows_per_query: 1,
            fail_on_iteration: None,
            fail_connect_after: None,
            copy_shortfall: 0,
        }
    }
}

pub struct StubAsyncDriver {
    state: Arc<StubState>,
    behavior: StubBehavior,
}

struct StubAsyncConnection {
    state: Arc<StubState>,
    behavior: StubBehavior,
    iterations: u64,
}

#[async_trait]
impl AsyncQueryDriver for StubAsyncDriver {
    async fn connect(&self, _target: &TargetConfig) -> BenchResult<Box<dyn AsyncConnection>> {
        let opened = self.state.connects.load(Ordering::SeqCst);
        if self.behavior.fail_connect_after == Some(opened) {
            return Err(BenchError::Connect("injected connect failure".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubAsyncConnection {
            state: Arc::clone(&self.state),
            behavior: self.behavior.clone(),
            iterations: 0,
        }))
    }
}

impl StubAsyncConnection {
    fn next_iteration(&mut self) -> BenchResult<()> {
        self.iterations += 1;
        if self.behavior.fail_on_iteration == Some(self.iterations) {
            return Err(BenchError::Execute("injected stub failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AsyncConnection for StubAsyncConnection {
    async fn execute(&mut self, _sql: &str, _params: &[SqlParam]) -> BenchResult<u64> {
        self.next_iteration()?;
        if !self.behavior.latency.is_zero() {
            tokio::time::sleep(self.behavior.latency).await;
        }
        Ok(self.behavior.rows_per_query)
    }

    async fn bulk_copy(
        &mut self,
        rows: &[Vec<SqlParam>],
        _meta: &CopyMetadata,
    ) -> BenchResult<u64> {
        self.next_iteration()?;
        if !self.behavior.latency.is_zero() {
            tokio::time::sleep(self.behavior.latency).await;
        }
        self.state
            .copied_rows
            .fetch_add(rows.len() as u64, Ordering::SeqCst);
        Ok(rows.len() as u64)
    }

    async fn close(self: Box<Self>) -> BenchResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct StubSyncDriver {
    state: Arc<StubState>,
    behavior: StubBehavior,
}

struct StubSyncConnection {
    state: Arc<StubState>,
    behavior: StubBehavior,
    iterations: u64,
}

impl SyncQueryDriver for StubSyncDriver {
    fn connect(&self, _target: &TargetConfig) -> BenchResult<Box<dyn SyncConnection>> {
        let opened = self.state.connects.load(Ordering::SeqCst);
        if self.behavior.fail_connect_after == Some(opened) {
            return Err(BenchError::Connect("injected connect failure".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSyncConnection {
            state: Arc::clone(&self.state),
            behavior: self.behavior.clone(),
            iterations: 0,
        }))
    }
}

impl SyncConnection for StubSyncConnection {
    fn execute(&mut self, _sql: &str, _params: &[SqlParam]) -> BenchResult<u64> {
        self.iterations += 1;
        if self.behavior.fail_on_iteration == Some(self.iterations) {
            return Err(BenchError::Execute("injected stub failure".to_string()));
        }
        if !self.behavior.latency.is_zero() {
            std::thread::sleep(self.behavior.latency);
        }
        Ok(self.behavior.rows_per_query)
    }

    fn bulk_copy(&mut self, rows: &[Vec<SqlParam>], _meta: &CopyMetadata) -> BenchResult<u64> {
        self.iterations += 1;
        if self.behavior.fail_on_iteration == Some(self.iterations) {
            return Err(BenchError::Execute("injected stub failure".to_string()));
        }
        if !self.behavior.latency.is_zero() {
            std::thread::sleep(self.behavior.latency);
        }
        self.state
            .copied_rows
            .fetch_add(rows.len() as u64, Ordering::SeqCst);
        Ok(rows.len() as u64)
    }

    fn close(self: Box<Self>) -> BenchResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct StubAdminConnector {
    state: Arc<StubState>,
    behavior: StubBehavior,
}

struct StubAdminSession {
    state: Arc<StubState>,
    behavior: StubBehavior,
}

#[async_trait]
impl AdminConnector for StubAdminConnector {
    async fn connect(&self, _target: &TargetConfig) -> BenchResult<Box<dyn AdminSession>> {
        Ok(Box::new(StubAdminSession {
            state: Arc::clone(&self.state),
            behavior: self.behavior.clone(),
        }))
    }
}

#[async_trait]
impl AdminSession for StubAdminSession {
    async fn execute_batch(&mut self, sql: &str) -> BenchResult<()> {
        self.state
            .admin_scripts
            .lock()
            .unwrap()
            .push(sql.to_string());
        Ok(())
    }

    async fn table_count(&mut self, _table: &str) -> BenchResult<u64> {
        let copied = self.state.copied_rows.load(Ordering::SeqCst);
        Ok(copied.saturating_sub(self.behavior.copy_shortfall))
    }

    async fn close(self: Box<Self>) -> BenchResult<()> {
        Ok(())
    }
}

/// Adapter selection over the cooperative stub backend.
pub fn cooperative_adapter(state: &Arc<StubState>, behavior: StubBehavior) -> AdapterSelection {
    AdapterSelection {
        name: "stub-async",
        workers: DriverHandle::Cooperative(Arc::new(StubAsyncDriver {
            state: Arc::clone(state),
            behavior: behavior.clone(),
        })),
        admin: Arc::new(StubAdminConnector {
            state: Arc::clone(state),
            behavior,
        }),
        dialect: ArgumentDialect::Native,
        supports_bulk_copy: true,
    }
}

/// Adapter selection over the OS-thread stub backend.
pub fn threaded_adapter(state: &Arc<StubState>, behavior: StubBehavior) -> AdapterSelection {
    AdapterSelection {
        name: "stub-sync",
        workers: DriverHandle::Threaded(Arc::new(StubSyncDriver {
            state: Arc::clone(state),
            behavior: behavior.clone(),
        })),
        admin: Arc::new(StubAdminConnector {
            state: Arc::clone(state),
            behavior,
        }),
        dialect: ArgumentDialect::Native,
        supports_bulk_copy: true,
    }
}

/// Cooperative stub without the bulk-copy capability.
pub fn adapter_without_copy(state: &Arc<StubState>, behavior: StubBehavior) -> AdapterSelection {
    let mut adapter = cooperative_adapter(state, behavior);
    adapter.supports_bulk_copy = false;
    adapter
}

/// Run configuration for short stub runs.
pub fn run_config(concurrency: usize, duration_ms: u64, warmup_ms: u64) -> RunConfig {
    RunConfig {
        concurrency,
        duration: Duration::from_millis(duration_ms),
        timeout: Duration::from_secs(2),
        warmup: Duration::from_millis(warmup_ms),
        output_format: OutputFormat::Json,
    }
}
