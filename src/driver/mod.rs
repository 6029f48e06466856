//! Driver adapter contract and backend registry.
//!
//! The runner is agnostic to which backend executes queries: it holds an
//! [`AdapterSelection`] chosen once at startup and only ever talks to the
//! contract traits. A backend supplies a connector, a row-execute primitive,
//! optionally a bulk-copy primitive, and two static facts — its concurrency
//! model and its argument-placeholder dialect.
//!
//! Two worlds are covered by parallel trait pairs: cooperative-async
//! backends ([`AsyncQueryDriver`]/[`AsyncConnection`]) and blocking
//! OS-thread backends ([`SyncQueryDriver`]/[`SyncConnection`]). The
//! administrative session used for setup, teardown and the copy post-check
//! is always asynchronous and has its own narrow interface.

use crate::cli::DriverKind;
use crate::error::{BenchError, BenchResult};
use crate::job::CopyMetadata;
use crate::params::SqlParam;
use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

pub mod async_postgres;
pub mod sync_postgres;

pub use async_postgres::TokioPostgresDriver;
pub use sync_postgres::SyncPostgresDriver;

/// Connection coordinates for the target server.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "postgres".to_string(),
        }
    }
}

/// How a backend schedules its concurrent workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyModel {
    /// All workers are futures sharing one cooperative timeline.
    CooperativeAsync,
    /// Each worker owns a dedicated OS thread.
    OsThread,
}

/// Argument-placeholder dialect of a backend's wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentDialect {
    /// The backend consumes `$n` placeholders as written.
    Native,
    /// The backend needs `$n` placeholders rewritten to positional `?`.
    PositionalRewrite,
}

impl ArgumentDialect {
    /// Rewrite the query text for this dialect. Applied exactly once, at
    /// workload preparation time.
    pub fn rewrite(&self, query: &str) -> String {
        match self {
            ArgumentDialect::Native => query.to_string(),
            ArgumentDialect::PositionalRewrite => {
                let placeholders =
                    Regex::new(r"\$\d+").expect("placeholder pattern is valid");
                placeholders.replace_all(query, "?").into_owned()
            }
        }
    }
}

/// Connector half of a cooperative-async backend.
#[async_trait]
pub trait AsyncQueryDriver: Send + Sync {
    /// Establish one session. A failure here is fatal to the whole run;
    /// the harness measures steady-state load, not reconnection resilience.
    async fn connect(&self, target: &TargetConfig) -> BenchResult<Box<dyn AsyncConnection>>;
}

/// One live cooperative-async session, exclusively owned by one worker.
#[async_trait]
pub trait AsyncConnection: Send {
    /// Run one query instance, fully materialize the result, return the
    /// observed row count. Adapters must not do unrelated work here: any
    /// buffering or formatting inside this call is part of what is measured.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> BenchResult<u64>;

    /// Perform one bulk-load operation. Optional capability; backends that
    /// lack it are rejected for copy jobs before any timing begins.
    async fn bulk_copy(
        &mut self,
        rows: &[Vec<SqlParam>],
        meta: &CopyMetadata,
    ) -> BenchResult<u64> {
        let _ = (rows, meta);
        Err(BenchError::Execute(
            "bulk copy is not supported by this connection".to_string(),
        ))
    }

    async fn close(self: Box<Self>) -> BenchResult<()>;
}

/// Connector half of a blocking OS-thread backend.
pub trait SyncQueryDriver: Send + Sync {
    fn connect(&self, target: &TargetConfig) -> BenchResult<Box<dyn SyncConnection>>;
}

/// One live blocking session; contract identical to [`AsyncConnection`].
pub trait SyncConnection: Send {
    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> BenchResult<u64>;

    fn bulk_copy(&mut self, rows: &[Vec<SqlParam>], meta: &CopyMetadata) -> BenchResult<u64> {
        let _ = (rows, meta);
        Err(BenchError::Execute(
            "bulk copy is not supported by this connection".to_string(),
        ))
    }

    fn close(self: Box<Self>) -> BenchResult<()>;
}

/// Connector for the administrative session (setup, teardown, copy
/// post-check). Always asynchronous, regardless of the worker backend.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    async fn connect(&self, target: &TargetConfig) -> BenchResult<Box<dyn AdminSession>>;
}

/// The administrative session itself. Single-owner, distinct from every
/// worker connection.
#[async_trait]
pub trait AdminSession: Send {
    /// Run a setup or teardown script.
    async fn execute_batch(&mut self, sql: &str) -> BenchResult<()>;

    /// Server-side row count of a table, for the copy post-check.
    async fn table_count(&mut self, table: &str) -> BenchResult<u64>;

    async fn close(self: Box<Self>) -> BenchResult<()>;
}

/// Worker connector tagged with its concurrency model.
#[derive(Clone)]
pub enum DriverHandle {
    Cooperative(Arc<dyn AsyncQueryDriver>),
    Threaded(Arc<dyn SyncQueryDriver>),
}

/// Everything the runner knows about the chosen backend. Built once from
/// the requested driver name, never mutated.
#[derive(Clone)]
pub struct AdapterSelection {
    pub name: &'static str,
    pub workers: DriverHandle,
    pub admin: Arc<dyn AdminConnector>,
    pub dialect: ArgumentDialect,
    pub supports_bulk_copy: bool,
}

impl AdapterSelection {
    pub fn concurrency_model(&self) -> ConcurrencyModel {
        match self.workers {
            DriverHandle::Cooperative(_) => ConcurrencyModel::CooperativeAsync,
            DriverHandle::Threaded(_) => ConcurrencyModel::OsThread,
        }
    }
}

/// Fixed backend registry.
pub fn select(kind: DriverKind) -> AdapterSelection {
    match kind {
        DriverKind::TokioPostgres => AdapterSelection {
            name: "tokio-postgres",
            workers: DriverHandle::Cooperative(Arc::new(TokioPostgresDriver)),
            admin: Arc::new(TokioPostgresDriver),
            dialect: ArgumentDialect::Native,
            supports_bulk_copy: true,
        },
        DriverKind::Postgres => AdapterSelection {
            name: "postgres",
            workers: DriverHandle::Threaded(Arc::new(SyncPostgresDriver)),
            admin: Arc::new(TokioPostgresDriver),
            dialect: ArgumentDialect::Native,
            supports_bulk_copy: true,
        },
    }
}
