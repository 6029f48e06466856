//! postgres backend: the synchronous sibling of tokio-postgres. Workers run
//! on dedicated OS threads; every call here blocks the calling thread, so
//! the runner keeps connect/close batches off the async runtime.

use crate::driver::{SyncConnection, SyncQueryDriver, TargetConfig};
use crate::error::{BenchError, BenchResult};
use crate::job::{copy_text_payload, CopyMetadata};
use crate::params::SqlParam;
use postgres::types::ToSql;
use postgres::{Client, NoTls, Statement};
use std::io::Write;

pub struct SyncPostgresDriver;

pub struct SyncPostgresConnection {
    client: Client,
    statement: Option<Statement>,
}

impl SyncPostgresConnection {
    fn prepared(&mut self, sql: &str) -> BenchResult<Statement> {
        if let Some(statement) = &self.statement {
            return Ok(statement.clone());
        }
        let statement = self
            .client
            .prepare(sql)
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        self.statement = Some(statement.clone());
        Ok(statement)
    }
}

impl SyncQueryDriver for SyncPostgresDriver {
    fn connect(&self, target: &TargetConfig) -> BenchResult<Box<dyn SyncConnection>> {
        let mut config = postgres::Config::new();
        config
            .host(&target.host)
            .port(target.port)
            .user(&target.user);

        let client = config
            .connect(NoTls)
            .map_err(|e| BenchError::Connect(e.to_string()))?;

        Ok(Box::new(SyncPostgresConnection {
            client,
            statement: None,
        }))
    }
}

impl SyncConnection for SyncPostgresConnection {
    fn execute(&mut self, sql: &str, params: &[SqlParam]) -> BenchResult<u64> {
        let statement = self.prepared(sql)?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self
            .client
            .query(&statement, &refs)
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        Ok(rows.len() as u64)
    }

    fn bulk_copy(&mut self, rows: &[Vec<SqlParam>], meta: &CopyMetadata) -> BenchResult<u64> {
        let statement = meta.copy_statement();
        let mut writer = self
            .client
            .copy_in(statement.as_str())
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        writer
            .write_all(copy_text_payload(rows).as_bytes())
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| BenchError::Execute(e.to_string()))
    }

    fn close(self: Box<Self>) -> BenchResult<()> {
        let this = *self;
        drop(this.statement);
        this.client
            .close()
            .map_err(|e| BenchError::Execute(e.to_string()))
    }
}
