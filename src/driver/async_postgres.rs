//! tokio-postgres backend: cooperative-async workers, native `$n` dialect,
//! bulk-copy capable. Also provides the administrative session for every
//! backend.

use crate::driver::{
    AdminConnector, AdminSession, AsyncConnection, AsyncQueryDriver, TargetConfig,
};
use crate::error::{BenchError, BenchResult};
use crate::job::{copy_text_payload, CopyMetadata};
use crate::params::SqlParam;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{pin_mut, SinkExt};
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Statement};
use tracing::debug;

pub struct TokioPostgresDriver;

/// One client session plus the background task driving its socket.
pub struct TokioPostgresConnection {
    client: Client,
    driver: JoinHandle<()>,
    // The workload query is fixed for the whole run, so one cached
    // statement per connection is enough.
    statement: Option<Statement>,
}

async fn open(target: &TargetConfig) -> BenchResult<TokioPostgresConnection> {
    let mut config = tokio_postgres::Config::new();
    config
        .host(&target.host)
        .port(target.port)
        .user(&target.user);

    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| BenchError::Connect(e.to_string()))?;

    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("connection task finished with error: {e}");
        }
    });

    Ok(TokioPostgresConnection {
        client,
        driver,
        statement: None,
    })
}

impl TokioPostgresConnection {
    async fn prepared(&mut self, sql: &str) -> BenchResult<Statement> {
        if let Some(statement) = &self.statement {
            return Ok(statement.clone());
        }
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        self.statement = Some(statement.clone());
        Ok(statement)
    }
}

#[async_trait]
impl AsyncQueryDriver for TokioPostgresDriver {
    async fn connect(&self, target: &TargetConfig) -> BenchResult<Box<dyn AsyncConnection>> {
        Ok(Box::new(open(target).await?))
    }
}

#[async_trait]
impl AsyncConnection for TokioPostgresConnection {
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> BenchResult<u64> {
        let statement = self.prepared(sql).await?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self
            .client
            .query(&statement, &refs)
            .await
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        Ok(rows.len() as u64)
    }

    async fn bulk_copy(
        &mut self,
        rows: &[Vec<SqlParam>],
        meta: &CopyMetadata,
    ) -> BenchResult<u64> {
        let statement = meta.copy_statement();
        let sink = self
            .client
            .copy_in::<_, Bytes>(statement.as_str())
            .await
            .map_err(|e| BenchError::Execute(e.to_string()))?;

        pin_mut!(sink);
        sink.send(Bytes::from(copy_text_payload(rows)))
            .await
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        sink.finish()
            .await
            .map_err(|e| BenchError::Execute(e.to_string()))
    }

    async fn close(self: Box<Self>) -> BenchResult<()> {
        let this = *self;
        drop(this.statement);
        drop(this.client);
        let _ = this.driver.await;
        Ok(())
    }
}

#[async_trait]
impl AdminConnector for TokioPostgresDriver {
    async fn connect(&self, target: &TargetConfig) -> BenchResult<Box<dyn AdminSession>> {
        Ok(Box::new(open(target).await?))
    }
}

#[async_trait]
impl AdminSession for TokioPostgresConnection {
    async fn execute_batch(&mut self, sql: &str) -> BenchResult<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| BenchError::Execute(e.to_string()))
    }

    async fn table_count(&mut self, table: &str) -> BenchResult<u64> {
        let row = self
            .client
            .query_one(&format!("SELECT count(*) FROM \"{table}\""), &[])
            .await
            .map_err(|e| BenchError::Execute(e.to_string()))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    async fn close(self: Box<Self>) -> BenchResult<()> {
        let conn: Box<dyn AsyncConnection> = self;
        conn.close().await
    }
}
