//! Benchmark job description and workload preparation.
//!
//! A job arrives as a small JSON document (from a file or stdin), is
//! validated once, and is then compiled into an immutable [`Workload`] that
//! the workers share for the whole run: either a query with its bound
//! parameter tuple, or a bulk-copy payload with its expanded rows and copy
//! metadata.

use crate::driver::ArgumentDialect;
use crate::error::{BenchError, BenchResult};
use crate::params::SqlParam;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::Read;

/// Parsed benchmark job, immutable after loading.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDescription {
    /// Query text executed by every worker iteration.
    pub query: String,

    /// Bound argument tuple, one value per placeholder. For bulk-copy jobs
    /// the first element is a `{row, count}` template instead.
    #[serde(default)]
    pub args: Vec<Value>,

    /// Statement run once on the administrative session before the run.
    #[serde(default)]
    pub setup: Option<String>,

    /// Statement run once on the administrative session after the run.
    /// Required whenever `setup` is present.
    #[serde(default)]
    pub teardown: Option<String>,
}

impl JobDescription {
    /// Load a job from `path`, or from stdin when `path` is `-`.
    pub fn load(path: &str) -> BenchResult<Self> {
        let text = if path == "-" {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| BenchError::Config(format!("could not read job from stdin: {e}")))?;
            buf
        } else {
            fs::read_to_string(path)
                .map_err(|e| BenchError::Config(format!("could not read job file {path}: {e}")))?
        };
        Self::from_json(&text)
    }

    /// Parse a job from JSON text.
    pub fn from_json(text: &str) -> BenchResult<Self> {
        let job: JobDescription = serde_json::from_str(text)
            .map_err(|e| BenchError::Config(format!("malformed job JSON: {e}")))?;
        if job.query.trim().is_empty() {
            return Err(BenchError::Config("missing \"query\" in job JSON".to_string()));
        }
        Ok(job)
    }

    /// Enforce the job invariants that must hold before anything is opened.
    pub fn validate(&self) -> BenchResult<()> {
        if self.setup.is_some() && self.teardown.is_none() {
            return Err(BenchError::Config(
                "\"setup\" is present, but \"teardown\" is missing".to_string(),
            ));
        }
        Ok(())
    }
}

/// Target table and column list extracted from a bulk-copy query.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyMetadata {
    pub table: String,
    pub columns: Vec<String>,
}

impl CopyMetadata {
    /// Grammar: `COPY <name> ( <col>[, <col>]* )`, anchored at the start of
    /// the query text.
    pub fn parse(query: &str) -> BenchResult<Self> {
        let grammar = Regex::new(r"^COPY\s+(\w+)\s*\(\s*(\w+(?:\s*,\s*\w+)*)\s*\)")
            .expect("copy grammar pattern is valid");
        let captures = grammar
            .captures(query)
            .ok_or_else(|| BenchError::MalformedCopyQuery(query.to_string()))?;
        Ok(Self {
            table: captures[1].to_string(),
            columns: captures[2]
                .split(',')
                .map(|col| col.trim().to_string())
                .collect(),
        })
    }

    /// The statement actually issued for each bulk-copy iteration.
    pub fn copy_statement(&self) -> String {
        format!(
            "COPY \"{}\" ({}) FROM STDIN",
            self.table,
            self.columns.join(", ")
        )
    }
}

/// What each worker iteration executes.
#[derive(Debug, Clone)]
pub enum Workload {
    /// One query instance per iteration with a fixed parameter tuple.
    Query { sql: String, params: Vec<SqlParam> },

    /// One bulk-copy operation per iteration, loading `rows` into the
    /// target described by `meta`.
    BulkCopy {
        rows: Vec<Vec<SqlParam>>,
        meta: CopyMetadata,
    },
}

impl Workload {
    /// Compile a validated job into the shape the workers execute.
    ///
    /// Applies the adapter's placeholder dialect, detects the bulk-copy
    /// form, checks the adapter's bulk-copy capability, parses the copy
    /// grammar and expands the `{row, count}` template into the row payload.
    /// All of this happens before any connection is opened.
    pub fn prepare(
        job: &JobDescription,
        dialect: ArgumentDialect,
        supports_bulk_copy: bool,
    ) -> BenchResult<Self> {
        let sql = dialect.rewrite(&job.query);

        if !sql.starts_with("COPY ") {
            return Ok(Workload::Query {
                params: SqlParam::tuple_from_json(&job.args)?,
                sql,
            });
        }

        if !supports_bulk_copy {
            return Err(BenchError::Config(
                "COPY is not supported by the selected driver".to_string(),
            ));
        }

        let meta = CopyMetadata::parse(&sql)?;
        let template = job
            .args
            .first()
            .ok_or_else(|| BenchError::Config("COPY job needs a {row, count} argument".to_string()))?;

        let row = template
            .get("row")
            .and_then(Value::as_array)
            .ok_or_else(|| BenchError::Config("COPY argument is missing \"row\"".to_string()))?;
        let count = template
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| BenchError::Config("COPY argument is missing \"count\"".to_string()))?;

        let row = SqlParam::tuple_from_json(row)?;
        if row.len() != meta.columns.len() {
            return Err(BenchError::Config(format!(
                "COPY row has {} values but the query names {} columns",
                row.len(),
                meta.columns.len()
            )));
        }

        Ok(Workload::BulkCopy {
            rows: vec![row; count as usize],
            meta,
        })
    }

    /// Rows loaded per iteration; zero for plain query workloads.
    pub fn rows_per_iteration(&self) -> u64 {
        match self {
            Workload::Query { .. } => 0,
            Workload::BulkCopy { rows, .. } => rows.len() as u64,
        }
    }

    pub fn is_bulk_copy(&self) -> bool {
        matches!(self, Workload::BulkCopy { .. })
    }
}

/// Render a copy row payload as one COPY text-format buffer.
pub fn copy_text_payload(rows: &[Vec<SqlParam>]) -> String {
    let mut payload = String::new();
    for row in rows {
        let mut first = true;
        for field in row {
            if !first {
                payload.push('\t');
            }
            payload.push_str(&field.copy_field());
            first = false;
        }
        payload.push('\n');
    }
    payload
}
