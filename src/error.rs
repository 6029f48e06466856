use thiserror::Error;

/// Convenient result alias used throughout the crate.
pub type BenchResult<T> = Result<T, BenchError>;

/// Error taxonomy for a benchmark run.
///
/// The variants map onto the phases of the run: configuration problems are
/// caught during validation before any connection is opened, connection
/// problems abort the run before measurement starts, and execution problems
/// are fatal to the measured pass (teardown and connection release still
/// run). Driver-level causes are carried as display strings since each
/// backend reports errors through its own type.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The job description or the driver selection cannot be benchmarked
    /// as requested.
    #[error("invalid benchmark job: {0}")]
    Config(String),

    /// A bulk-copy job whose query text does not match the
    /// `COPY <table> (<col>, ...)` grammar.
    #[error("could not parse COPY query: {0}")]
    MalformedCopyQuery(String),

    /// A connect attempt failed during connection acquisition.
    #[error("connection failed: {0}")]
    Connect(String),

    /// An execute or bulk-copy call failed mid-run.
    #[error("query execution failed: {0}")]
    Execute(String),

    /// The post-copy row-count assertion failed: per-call results claimed
    /// success but the server-side count disagrees.
    #[error("COPY inserted {observed} rows into \"{table}\", expected at least {expected}")]
    IncompleteCopy {
        table: String,
        expected: u64,
        observed: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_cause() {
        let err = BenchError::Connect("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));

        let err = BenchError::IncompleteCopy {
            table: "t".to_string(),
            expected: 100,
            observed: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("100"));
        assert!(msg.contains('7'));
    }
}
