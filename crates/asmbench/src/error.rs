//! Error types for asmbench

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use asmbench_config::ConfigError;
use thiserror::Error;

use crate::model::CellKey;
use crate::percent::PercentageFormula;

/// Main error type for benchmark runs.
///
/// Every variant aborts the run; nothing is retried and no partial report is
/// produced.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The compiler wrote to stderr.
    #[error("compiler '{compiler}' reported diagnostics for `{command}`:\n{stderr}")]
    CompilerDiagnostics {
        compiler: String,
        command: String,
        stderr: String,
    },

    /// The compiler exited unsuccessfully.
    #[error("compiler '{compiler}' failed ({status}) for `{command}`")]
    CompilerFailed {
        compiler: String,
        command: String,
        status: ExitStatus,
    },

    /// An external program could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A filter or converter exited unsuccessfully.
    #[error("'{program}' failed ({status}): {stderr}")]
    ToolFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// A filter or converter produced output that is not UTF-8.
    #[error("'{program}' produced non-UTF-8 output")]
    NonUtf8 { program: String },

    /// An external program exceeded the per-invocation timeout.
    #[error("'{program}' timed out after {}s", .after.as_secs_f64())]
    Timeout { program: String, after: Duration },

    /// The run was cancelled through its cancellation token.
    #[error("benchmark run was cancelled")]
    Cancelled,

    /// A percentage change has a zero denominator.
    #[error("{formula} change is undefined for value {value} against baseline {baseline}")]
    ZeroDivisor {
        formula: PercentageFormula,
        value: u64,
        baseline: u64,
    },

    /// A cell was measured twice.
    #[error("duplicate measurement for {0}")]
    DuplicateCell(CellKey),

    /// The baseline cell for a comparison was never recorded.
    #[error("no baseline measurement for {0}")]
    MissingBaseline(CellKey),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for asmbench operations
pub type Result<T> = std::result::Result<T, BenchError>;
