//! Error types for the benchmark harness
//!
//! Three kinds of failure matter to the runner and they are told apart by
//! variant, never by message text:
//!
//! - [`BenchError::Unsupported`]: an adapter has no implementation for a
//!   capability (usually batch execution). Recorded as `Unsupported`.
//! - Operational errors (engine, assertion, I/O, ...): recorded as `Failed`
//!   for the test that raised them.
//! - [`BenchError::Lifecycle`]: setup or teardown went wrong. Fatal for the
//!   adapter's run.

use std::fmt;
use std::io;

use thiserror::Error;

/// Phase of a runner in which a lifecycle error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SetUp,
    TearDown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::SetUp => write!(f, "setup"),
            Phase::TearDown => write!(f, "teardown"),
        }
    }
}

/// The main error type for the harness
#[derive(Error, Debug)]
pub enum BenchError {
    /// The adapter deliberately does not implement this capability
    #[error("{operation} is not supported by {adapter}")]
    Unsupported {
        adapter: String,
        operation: &'static str,
    },

    /// The adapter was used before `init()` or after `close()`
    #[error("Adapter {adapter} is not initialized")]
    NotInitialized { adapter: String },

    /// SQLite error raised through rusqlite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// SQLite error raised through sqlx
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The background thread owning a connection went away
    #[error("Worker error: {0}")]
    Worker(String),

    /// A workload read back data it did not expect
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be written
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// A runner was driven out of order
    #[error("Invalid runner state: {0}")]
    InvalidState(String),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Setup or teardown of a suite failed
    #[error("{suite} {phase} failed: {source}")]
    Lifecycle {
        suite: String,
        phase: Phase,
        #[source]
        source: Box<BenchError>,
    },
}

impl BenchError {
    pub fn unsupported(adapter: impl Into<String>, operation: &'static str) -> Self {
        BenchError::Unsupported {
            adapter: adapter.into(),
            operation,
        }
    }

    pub fn not_initialized(adapter: impl Into<String>) -> Self {
        BenchError::NotInitialized {
            adapter: adapter.into(),
        }
    }

    pub fn lifecycle(suite: impl Into<String>, phase: Phase, source: BenchError) -> Self {
        BenchError::Lifecycle {
            suite: suite.into(),
            phase,
            source: Box::new(source),
        }
    }

    /// True when the error says a capability is missing, as opposed to broken
    pub fn is_unsupported(&self) -> bool {
        matches!(self, BenchError::Unsupported { .. })
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(self, BenchError::Lifecycle { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Config(_)
            | BenchError::ConfigParse(_)
            | BenchError::ConfigSerialize(_) => 2,
            BenchError::Io(_) => 3,
            BenchError::Lifecycle { .. } => 4,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
