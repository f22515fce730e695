//! sqlbench: cross-adapter SQLite benchmarking
//!
//! Runs one fixed, ordered catalogue of SQLite workloads against several
//! interchangeable engine bindings and compares the timings:
//!
//! - A uniform adapter interface over rusqlite (in-task and worker-thread)
//!   and sqlx
//! - A runner that times every test and records unsupported or failed tests
//!   without stopping
//! - A batched variant that swaps statement-heavy tests for batch calls
//! - A suite that lines all runs up in one table (text, CSV or JSON)

pub mod adapters;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod report;
pub mod results;
pub mod runner;
pub mod suite;
pub mod utils;
pub mod workloads;

use tracing_subscriber::EnvFilter;

pub use adapters::{
    AdapterKind, BatchCommand, BatchParams, ConnectionOptions, DbAdapter, ResultSet, Row,
    SqlValue, Transaction,
};
pub use catalogue::TestCase;
pub use config::Config;
pub use error::{BenchError, Result};
pub use report::{ComparisonTable, OutputFormat};
pub use results::{BenchmarkResults, OutcomeStatus, TestOutcome};
pub use runner::{Benchmark, RunOptions, Variant};
pub use suite::{BenchmarkSuite, FailurePolicy, SuiteReport};

/// Initialize logging
///
/// Honours `RUST_LOG`, otherwise logs this crate and the runner binary at
/// info (debug when `verbose`). Engine crates stay quiet by default. Output
/// goes to stderr so rendered tables can be piped. Calling it more than once
/// is harmless.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlbench={level},benchmark_runner={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
