//! Scratch directories and run helpers shared by the integration tests

use std::path::Path;

use sqlbench::{
    AdapterKind, Benchmark, BenchmarkResults, ConnectionOptions, DbAdapter, Result, RunOptions,
    TestCase, Variant,
};
use tempfile::TempDir;

/// Owns a temporary database directory for the duration of a test
pub struct TestHarness {
    dir: TempDir,
}

impl TestHarness {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions::in_directory(self.dir.path())
    }

    pub fn adapter(&self, kind: AdapterKind) -> Box<dyn DbAdapter> {
        kind.create(&self.connection_options())
    }

    /// Run `cases` once against `adapter` with default options
    pub async fn run(
        &self,
        adapter: Box<dyn DbAdapter>,
        variant: Variant,
        cases: &[TestCase],
    ) -> Result<BenchmarkResults> {
        Benchmark::new(adapter, variant, RunOptions::default())
            .with_cases(cases)
            .run_all()
            .await
    }
}

pub mod assertions {
    use sqlbench::{BenchmarkResults, TestCase};

    /// One outcome per expected test, in the expected order
    pub fn assert_outcome_order(results: &BenchmarkResults, expected: &[TestCase]) {
        let cases: Vec<TestCase> = results.outcomes.iter().map(|o| o.case).collect();
        assert_eq!(cases, expected, "outcome order of {}", results.suite);
    }

    pub fn assert_all_completed(results: &BenchmarkResults) {
        for outcome in &results.outcomes {
            assert!(outcome.is_completed(), "{}: {}", results.suite, outcome);
        }
    }
}
