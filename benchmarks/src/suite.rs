//! Benchmark suite
//!
//! Drives every configured adapter through each variant, strictly one run
//! at a time, and collects the per-suite results for the comparison table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::adapters::{AdapterKind, ConnectionOptions, DbAdapter};
use crate::catalogue::TestCase;
use crate::config::Config;
use crate::error::{BenchError, Result};
use crate::report::ComparisonTable;
use crate::results::BenchmarkResults;
use crate::runner::{Benchmark, RunOptions, Variant};

/// What happens when an adapter's setup or teardown fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure, keep an empty column and continue with the next run
    #[default]
    Isolate,
    /// Stop the whole suite and return the error
    Abort,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Isolate => write!(f, "isolate"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolate" => Ok(FailurePolicy::Isolate),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(BenchError::Config(format!("Unknown failure policy: {other}"))),
        }
    }
}

/// Builds a fresh, uninitialised adapter for every run
pub type AdapterFactory = Box<dyn Fn() -> Box<dyn DbAdapter> + Send + Sync>;

struct SuiteEntry {
    name: String,
    factory: AdapterFactory,
}

/// A run that could not produce results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteFailure {
    pub suite: String,
    pub message: String,
}

/// Everything a suite run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub results: Vec<BenchmarkResults>,
    pub failures: Vec<SuiteFailure>,
}

impl SuiteReport {
    pub fn comparison(&self) -> ComparisonTable {
        ComparisonTable::build(&self.results)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn suite(&self, name: &str) -> Option<&BenchmarkResults> {
        self.results.iter().find(|results| results.suite == name)
    }
}

pub struct BenchmarkSuite {
    entries: Vec<SuiteEntry>,
    variants: Vec<Variant>,
    options: RunOptions,
    policy: FailurePolicy,
    cases: Option<Vec<TestCase>>,
}

impl BenchmarkSuite {
    pub fn new(options: RunOptions) -> Self {
        Self {
            entries: Vec::new(),
            variants: Variant::ALL.to_vec(),
            options,
            policy: FailurePolicy::default(),
            cases: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let connection = config.connection_options();
        let suite = config.benchmark.adapters.iter().fold(
            Self::new(config.run_options()),
            |suite, kind| suite.add_kind(*kind, connection.clone()),
        );
        Ok(suite
            .with_variants(config.benchmark.variants.clone())
            .with_policy(config.benchmark.failure_policy))
    }

    /// Register an adapter under `name`; runs follow registration order
    pub fn add<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn DbAdapter> + Send + Sync + 'static,
    {
        self.entries.push(SuiteEntry {
            name: name.into(),
            factory: Box::new(factory),
        });
        self
    }

    pub fn add_kind(self, kind: AdapterKind, connection: ConnectionOptions) -> Self {
        self.add(kind.name(), move || kind.create(&connection))
    }

    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Restrict every run to a subset of the catalogue
    pub fn with_cases(mut self, cases: Vec<TestCase>) -> Self {
        self.cases = Some(cases);
        self
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// Every adapter, each through every configured variant
    pub async fn run(&self) -> Result<SuiteReport> {
        self.run_variants(&self.variants).await
    }

    /// Every adapter with the standard workloads only
    pub async fn run_benchmarks(&self) -> Result<SuiteReport> {
        self.run_variants(&[Variant::Standard]).await
    }

    /// Every adapter with the batched workloads only
    pub async fn run_batched_benchmarks(&self) -> Result<SuiteReport> {
        self.run_variants(&[Variant::Batched]).await
    }

    async fn run_variants(&self, variants: &[Variant]) -> Result<SuiteReport> {
        let mut report = SuiteReport::default();

        for entry in &self.entries {
            for variant in variants {
                let suite_name = variant.suite_name(&entry.name);
                let mut benchmark = Benchmark::with_workloads(
                    suite_name.clone(),
                    (entry.factory)(),
                    variant.workloads(&self.options),
                    self.options.clone(),
                );
                if let Some(cases) = &self.cases {
                    benchmark = benchmark.with_cases(cases);
                }

                info!("Running suite {}", suite_name);
                match benchmark.run_all().await {
                    Ok(results) => report.results.push(results),
                    Err(e) if self.policy == FailurePolicy::Isolate => {
                        error!("Suite {} aborted: {}", suite_name, e);
                        report.results.push(BenchmarkResults::new(&suite_name));
                        report.failures.push(SuiteFailure {
                            suite: suite_name,
                            message: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(report)
    }
}
