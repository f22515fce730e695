//! Benchmark runner
//!
//! A [`Benchmark`] drives one adapter through the catalogue exactly once:
//!
//! ```text
//! Created -> SettingUp -> Running(0) -> ... -> Running(n-1) -> TornDown
//! ```
//!
//! Test failures are recorded and the run moves on. Only setup and teardown
//! failures end the run, as [`BenchError::Lifecycle`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::DbAdapter;
use crate::catalogue::{catalogue, TestCase};
use crate::error::{BenchError, Phase, Result};
use crate::results::BenchmarkResults;
use crate::workloads::{schema, BatchedWorkloads, StandardWorkloads, Workloads};

/// Knobs shared by every runner of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Seed and scan the wide `Test` table (test 16)
    pub include_large_dataset: bool,
    pub large_dataset_rows: usize,
    /// Seed of the workload data generator
    pub seed: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_large_dataset: false,
            large_dataset_rows: 300_000,
            seed: 42,
        }
    }
}

/// Which implementation of the catalogue a runner uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Standard,
    Batched,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Standard, Variant::Batched];

    /// Column name of a suite in the comparison table
    pub fn suite_name(&self, adapter: &str) -> String {
        match self {
            Variant::Standard => adapter.to_string(),
            Variant::Batched => format!("{adapter}-batched"),
        }
    }

    pub fn workloads(&self, options: &RunOptions) -> Box<dyn Workloads> {
        let standard = StandardWorkloads::new(options.seed, options.large_dataset_rows);
        match self {
            Variant::Standard => Box::new(standard),
            Variant::Batched => Box::new(BatchedWorkloads::new(standard)),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Standard => write!(f, "standard"),
            Variant::Batched => write!(f, "batched"),
        }
    }
}

impl FromStr for Variant {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Variant::Standard),
            "batched" => Ok(Variant::Batched),
            other => Err(BenchError::Config(format!("Unknown variant: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    SettingUp,
    Running(usize),
    TornDown,
}

/// Runs the catalogue against one adapter
pub struct Benchmark {
    name: String,
    adapter: Box<dyn DbAdapter>,
    workloads: Box<dyn Workloads>,
    options: RunOptions,
    cases: Vec<TestCase>,
    state: RunnerState,
}

impl Benchmark {
    pub fn new(adapter: Box<dyn DbAdapter>, variant: Variant, options: RunOptions) -> Self {
        let name = variant.suite_name(adapter.name());
        let workloads = variant.workloads(&options);
        Self::with_workloads(name, adapter, workloads, options)
    }

    pub fn with_workloads(
        name: impl Into<String>,
        adapter: Box<dyn DbAdapter>,
        workloads: Box<dyn Workloads>,
        options: RunOptions,
    ) -> Self {
        let cases = catalogue(options.include_large_dataset);
        Self {
            name: name.into(),
            adapter,
            workloads,
            options,
            cases,
            state: RunnerState::Created,
        }
    }

    /// Restrict the run to `cases`, kept in catalogue order. Tests that a
    /// requested case reads from are kept too.
    pub fn with_cases(mut self, cases: &[TestCase]) -> Self {
        let needed: Vec<TestCase> = cases.iter().filter_map(TestCase::prerequisite).collect();
        for case in needed.iter().filter(|case| !cases.contains(case)) {
            debug!(suite = %self.name, "Also running {} for its data", case);
        }
        self.cases
            .retain(|case| cases.contains(case) || needed.contains(case));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn adapter(&self) -> &dyn DbAdapter {
        self.adapter.as_ref()
    }

    async fn prepare(&self) -> Result<()> {
        self.adapter.init().await?;
        schema::recreate(self.adapter.as_ref()).await?;
        if self.options.include_large_dataset {
            schema::seed_large(
                self.adapter.as_ref(),
                self.options.large_dataset_rows,
                self.options.seed,
            )
            .await?;
        }
        Ok(())
    }

    /// Open the adapter and create a clean schema
    pub async fn set_up(&mut self) -> Result<()> {
        if self.state != RunnerState::Created {
            return Err(BenchError::InvalidState(format!(
                "{} cannot set up from {:?}",
                self.name, self.state
            )));
        }
        self.state = RunnerState::SettingUp;
        debug!(suite = %self.name, "Setting up");

        if let Err(e) = self.prepare().await {
            if let Err(close) = self.adapter.close().await {
                debug!(suite = %self.name, "Close after failed setup: {}", close);
            }
            self.state = RunnerState::TornDown;
            return Err(BenchError::lifecycle(&self.name, Phase::SetUp, e));
        }
        Ok(())
    }

    /// Drop every table and close the adapter
    pub async fn tear_down(&mut self) -> Result<()> {
        if !matches!(self.state, RunnerState::SettingUp | RunnerState::Running(_)) {
            return Err(BenchError::InvalidState(format!(
                "{} cannot tear down from {:?}",
                self.name, self.state
            )));
        }
        debug!(suite = %self.name, "Tearing down");

        let dropped = schema::drop_all(self.adapter.as_ref()).await;
        let closed = self.adapter.close().await;
        self.state = RunnerState::TornDown;

        dropped
            .and(closed)
            .map_err(|e| BenchError::lifecycle(&self.name, Phase::TearDown, e))
    }

    /// Set up, run every test in order, tear down
    pub async fn run_all(&mut self) -> Result<BenchmarkResults> {
        self.set_up().await?;
        info!(suite = %self.name, "Running {} tests", self.cases.len());

        let mut results = BenchmarkResults::new(&self.name);
        for (index, case) in self.cases.iter().copied().enumerate() {
            self.state = RunnerState::Running(index);
            results
                .record(case, self.workloads.run(case, self.adapter.as_ref()))
                .await;
        }

        self.tear_down().await?;

        let counts = results.counts();
        if counts.failed > 0 {
            warn!(suite = %self.name, "{} of {} tests failed", counts.failed, results.len());
        }
        Ok(results)
    }
}
