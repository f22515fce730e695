//! Per-suite result collection
//!
//! A [`BenchmarkResults`] holds exactly one [`TestOutcome`] per executed test,
//! in execution order. Failures never abort collection: [`BenchmarkResults::record`]
//! classifies the error and moves on.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalogue::TestCase;
use crate::error::Result;
use crate::utils::{round_ms, Timer};

/// How a single test ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed { duration_ms: f64 },
    Unsupported { message: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    #[serde(rename = "test")]
    pub case: TestCase,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl TestOutcome {
    pub fn name(&self) -> &'static str {
        self.case.name()
    }

    pub fn duration_ms(&self) -> Option<f64> {
        match self.status {
            OutcomeStatus::Completed { duration_ms } => Some(duration_ms),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Completed { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.status, OutcomeStatus::Unsupported { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    /// `<test>,<ms>`, or `<test>,N/A` when the test did not complete
    pub fn to_csv(&self) -> String {
        match self.duration_ms() {
            Some(ms) => format!("{},{:.2}", self.name(), ms),
            None => format!("{},N/A", self.name()),
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            OutcomeStatus::Completed { duration_ms } => {
                write!(f, "{}: {}s", self.name(), duration_ms / 1000.0)
            }
            OutcomeStatus::Unsupported { message } => {
                write!(f, "{}: unsupported ({})", self.name(), message)
            }
            OutcomeStatus::Failed { message } => {
                write!(f, "{}: failed ({})", self.name(), message)
            }
        }
    }
}

/// Tallies of a suite's outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub completed: usize,
    pub unsupported: usize,
    pub failed: usize,
}

/// Ordered outcomes of one suite (one adapter in one variant)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResults {
    pub suite: String,
    pub outcomes: Vec<TestOutcome>,
}

impl BenchmarkResults {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            outcomes: Vec::new(),
        }
    }

    /// Time `body` and store its outcome for `case`
    pub async fn record<F>(&mut self, case: TestCase, body: F) -> &TestOutcome
    where
        F: Future<Output = Result<()>>,
    {
        let timer = Timer::start();
        let result = body.await;
        let elapsed = round_ms(timer.elapsed_ms());

        let status = match result {
            Ok(()) => {
                info!(suite = %self.suite, "{} :: {}ms", case, elapsed);
                OutcomeStatus::Completed {
                    duration_ms: elapsed,
                }
            }
            Err(e) if e.is_unsupported() => {
                warn!(suite = %self.suite, "{} :: unsupported: {}", case, e);
                OutcomeStatus::Unsupported {
                    message: e.to_string(),
                }
            }
            Err(e) => {
                error!(suite = %self.suite, "{} :: failed: {}", case, e);
                OutcomeStatus::Failed {
                    message: e.to_string(),
                }
            }
        };

        self.push(TestOutcome { case, status })
    }

    pub fn push(&mut self, outcome: TestOutcome) -> &TestOutcome {
        self.outcomes.push(outcome);
        &self.outcomes[self.outcomes.len() - 1]
    }

    pub fn get(&self, case: TestCase) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|outcome| outcome.case == case)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.outcomes
            .iter()
            .fold(OutcomeCounts::default(), |mut counts, outcome| {
                match outcome.status {
                    OutcomeStatus::Completed { .. } => counts.completed += 1,
                    OutcomeStatus::Unsupported { .. } => counts.unsupported += 1,
                    OutcomeStatus::Failed { .. } => counts.failed += 1,
                }
                counts
            })
    }

    pub fn to_csv(&self) -> String {
        self.outcomes
            .iter()
            .map(TestOutcome::to_csv)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for BenchmarkResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.outcomes.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}
