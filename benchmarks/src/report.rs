//! Aligned comparison of several suites
//!
//! Rows are keyed by catalogue position, not by index into a suite's outcome
//! list, so a suite that skipped a test shows `N/A` in that row and every
//! later row stays aligned.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalogue::TestCase;
use crate::error::{BenchError, Result};
use crate::results::{BenchmarkResults, OutcomeStatus};

pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(BenchError::Config(format!("Unknown output format: {other}"))),
        }
    }
}

/// One cell of the comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Duration(f64),
    Unsupported,
    Failed,
    /// The suite has no outcome for this test
    NotApplicable,
}

impl Cell {
    fn from_status(status: Option<&OutcomeStatus>) -> Self {
        match status {
            Some(OutcomeStatus::Completed { duration_ms }) => Cell::Duration(*duration_ms),
            Some(OutcomeStatus::Unsupported { .. }) => Cell::Unsupported,
            Some(OutcomeStatus::Failed { .. }) => Cell::Failed,
            None => Cell::NotApplicable,
        }
    }

    /// CSV keeps one marker for every cell without a duration
    fn csv_value(&self) -> String {
        match self {
            Cell::Duration(_) => self.to_string(),
            _ => NOT_APPLICABLE.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Duration(ms) => write!(f, "{ms:.2}"),
            Cell::Unsupported => f.write_str("unsupported"),
            Cell::Failed => f.write_str("failed"),
            Cell::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub test: TestCase,
    pub cells: Vec<Cell>,
}

/// Suites as columns, catalogue tests as rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub suites: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    /// Every test that appears in at least one suite gets a row, in
    /// catalogue order
    pub fn build(results: &[BenchmarkResults]) -> Self {
        let rows = TestCase::ALL
            .into_iter()
            .filter(|case| results.iter().any(|suite| suite.get(*case).is_some()))
            .map(|case| ComparisonRow {
                test: case,
                cells: results
                    .iter()
                    .map(|suite| Cell::from_status(suite.get(case).map(|o| &o.status)))
                    .collect(),
            })
            .collect();

        Self {
            suites: results.iter().map(|suite| suite.suite.clone()).collect(),
            rows,
        }
    }

    pub fn cell(&self, case: TestCase, suite: &str) -> Option<&Cell> {
        let column = self.suites.iter().position(|name| name == suite)?;
        self.rows
            .iter()
            .find(|row| row.test == case)
            .and_then(|row| row.cells.get(column))
    }

    /// `,Test,<suite...>` header then `<row>,<test>,<cells...>`
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec![String::new(), "Test".to_string()];
        header.extend(self.suites.iter().cloned());
        writer.write_record(&header)?;

        for (index, row) in self.rows.iter().enumerate() {
            let mut record = vec![(index + 1).to_string(), row.test.name().to_string()];
            record.extend(row.cells.iter().map(Cell::csv_value));
            writer.write_record(&record)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| BenchError::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| BenchError::Config(e.to_string()))
    }

    pub fn render_text(&self) -> String {
        let name_width = self
            .rows
            .iter()
            .map(|row| row.test.name().len())
            .chain(std::iter::once("Test".len()))
            .max()
            .unwrap_or_default();
        let widths: Vec<usize> = self
            .suites
            .iter()
            .enumerate()
            .map(|(column, suite)| {
                self.rows
                    .iter()
                    .map(|row| row.cells[column].to_string().len())
                    .chain(std::iter::once(suite.len()))
                    .max()
                    .unwrap_or_default()
            })
            .collect();

        let mut out = format!("{:<name_width$}", "Test");
        for (suite, &width) in self.suites.iter().zip(&widths) {
            out.push_str(&format!(" | {suite:>width$}"));
        }
        out.push('\n');
        out.push_str(&"-".repeat(name_width));
        for width in &widths {
            out.push_str(&format!("-+-{}", "-".repeat(*width)));
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format!("{:<name_width$}", row.test.name()));
            for (cell, &width) in row.cells.iter().zip(&widths) {
                out.push_str(&format!(" | {:>width$}", cell.to_string()));
            }
            out.push('\n');
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(self.render_text()),
            OutputFormat::Csv => self.to_csv(),
            OutputFormat::Json => self.to_json(),
        }
    }

    /// Write the rendered table to `path`, creating parent directories
    pub fn export(&self, path: &Path, format: OutputFormat) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render(format)?)?;
        info!("Results written to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}
