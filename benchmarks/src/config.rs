//! Configuration management for sqlbench

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::adapters::{AdapterKind, ConnectionOptions};
use crate::error::{BenchError, Result};
use crate::report::OutputFormat;
use crate::runner::{RunOptions, Variant};
use crate::suite::FailurePolicy;

const JOURNAL_MODES: [&str; 6] = ["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];
const SYNCHRONOUS_MODES: [&str; 4] = ["OFF", "NORMAL", "FULL", "EXTRA"];

/// Main benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub benchmark: BenchmarkSettings,
    pub database: DatabaseSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSettings {
    pub adapters: Vec<AdapterKind>,
    pub variants: Vec<Variant>,
    pub include_large_dataset: bool,
    pub large_dataset_rows: usize,
    pub seed: u64,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub directory: PathBuf,
    pub journal_mode: String,
    pub synchronous: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let run = RunOptions::default();
        let connection = ConnectionOptions::default();
        Self {
            benchmark: BenchmarkSettings {
                adapters: AdapterKind::ALL.to_vec(),
                variants: Variant::ALL.to_vec(),
                include_large_dataset: run.include_large_dataset,
                large_dataset_rows: run.large_dataset_rows,
                seed: run.seed,
                failure_policy: FailurePolicy::default(),
            },
            database: DatabaseSettings {
                directory: connection.directory,
                journal_mode: connection.journal_mode,
                synchronous: connection.synchronous,
            },
            output: OutputSettings {
                format: OutputFormat::Table,
                file: None,
            },
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BenchError::Config(format!("{name} has an invalid value: {value}")))
}

fn parse_list<T: FromStr<Err = BenchError>>(value: &str) -> Result<Vec<T>> {
    value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(str::parse)
        .collect()
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields with any `SQLBENCH_*` variables that are set
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(adapters) = env_var("SQLBENCH_ADAPTERS") {
            self.benchmark.adapters = parse_list(&adapters)?;
        }

        if let Some(variants) = env_var("SQLBENCH_VARIANTS") {
            self.benchmark.variants = parse_list(&variants)?;
        }

        if let Some(large) = env_var("SQLBENCH_LARGE_DATASET") {
            self.benchmark.include_large_dataset = parse_env("SQLBENCH_LARGE_DATASET", &large)?;
        }

        if let Some(rows) = env_var("SQLBENCH_LARGE_DATASET_ROWS") {
            self.benchmark.large_dataset_rows = parse_env("SQLBENCH_LARGE_DATASET_ROWS", &rows)?;
        }

        if let Some(seed) = env_var("SQLBENCH_SEED") {
            self.benchmark.seed = parse_env("SQLBENCH_SEED", &seed)?;
        }

        if let Some(policy) = env_var("SQLBENCH_FAILURE_POLICY") {
            self.benchmark.failure_policy = policy.parse()?;
        }

        if let Some(directory) = env_var("SQLBENCH_DB_DIR") {
            self.database.directory = PathBuf::from(directory);
        }

        if let Some(mode) = env_var("SQLBENCH_JOURNAL_MODE") {
            self.database.journal_mode = mode;
        }

        if let Some(mode) = env_var("SQLBENCH_SYNCHRONOUS") {
            self.database.synchronous = mode;
        }

        if let Some(format) = env_var("SQLBENCH_OUTPUT_FORMAT") {
            self.output.format = format.parse()?;
        }

        if let Some(file) = env_var("SQLBENCH_OUTPUT_FILE") {
            self.output.file = Some(PathBuf::from(file));
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.benchmark.adapters.is_empty() {
            return Err(BenchError::Config("At least one adapter must be selected".to_string()));
        }

        if self.benchmark.variants.is_empty() {
            return Err(BenchError::Config("At least one variant must be selected".to_string()));
        }

        if self.benchmark.include_large_dataset && self.benchmark.large_dataset_rows == 0 {
            return Err(BenchError::Config(
                "Large dataset rows must be greater than 0".to_string(),
            ));
        }

        let journal_mode = self.database.journal_mode.to_ascii_uppercase();
        if !JOURNAL_MODES.contains(&journal_mode.as_str()) {
            return Err(BenchError::Config(format!(
                "Unknown journal mode: {}",
                self.database.journal_mode
            )));
        }

        let synchronous = self.database.synchronous.to_ascii_uppercase();
        if !SYNCHRONOUS_MODES.contains(&synchronous.as_str()) {
            return Err(BenchError::Config(format!(
                "Unknown synchronous mode: {}",
                self.database.synchronous
            )));
        }

        if self.database.directory.as_os_str().is_empty() {
            return Err(BenchError::Config("Database directory must be set".to_string()));
        }

        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            include_large_dataset: self.benchmark.include_large_dataset,
            large_dataset_rows: self.benchmark.large_dataset_rows,
            seed: self.benchmark.seed,
        }
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            directory: self.database.directory.clone(),
            journal_mode: self.database.journal_mode.to_ascii_uppercase(),
            synchronous: self.database.synchronous.to_ascii_uppercase(),
        }
    }
}
