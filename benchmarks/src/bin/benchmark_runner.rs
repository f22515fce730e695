//! sqlbench benchmark runner
//!
//! Runs the workload catalogue against the configured adapters and prints the
//! comparison table.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlbench::{
    catalogue::catalogue, init, AdapterKind, BenchError, BenchmarkSuite, Config, FailurePolicy,
    OutputFormat, TestCase, Variant,
};
use tracing::{error, info, warn};

const DEFAULT_CONFIG: &str = "sqlbench.toml";

#[derive(Parser)]
#[command(name = "benchmark-runner")]
#[command(about = "Cross-adapter SQLite benchmark runner")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (table, csv, json)
    #[arg(short, long, global = true)]
    output: Option<OutputFormat>,

    /// Output file
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the catalogue against every selected adapter
    Run {
        /// Adapters to run, comma separated
        #[arg(short, long, value_delimiter = ',')]
        adapters: Vec<AdapterKind>,

        /// Variants to run, comma separated
        #[arg(long, value_delimiter = ',')]
        variants: Vec<Variant>,

        /// Only run these tests, by label (`1`, `17b`) or full name
        #[arg(short, long = "test", value_name = "TEST")]
        tests: Vec<String>,

        /// Seed and scan the large dataset table
        #[arg(long)]
        large_dataset: bool,

        /// Rows seeded into the large dataset table
        #[arg(long)]
        large_dataset_rows: Option<usize>,

        /// Seed of the workload data generator
        #[arg(long)]
        seed: Option<u64>,

        /// What to do when an adapter cannot set up or tear down
        #[arg(long)]
        failure_policy: Option<FailurePolicy>,

        /// Directory for the database files
        #[arg(long)]
        db_dir: Option<PathBuf>,
    },
    /// List the catalogue and the available adapters
    List,
    /// Validate benchmark configuration
    Validate,
    /// Generate sample configuration
    Config {
        /// Where to write the configuration
        #[arg(default_value = DEFAULT_CONFIG)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init(cli.verbose);

    if let Err(e) = dispatch(&cli).await {
        error!("{:#}", e);
        let code = e
            .downcast_ref::<BenchError>()
            .map_or(1, BenchError::exit_code);
        std::process::exit(code);
    }
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run {
            adapters,
            variants,
            tests,
            large_dataset,
            large_dataset_rows,
            seed,
            failure_policy,
            db_dir,
        } => {
            let mut config = load_config(cli)?;
            if !adapters.is_empty() {
                config.benchmark.adapters = adapters.clone();
            }
            if !variants.is_empty() {
                config.benchmark.variants = variants.clone();
            }
            if *large_dataset {
                config.benchmark.include_large_dataset = true;
            }
            if let Some(rows) = large_dataset_rows {
                config.benchmark.large_dataset_rows = *rows;
            }
            if let Some(seed) = seed {
                config.benchmark.seed = *seed;
            }
            if let Some(policy) = failure_policy {
                config.benchmark.failure_policy = *policy;
            }
            if let Some(dir) = db_dir {
                config.database.directory = dir.clone();
            }

            let cases = select_tests(tests)?;
            if cases.contains(&TestCase::LargeScan) {
                config.benchmark.include_large_dataset = true;
            }

            run_command(config, cases, cli).await
        }
        Commands::List => list_command(),
        Commands::Validate => validate_command(cli),
        Commands::Config { path, force } => generate_config_command(path, *force),
    }
}

/// Configuration file (if any), then `SQLBENCH_*` variables, then output flags
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(format) = cli.output {
        config.output.format = format;
    }
    if let Some(file) = &cli.file {
        config.output.file = Some(file.clone());
    }
    Ok(config)
}

fn select_tests(tests: &[String]) -> Result<Vec<TestCase>> {
    tests
        .iter()
        .map(|test| {
            TestCase::find(test).ok_or_else(|| {
                anyhow::Error::from(BenchError::Config(format!("Unknown test: {test}")))
            })
        })
        .collect()
}

async fn run_command(config: Config, cases: Vec<TestCase>, cli: &Cli) -> Result<()> {
    info!(
        "Benchmark session started at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let mut suite = BenchmarkSuite::from_config(&config)?;
    if !cases.is_empty() {
        suite = suite.with_cases(cases);
    }
    info!(
        "Adapters: {} | variants: {}",
        suite.adapter_names().join(", "),
        config
            .benchmark
            .variants
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let start_time = std::time::Instant::now();
    let report = suite.run().await?;
    info!(
        "Completed {} suites in {:.2?}",
        report.results.len(),
        start_time.elapsed()
    );

    for results in &report.results {
        let counts = results.counts();
        info!(
            "{}: {} completed, {} unsupported, {} failed",
            results.suite, counts.completed, counts.unsupported, counts.failed
        );
    }

    let table = report.comparison();
    match &config.output.file {
        Some(path) => table.export(path, config.output.format)?,
        None => println!("{}", table.render(config.output.format)?),
    }

    if report.has_failures() {
        for failure in &report.failures {
            warn!("Suite {} could not run: {}", failure.suite, failure.message);
        }
        if cli.verbose {
            info!("Failed suites are shown as N/A columns");
        }
        bail!(
            "{} of {} suites could not run",
            report.failures.len(),
            report.results.len()
        );
    }

    Ok(())
}

fn list_command() -> Result<()> {
    println!("Tests:");
    let default_run = catalogue(false);
    for case in TestCase::ALL {
        let note = if !default_run.contains(&case) {
            " (requires --large-dataset)"
        } else if case.is_batch_dependent() {
            " (batched variant)"
        } else {
            ""
        };
        println!("  {:>4}  {}{}", case.label(), case.name(), note);
    }

    println!("\nAdapters:");
    for kind in AdapterKind::ALL {
        let batch = if kind.supports_batch() {
            "batch"
        } else {
            "no batch"
        };
        println!("  {:<16} {:<9} {}", kind.name(), batch, kind.description());
    }

    Ok(())
}

fn validate_command(cli: &Cli) -> Result<()> {
    let source = cli
        .config
        .as_deref()
        .map_or_else(|| "defaults".to_string(), |path| path.display().to_string());
    info!("Validating configuration: {}", source);

    let config = load_config(cli)?;
    config.validate()?;
    println!("Configuration is valid");
    Ok(())
}

fn generate_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(BenchError::Config(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        ))
        .into());
    }

    Config::default().save_to_file(path)?;
    info!("Generated sample configuration: {}", path.display());
    Ok(())
}
