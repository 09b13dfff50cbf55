//! Pyret autograder - wheat/chaff grading execution engine
//!
//! Grades a submitted Pyret program by pairing it against instructor test
//! suites, reference-correct implementations ("wheats"), and intentionally
//! buggy implementations ("chaffs"), producing one structured result record
//! per pair.
//!
//! ## Usage
//!
//! ```bash
//! # Run the full batch described by the config file
//! pyret-grader grade --config grader.yaml
//!
//! # Restrict chaffs and skip wheats
//! pyret-grader grade --no-wheats --chaff chaff1.arr
//!
//! # Inspect the matrix without running anything
//! pyret-grader matrix
//!
//! # Summarize and export a finished results tree
//! pyret-grader results --export summary.csv
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

mod cache;
mod classifier;
mod cli;
mod compiler;
mod config;
mod executor;
mod matrix;
mod models;
mod output;
mod resolver;
mod results;
mod sandbox;
mod utils;

use cli::Args;
use config::GraderConfig;
use executor::BatchExecutor;
use matrix::MatrixBuilder;
use models::Submission;
use output::{OutputFormat, ResultFormatter};
use results::{BatchSummary, ExportFormat};
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    init_logger(level);

    match args.command {
        cli::Command::Grade(grade_args) => {
            run_grade(grade_args).await?;
        }
        cli::Command::Matrix(matrix_args) => {
            show_matrix(matrix_args)?;
        }
        cli::Command::Results(results_args) => {
            show_results(results_args)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<GraderConfig> {
    match path {
        Some(path) => GraderConfig::load(path),
        None => GraderConfig::load_default(),
    }
}

async fn run_grade(args: cli::GradeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    if let Some(submission) = &args.submission {
        config.layout.submission = PathBuf::from(submission);
    }
    if args.no_wheats {
        config.selection.use_wheats = false;
    }
    if !args.chaffs.is_empty() {
        config.selection.chaffs = Some(args.chaffs.clone());
    }
    if let Some(concurrent) = args.concurrent {
        config.execution.max_concurrent = Some(concurrent);
    }
    if let Some(limit) = args.time_limit {
        config.execution.time_limit_secs = Some(limit);
    }

    let submission = Submission::discover(&config.layout.submission)?;
    info!(
        "grading submission {}",
        submission.code.display()
    );

    let jobs = MatrixBuilder::new(&config, &submission).build()?;
    let summary = BatchExecutor::new(config).run(jobs).await?;

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table));
    println!("{}", formatter.format_summary(&summary));

    Ok(())
}

fn show_matrix(args: cli::MatrixArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(submission) = &args.submission {
        config.layout.submission = PathBuf::from(submission);
    }

    let submission = Submission::discover(&config.layout.submission)?;
    let jobs = MatrixBuilder::new(&config, &submission).plan()?;

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table));
    println!("{}", formatter.format_matrix(&jobs));

    Ok(())
}

fn show_results(args: cli::ResultsArgs) -> Result<()> {
    let dir = match &args.dir {
        Some(dir) => PathBuf::from(dir),
        None => load_config(args.config.as_deref())?.layout.results,
    };

    let summary = BatchSummary::load(&dir)?;

    let formatter =
        ResultFormatter::new(OutputFormat::from_str(&args.format).unwrap_or(OutputFormat::Table));
    println!("{}", formatter.format_summary(&summary));

    if let Some(export_path) = &args.export {
        let path = PathBuf::from(export_path);
        let format = ExportFormat::from_extension(&path).unwrap_or(ExportFormat::Json);
        summary.export(&path, format)?;
        println!("Exported results to: {}", path.display());
    }

    Ok(())
}

fn manage_config(args: cli::ConfigArgs) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            GraderConfig::default().save(path)?;
            println!("Configuration file created: {output}");
            println!("Edit the file to match your grading environment.");
        }

        cli::ConfigAction::Show { file, format } => {
            let config = load_config(file.as_deref())?;
            let rendered = if format == "json" {
                serde_json::to_string_pretty(&config)?
            } else {
                serde_yaml::to_string(&config)?
            };
            println!("{rendered}");
        }

        cli::ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| {
                GraderConfig::find()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_else(|| "./pyret-grader.yaml".to_string())
            });

            match GraderConfig::load(&path) {
                Ok(_) => {
                    println!("Configuration file is valid: {path}");
                }
                Err(e) => {
                    println!("Configuration file is invalid: {path}");
                    println!("  Error: {e}");
                    return Err(e);
                }
            }
        }
    }

    Ok(())
}
