//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Wheat/chaff autograding execution engine for Pyret assignments
#[derive(Parser, Debug)]
#[command(name = "pyret-grader")]
#[command(version = "0.1.0")]
#[command(about = "Grade a Pyret submission against instructor tests, wheats, and chaffs")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full grading batch
    Grade(GradeArgs),

    /// Print the job matrix without running it
    Matrix(MatrixArgs),

    /// Summarize a results tree
    Results(ResultsArgs),

    /// Manage configuration files
    Config(ConfigArgs),
}

/// Arguments for the grade command
#[derive(Parser, Debug)]
pub struct GradeArgs {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Submission directory override
    #[arg(short, long)]
    pub submission: Option<String>,

    /// Skip wheat jobs
    #[arg(long)]
    pub no_wheats: bool,

    /// Restrict chaff jobs to these file names (repeatable)
    #[arg(long = "chaff")]
    pub chaffs: Vec<String>,

    /// Worker pool size (defaults to available parallelism)
    #[arg(long)]
    pub concurrent: Option<usize>,

    /// In-engine wall-clock limit per run, in seconds
    #[arg(long)]
    pub time_limit: Option<u64>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for the matrix command
#[derive(Parser, Debug)]
pub struct MatrixArgs {
    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Submission directory override
    #[arg(short, long)]
    pub submission: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for the results command
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    /// Results directory (defaults to the configured tree)
    #[arg(short, long)]
    pub dir: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Export records to a file (format from extension: .json, .csv)
    #[arg(short, long)]
    pub export: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./pyret-grader.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Configuration file (defaults to the standard search path)
        #[arg(short, long)]
        file: Option<String>,

        /// Output format (yaml, json)
        #[arg(long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file
        file: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_args() {
        let args = Args::parse_from([
            "pyret-grader",
            "grade",
            "--no-wheats",
            "--chaff",
            "c1.arr",
            "--chaff",
            "c2.arr",
            "--concurrent",
            "4",
        ]);
        match args.command {
            Command::Grade(grade) => {
                assert!(grade.no_wheats);
                assert_eq!(grade.chaffs, vec!["c1.arr", "c2.arr"]);
                assert_eq!(grade.concurrent, Some(4));
            }
            _ => panic!("Expected Grade command"),
        }
    }

    #[test]
    fn test_matrix_args() {
        let args = Args::parse_from(["pyret-grader", "matrix", "--format", "json"]);
        match args.command {
            Command::Matrix(matrix) => {
                assert_eq!(matrix.format, "json");
            }
            _ => panic!("Expected Matrix command"),
        }
    }

    #[test]
    fn test_config_init_args() {
        let args = Args::parse_from(["pyret-grader", "config", "init", "--force"]);
        match args.command {
            Command::Config(config) => match config.action {
                ConfigAction::Init { output, force } => {
                    assert_eq!(output, "./pyret-grader.yaml");
                    assert!(force);
                }
                _ => panic!("Expected Init action"),
            },
            _ => panic!("Expected Config command"),
        }
    }
}
