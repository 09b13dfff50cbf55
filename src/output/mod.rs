//! Output formatters for batch results
//!
//! Provides table and JSON console output.

#![allow(dead_code)]

use crate::models::{Job, JobCategory};
use crate::results::BatchSummary;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a batch summary for the console.
    pub fn format_summary(&self, summary: &BatchSummary) -> String {
        match self.format {
            OutputFormat::Table => {
                let categories = summary.categories();
                format!(
                    "{summary}Functionality: {} | Wheat: {} | Chaff: {}\nDuration: {}ms\n",
                    categories.functionality,
                    categories.wheat,
                    categories.chaff,
                    summary.duration_ms()
                )
            }
            OutputFormat::Json => serde_json::to_string_pretty(summary)
                .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}")),
        }
    }

    /// Render a planned job matrix without running it.
    pub fn format_matrix(&self, jobs: &[Job]) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut out = String::new();
                let mut current: Option<JobCategory> = None;

                for job in jobs {
                    if current != Some(job.category) {
                        out.push_str(&format!("\n{} jobs:\n", job.category));
                        current = Some(job.category);
                    }
                    out.push_str(&format!("  {} -> {}\n", job, job.dir_name));
                }

                out.push_str(&format!("\n{} jobs total\n", jobs.len()));
                out
            }
            OutputFormat::Json => serde_json::to_string_pretty(jobs)
                .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobCategory;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("yaml"), None);
    }

    #[test]
    fn test_format_matrix_groups_by_category() {
        let jobs = vec![
            Job::new("/s/code.arr", "/i/t1.arr", "/s", JobCategory::Functionality),
            Job::new("/w/w1.arr", "/s/tests.arr", "/s", JobCategory::Wheat),
        ];

        let formatter = ResultFormatter::new(OutputFormat::Table);
        let out = formatter.format_matrix(&jobs);

        assert!(out.contains("Functionality jobs:"));
        assert!(out.contains("Wheat jobs:"));
        assert!(out.contains("2 jobs total"));
    }

    #[test]
    fn test_format_matrix_json_is_parseable() {
        let jobs = vec![Job::new(
            "/s/code.arr",
            "/i/t1.arr",
            "/s",
            JobCategory::Functionality,
        )];

        let formatter = ResultFormatter::new(OutputFormat::Json);
        let out = formatter.format_matrix(&jobs);
        let parsed: Vec<Job> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, jobs);
    }
}
