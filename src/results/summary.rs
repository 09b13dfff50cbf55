//! Batch summaries
//!
//! Aggregates the per-job records of one batch for console display and
//! export. Records can come straight from the executor or be scanned back
//! out of a results tree.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, warn};

use crate::models::{FailureKind, JobRecord, RESULT_FILE};

/// Summary of one grading batch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Unique batch run ID
    pub id: String,

    /// Timestamp when the batch started
    pub started_at: DateTime<Utc>,

    /// Timestamp when the batch completed
    pub completed_at: DateTime<Utc>,

    /// All per-job records, in working-directory order
    pub records: Vec<JobRecord>,
}

/// Per-category record counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub functionality: usize,
    pub wheat: usize,
    pub chaff: usize,
}

impl BatchSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        records: Vec<JobRecord>,
    ) -> Self {
        Self {
            id: generate_run_id(),
            started_at,
            completed_at,
            records,
        }
    }

    /// Scan a results tree back into a summary.
    ///
    /// Unreadable job directories are skipped with a warning; they indicate
    /// a batch that was killed before any record was written.
    pub fn load(results_dir: &Path) -> Result<Self> {
        let mut records = Vec::new();

        let mut entries: Vec<_> = fs::read_dir(results_dir)
            .with_context(|| format!("Failed to read {}", results_dir.display()))?
            .collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path().join(RESULT_FILE);
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping {}: {e:#}", path.display()),
            }
        }

        debug!("loaded {} records from {}", records.len(), results_dir.display());
        let now = Utc::now();
        Ok(Self::new(now, now, records))
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn ok_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failure_count(&self, kind: FailureKind) -> usize {
        self.records
            .iter()
            .filter(|r| r.failure_kind() == Some(kind))
            .count()
    }

    /// Category split recovered from implementation paths, matching the
    /// downstream reporting convention.
    pub fn categories(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for record in &self.records {
            if record.is_wheat() {
                counts.wheat += 1;
            } else if record.is_chaff() {
                counts.chaff += 1;
            } else {
                counts.functionality += 1;
            }
        }
        counts
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// Export the records to `path` in the given format.
    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), self)
                    .context("Failed to write summary")?;
            }
            ExportFormat::Csv => {
                let mut writer =
                    csv::Writer::from_path(path).context("Failed to create CSV writer")?;

                writer.write_record(["code", "tests", "outcome", "passed", "total"])?;
                for record in &self.records {
                    let outcome = match record.failure_kind() {
                        None => "Ok".to_string(),
                        Some(kind) => kind.to_string(),
                    };
                    let (passed, total) = record.tally();
                    writer.write_record([
                        record.implementation.to_string_lossy().into_owned(),
                        record.test_suite.to_string_lossy().into_owned(),
                        outcome,
                        passed.to_string(),
                        total.to_string(),
                    ])?;
                }
                writer.flush()?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Batch {} - {} jobs", self.id, self.total())?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for record in &self.records {
            writeln!(f, "  {record}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        write!(f, "Ok: {}", self.ok_count())?;
        for kind in FailureKind::all() {
            let count = self.failure_count(kind);
            if count > 0 {
                write!(f, " | {kind}: {count}")?;
            }
        }
        writeln!(f)
    }
}

fn read_record(path: &Path) -> Result<JobRecord> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Generate unique run ID
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Export format
#[derive(Clone, Copy, Debug)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TestBlock, TestEntry};

    fn records() -> Vec<JobRecord> {
        vec![
            JobRecord::suite(
                "/sub/hw-code.arr",
                "/results/a/tests.arr",
                vec![TestBlock {
                    name: "check".to_string(),
                    loc: "tests.arr".to_string(),
                    error: false,
                    tests: vec![TestEntry {
                        loc: "tests.arr".to_string(),
                        passed: true,
                    }],
                }],
            ),
            JobRecord::failure(
                "/instructor/impls/wheat/w1.arr",
                "/results/b/tests.arr",
                FailureKind::Compilation,
            ),
            JobRecord::failure(
                "/instructor/impls/chaff/c1.arr",
                "/results/c/tests.arr",
                FailureKind::Timeout,
            ),
        ]
    }

    #[test]
    fn test_counts() {
        let now = Utc::now();
        let summary = BatchSummary::new(now, now, records());

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.ok_count(), 1);
        assert_eq!(summary.failure_count(FailureKind::Compilation), 1);
        assert_eq!(summary.failure_count(FailureKind::Timeout), 1);
        assert_eq!(
            summary.categories(),
            CategoryCounts {
                functionality: 1,
                wheat: 1,
                chaff: 1
            }
        );
    }

    #[test]
    fn test_load_scans_job_directories() {
        let dir = tempfile::tempdir().unwrap();
        for (name, record) in ["a;t", "b;t", "c;t"].iter().zip(records()) {
            let job_dir = dir.path().join(name);
            fs::create_dir_all(&job_dir).unwrap();
            fs::write(
                job_dir.join(RESULT_FILE),
                serde_json::to_string(&record).unwrap(),
            )
            .unwrap();
        }
        // A directory without a record is skipped, not fatal.
        fs::create_dir_all(dir.path().join("dead;t")).unwrap();

        let summary = BatchSummary::load(dir.path()).unwrap();
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_export_csv() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let summary = BatchSummary::new(now, now, records());

        let path = dir.path().join("summary.csv");
        summary.export(&path, ExportFormat::Csv).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("code,tests,outcome,passed,total"));
        assert!(content.contains("Compilation"));
        assert!(content.contains("/sub/hw-code.arr"));
    }

    #[test]
    fn test_export_format_detection() {
        assert!(matches!(
            ExportFormat::from_extension(Path::new("out.csv")),
            Some(ExportFormat::Csv)
        ));
        assert!(matches!(
            ExportFormat::from_str("JSON"),
            Some(ExportFormat::Json)
        ));
        assert!(ExportFormat::from_str("xml").is_none());
    }

    #[test]
    fn test_run_ids_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
    }
}
