//! Result persistence and batch reporting
//!
//! Provides the per-job record writer and batch-level summary loading,
//! formatting, and export.

#![allow(dead_code)]

mod summary;
mod writer;

pub use summary::{BatchSummary, CategoryCounts, ExportFormat};
pub use writer::ResultWriter;
