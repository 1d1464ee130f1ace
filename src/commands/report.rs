// ABOUTME: Aggregates per-database outcomes of one export or import run
// ABOUTME: Decides the deferred run-level failure once every database was attempted

use crate::migration::{ExportOutcome, ImportOutcome};
use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Export,
    Import,
}

/// Outcome of a whole run, by database name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    pub succeeded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl RunReport {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn from_exports<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (String, ExportOutcome)>,
    {
        outcomes
            .into_iter()
            .fold(Self::new(RunMode::Export), |mut report, (database, outcome)| {
                match outcome {
                    ExportOutcome::Exported { .. } => report.succeeded.push(database),
                    ExportOutcome::Skipped(_) => report.skipped.push(database),
                    ExportOutcome::Failed(_) => report.failed.push(database),
                }
                report
            })
    }

    /// Ignored (non-snapshot) files are not part of the report
    pub fn from_imports<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = ImportOutcome>,
    {
        outcomes
            .into_iter()
            .fold(Self::new(RunMode::Import), |mut report, outcome| {
                match outcome {
                    ImportOutcome::Imported { database, .. } => report.succeeded.push(database),
                    ImportOutcome::Failed { database, .. } => report.failed.push(database),
                    ImportOutcome::Ignored => {}
                }
                report
            })
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn log_summary(&self) {
        let verb = match self.mode {
            RunMode::Export => "exported",
            RunMode::Import => "imported",
        };
        tracing::info!(
            "{} database(s) {}, {} skipped, {} failed",
            self.succeeded.len(),
            verb,
            self.skipped.len(),
            self.failed.len()
        );
        if self.has_failures() {
            tracing::debug!("Failed databases: {}", self.failed.join(", "));
        }
    }

    /// Turn any failed database into the run-level error
    pub fn ensure_success(self) -> Result<Self> {
        if self.has_failures() {
            match self.mode {
                RunMode::Export => bail!("Failed to export at least one database"),
                RunMode::Import => bail!("Failed to create or upload to at least one database"),
            }
        }
        Ok(self)
    }
}
