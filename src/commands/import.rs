// ABOUTME: Import command implementation
// ABOUTME: Unpacks the backup archive and replays every snapshot into the cluster

use crate::cluster::Cluster;
use crate::commands::preflight::check_liveness;
use crate::commands::report::RunReport;
use crate::config::MigrationConfig;
use crate::migration::{import_one, unpack};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The backup archive is not where the tool expects it
///
/// Kept as its own type so the CLI can answer with usage guidance instead of
/// a plain error line.
#[derive(Debug, Error)]
#[error("Unable to find cloudant tar archive '{}'", .path.display())]
pub struct MissingArchive {
    pub path: PathBuf,
}

/// Import every snapshot in `config.archive_path` into the cluster
///
/// Fatal problems (archive missing, cluster unreachable, archive unreadable)
/// are returned as errors before any database is recreated. Per-database
/// failures are collected in the returned [`RunReport`].
pub async fn import<C>(config: &MigrationConfig, cluster: &C) -> Result<RunReport>
where
    C: Cluster + ?Sized,
{
    if !config.archive_path.exists() {
        return Err(MissingArchive {
            path: config.archive_path.clone(),
        }
        .into());
    }

    check_liveness(cluster).await?;
    unpack(&config.archive_path, config.base_dir())?;

    let files = staged_files(&config.staging_dir)?;

    let mut outcomes = Vec::with_capacity(files.len());
    for path in files {
        outcomes.push(import_one(cluster, &path).await);
    }

    let report = RunReport::from_imports(outcomes);
    report.log_summary();

    discard_staging_dir(&config.staging_dir);
    tracing::info!("Import process complete");

    Ok(report)
}

/// Files of the unpacked staging directory, in directory listing order
fn staged_files(staging_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(staging_dir)
        .with_context(|| format!("Failed to list {}", staging_dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to list {}", staging_dir.display()))?;
        files.push(entry.path());
    }
    Ok(files)
}

fn discard_staging_dir(staging_dir: &Path) {
    tracing::debug!("Removing extracted directory {}", staging_dir.display());
    if let Err(e) = fs::remove_dir_all(staging_dir) {
        tracing::warn!(
            "⚠ Could not remove extracted directory {}: {}",
            staging_dir.display(),
            e
        );
    }
}
