// ABOUTME: Export command implementation
// ABOUTME: Exports every eligible database to a snapshot and packs them into the backup archive

use crate::cluster::Cluster;
use crate::commands::preflight::{check_liveness, list_databases};
use crate::commands::report::RunReport;
use crate::config::MigrationConfig;
use crate::filters::DatabaseFilter;
use crate::migration::{export_one, pack};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Export all databases of the cluster into `config.archive_path`
///
/// Fatal problems (staging path is a file, cluster unreachable, listing
/// fails, archive cannot be written) are returned as errors. Per-database
/// failures do not stop the loop; they are collected in the returned
/// [`RunReport`] and the archive is produced with whatever succeeded.
pub async fn export<C>(config: &MigrationConfig, cluster: &C) -> Result<RunReport>
where
    C: Cluster + ?Sized,
{
    prepare_staging_dir(&config.staging_dir)?;

    check_liveness(cluster).await?;
    let databases = list_databases(cluster).await?;

    tracing::info!("Exporting databases");
    let filter = DatabaseFilter::new(config.excluded_databases.iter().cloned());

    let mut outcomes = Vec::new();
    for database in filter.databases_to_migrate(&databases) {
        let outcome = export_one(cluster, &config.staging_dir, database).await;
        outcomes.push((database.to_string(), outcome));
    }

    let report = RunReport::from_exports(outcomes);
    report.log_summary();

    pack(&config.staging_dir, &config.archive_path, &databases)?;
    tracing::info!(
        "Export process complete, resulting archive is {}",
        config.archive_path.display()
    );

    Ok(report)
}

/// Make sure the staging directory exists; existing contents are kept
fn prepare_staging_dir(staging_dir: &Path) -> Result<()> {
    if staging_dir.exists() {
        if !staging_dir.is_dir() {
            bail!(
                "{} exists as a file, please move or remove it",
                staging_dir.display()
            );
        }
        return Ok(());
    }

    tracing::debug!("Creating backup directory: {}", staging_dir.display());
    fs::create_dir_all(staging_dir).with_context(|| {
        format!(
            "Failed to create backup directory {}",
            staging_dir.display()
        )
    })?;
    Ok(())
}
