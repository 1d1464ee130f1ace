// ABOUTME: Packs the staging directory into the backup tar archive and unpacks it again
// ABOUTME: Cleans up exported snapshot files once they are safely archived

use crate::config::BACKUP_DIR_NAME;
use crate::snapshot::snapshot_path;
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tar::{Archive, Builder};

/// Archive `staging_dir` as `cloudant-backup/` into `archive_path`
///
/// After archiving, the snapshot files of `databases` are removed followed by
/// the staging directory itself. A staging directory that still holds other
/// files is left in place with a warning.
pub fn pack(staging_dir: &Path, archive_path: &Path, databases: &[String]) -> Result<()> {
    tracing::info!("Creating tar archive: {}", archive_path.display());

    let parent = archive_path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp archive in {}", parent.display()))?;

    let mut builder = Builder::new(tmp);
    builder
        .append_dir_all(BACKUP_DIR_NAME, staging_dir)
        .with_context(|| format!("Failed to add {} to tar archive", staging_dir.display()))?;
    let tmp = builder
        .into_inner()
        .context("Failed to finish tar archive")?;
    tmp.persist(archive_path)
        .with_context(|| format!("Failed to write tar file {}", archive_path.display()))?;

    tracing::debug!("Removing exported directory");
    remove_staged_snapshots(staging_dir, databases)?;

    if !archive_path.exists() {
        bail!("Failed to produce tar file {}", archive_path.display());
    }

    Ok(())
}

fn remove_staged_snapshots(staging_dir: &Path, databases: &[String]) -> Result<()> {
    for database in databases {
        let path = snapshot_path(staging_dir, database);
        if path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }

    if let Err(e) = fs::remove_dir(staging_dir) {
        tracing::warn!(
            "⚠ Could not remove staging directory {}: {}",
            staging_dir.display(),
            e
        );
    }

    Ok(())
}

/// Extract `archive_path` into `dest_dir`, which must then contain `cloudant-backup/`
///
/// Any `cloudant-backup/` already present in `dest_dir` is removed first, so
/// the staging directory can only hold what this archive contained. An
/// archive without a single `cloudant-backup/` entry (including an empty
/// file) is rejected.
pub fn unpack(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    tracing::info!("Extracting tar archive: {}", archive_path.display());

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to read tar file {}", archive_path.display()))?;

    let staging_dir = dest_dir.join(BACKUP_DIR_NAME);
    remove_stale_staging(&staging_dir)?;

    let mut archive = Archive::new(BufReader::new(file));
    let entries = archive
        .entries()
        .with_context(|| format!("Failed to extract tar file {}", archive_path.display()))?;

    let mut extracted = 0usize;
    for entry in entries {
        let mut entry = entry
            .with_context(|| format!("Failed to extract tar file {}", archive_path.display()))?;
        let entry_path = entry
            .path()
            .with_context(|| format!("Failed to extract tar file {}", archive_path.display()))?
            .into_owned();

        if !entry_path.starts_with(BACKUP_DIR_NAME) {
            tracing::warn!(
                "⚠ Ignoring archive entry outside {}: {}",
                BACKUP_DIR_NAME,
                entry_path.display()
            );
            continue;
        }

        entry
            .unpack_in(dest_dir)
            .with_context(|| format!("Failed to extract tar file {}", archive_path.display()))?;
        extracted += 1;
    }

    if extracted == 0 {
        bail!(
            "Tar file {} contains no {} entries",
            archive_path.display(),
            BACKUP_DIR_NAME
        );
    }

    if !staging_dir.is_dir() {
        bail!(
            "Extracting tar file did not result in: {}",
            staging_dir.display()
        );
    }

    Ok(())
}

fn remove_stale_staging(staging_dir: &Path) -> Result<()> {
    let Ok(metadata) = fs::symlink_metadata(staging_dir) else {
        return Ok(());
    };

    tracing::debug!("Removing stale directory {}", staging_dir.display());
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(staging_dir)
    } else {
        fs::remove_file(staging_dir)
    };
    removed.with_context(|| format!("Failed to remove stale {}", staging_dir.display()))
}
