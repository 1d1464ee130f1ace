// ABOUTME: Imports a single snapshot file back into the cluster
// ABOUTME: Recreates the destination database and bulk-inserts the prepared documents

use crate::cluster::Cluster;
use crate::snapshot::{database_name_from_path, read_snapshot};
use crate::transform::prepare_documents;
use crate::utils::{sanitize_identifier, validate_database_name};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported {
        database: String,
        documents: usize,
    },
    /// Not a snapshot file; left alone
    Ignored,
    Failed {
        database: String,
        reason: String,
    },
}

impl ImportOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ImportOutcome::Failed { .. })
    }

    fn failed(database: &str, error: anyhow::Error) -> Self {
        ImportOutcome::Failed {
            database: database.to_string(),
            reason: format!("{:#}", error),
        }
    }
}

/// Import one snapshot file; the database name is the file name without `.json`
///
/// Documents are prepared before the destination is touched, so a snapshot
/// with malformed rows fails without deleting anything. Once prepared, the
/// database is deleted, created empty and filled with a single bulk call.
pub async fn import_one<C>(cluster: &C, snapshot_file: &Path) -> ImportOutcome
where
    C: Cluster + ?Sized,
{
    let file_name = snapshot_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(database) = database_name_from_path(snapshot_file) else {
        tracing::warn!(
            "⚠ File {} is not a json file, not importing",
            sanitize_identifier(&file_name)
        );
        return ImportOutcome::Ignored;
    };

    if !snapshot_file.is_file() {
        tracing::warn!(
            "⚠ {} is not a regular file, not importing",
            sanitize_identifier(&file_name)
        );
        return ImportOutcome::Ignored;
    }

    match import_database(cluster, snapshot_file, &database).await {
        Ok(documents) => ImportOutcome::Imported {
            database,
            documents,
        },
        Err(e) => {
            tracing::error!(
                "Failed to import database {}: {:#}",
                sanitize_identifier(&database),
                e
            );
            ImportOutcome::failed(&database, e)
        }
    }
}

async fn import_database<C>(cluster: &C, snapshot_file: &Path, database: &str) -> Result<usize>
where
    C: Cluster + ?Sized,
{
    tracing::debug!("Opening {}", snapshot_file.display());
    tracing::debug!("Database name: {}", sanitize_identifier(database));

    validate_database_name(database)?;

    let snapshot = read_snapshot(snapshot_file)?;
    let docs = prepare_documents(snapshot.rows())
        .with_context(|| format!("Snapshot {} is malformed", snapshot_file.display()))?;

    recreate_database(cluster, database).await?;
    bulk_upload(cluster, database, &docs).await?;

    Ok(docs.len())
}

/// Delete `database` and create it again, empty
///
/// The delete status is not checked, so a missing database is fine; the
/// create must answer 200 or 201.
pub async fn recreate_database<C>(cluster: &C, database: &str) -> Result<()>
where
    C: Cluster + ?Sized,
{
    let display_name = sanitize_identifier(database);

    tracing::info!("Deleting database {}", display_name);
    let response = cluster
        .delete_database(database)
        .await
        .context("Exception caught when deleting database in cloudant server")?;
    if response.status == 404 {
        tracing::debug!("Database {} did not exist", display_name);
    }

    tracing::info!("Creating database {}", display_name);
    let response = cluster
        .create_database(database)
        .await
        .context("Exception caught when creating database in cloudant server")?;

    if !response.is_created() {
        bail!(
            "Non-successful status code when creating database {}: {}",
            display_name,
            response.status
        );
    }

    Ok(())
}

/// Submit all documents in one `_bulk_docs` call
///
/// Per-document rejections inside a successful response are logged as
/// warnings; only a failed call or non-200/201 status is an error.
pub async fn bulk_upload<C>(cluster: &C, database: &str, docs: &[Value]) -> Result<()>
where
    C: Cluster + ?Sized,
{
    let display_name = sanitize_identifier(database);
    tracing::info!("Uploading {} document(s) to database {}", docs.len(), display_name);

    let response = cluster
        .bulk_docs(database, docs)
        .await
        .context("Exception caught when importing to cloudant server")?;

    if !response.is_created() {
        bail!(
            "Non-successful status code when uploading to database {}: {}",
            display_name,
            response.status
        );
    }

    let rejected = response
        .body
        .as_ref()
        .and_then(Value::as_array)
        .map(|results| results.iter().filter(|r| r.get("error").is_some()).count())
        .unwrap_or(0);
    if rejected > 0 {
        tracing::warn!(
            "⚠ {} of {} document(s) were rejected by database {}",
            rejected,
            docs.len(),
            display_name
        );
    }

    tracing::info!("✓ Uploaded database {}", display_name);
    Ok(())
}
