// ABOUTME: Exports a single database from the cluster into a snapshot file
// ABOUTME: Classifies each database as exported, skipped, or failed without aborting the run

use crate::cluster::Cluster;
use crate::snapshot::{snapshot_path, write_snapshot, AllDocs, SnapshotFile};
use crate::utils::sanitize_identifier;
use serde_json::Value;
use std::path::Path;

/// Database whose users are listed in the log when exported
pub const USERS_DATABASE: &str = "privatecloud-users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The cluster answered 2xx but the body carried an `error` field
    ErrorResponse(String),
    /// The database holds no documents
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Exported { documents: usize },
    Skipped(SkipReason),
    Failed(String),
}

impl ExportOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ExportOutcome::Failed(_))
    }
}

/// Export one database into `<staging_dir>/<database>.json`
///
/// Fetches every document with its body and writes the listing wrapped under
/// a `docs` key. Only an `Exported` outcome leaves a file behind.
pub async fn export_one<C>(cluster: &C, staging_dir: &Path, database: &str) -> ExportOutcome
where
    C: Cluster + ?Sized,
{
    let display_name = sanitize_identifier(database);
    tracing::info!("Exporting database {}", display_name);

    let response = match cluster.all_docs(database).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Exception caught when exporting from cloudant server");
            tracing::error!("{:#}", e);
            return ExportOutcome::Failed(format!("{:#}", e));
        }
    };

    if !response.is_success() {
        tracing::error!(
            "Connecting to cloudant server returned status code: {}",
            response.status
        );
        return ExportOutcome::Failed(format!("status code {}", response.status));
    }

    let Some(body) = response.body else {
        tracing::error!("Response for database {} is not valid JSON", display_name);
        return ExportOutcome::Failed("response body is not valid JSON".to_string());
    };

    if let Some(error) = body.get("error") {
        tracing::warn!("⚠ {} contains error, not exporting", display_name);
        tracing::debug!("Error returned for {}: {}", display_name, error);
        return ExportOutcome::Skipped(SkipReason::ErrorResponse(error_text(error)));
    }

    let listing: AllDocs = match serde_json::from_value(body) {
        Ok(listing) => listing,
        Err(e) => {
            tracing::error!(
                "Unexpected document listing for database {}: {}",
                display_name,
                e
            );
            return ExportOutcome::Failed(format!("malformed document listing: {}", e));
        }
    };

    if listing.is_empty() {
        tracing::warn!("⚠ {} is zero-sized, not exporting", display_name);
        return ExportOutcome::Skipped(SkipReason::Empty);
    }

    if database == USERS_DATABASE {
        log_users_info(&listing);
    }

    let documents = listing.rows.len();
    let path = snapshot_path(staging_dir, database);
    tracing::debug!("Writing database {} to json file", display_name);

    if let Err(e) = write_snapshot(&path, &SnapshotFile::new(listing)) {
        tracing::error!("Failed to write snapshot for {}: {:#}", display_name, e);
        return ExportOutcome::Failed(format!("{:#}", e));
    }

    tracing::info!("✓ Exported {} document(s) from {}", documents, display_name);
    ExportOutcome::Exported { documents }
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Log the id and `uid` of every user document
fn log_users_info(listing: &AllDocs) {
    tracing::info!("Found {} users:", listing.rows.len());

    for row in &listing.rows {
        let user_id = row.get("id").and_then(Value::as_str).unwrap_or("<unknown>");
        let uid = row
            .get("doc")
            .and_then(|doc| doc.get("uid"))
            .map(|uid| match uid {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::info!(
            "user {} with uid {}",
            sanitize_identifier(user_id),
            sanitize_identifier(&uid)
        );
    }
}
