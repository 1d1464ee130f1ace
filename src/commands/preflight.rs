// ABOUTME: Cluster checks that must pass before any database is touched
// ABOUTME: Liveness check and database listing; any failure here is fatal

use crate::cluster::Cluster;
use anyhow::{bail, Context, Result};

/// Probe the cluster root once; no retries
pub async fn check_liveness<C>(cluster: &C) -> Result<()>
where
    C: Cluster + ?Sized,
{
    tracing::info!("Checking that cloudant server is up");

    let response = cluster
        .ping()
        .await
        .context("Exception caught when connecting to cloudant server")?;

    if !response.is_success() {
        bail!(
            "Connecting to cloudant server returned status code: {}",
            response.status
        );
    }

    tracing::info!("✓ Cloudant server is up");
    Ok(())
}

/// All database names on the cluster, in the order the cluster returns them
pub async fn list_databases<C>(cluster: &C) -> Result<Vec<String>>
where
    C: Cluster + ?Sized,
{
    tracing::info!("Querying databases");

    let response = cluster
        .list_databases()
        .await
        .context("Exception caught when querying cloudant server")?;

    if !response.is_success() {
        bail!(
            "Connecting to cloudant server returned status code: {}",
            response.status
        );
    }

    let body = response
        .body
        .context("Database listing from cloudant server is not valid JSON")?;
    let databases: Vec<String> = serde_json::from_value(body)
        .context("Database listing from cloudant server is not a list of names")?;

    tracing::debug!("{:?}", databases);
    Ok(databases)
}
