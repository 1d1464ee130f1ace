// ABOUTME: Run configuration built once at startup and passed to every component
// ABOUTME: Resolves cluster credentials from the environment and the fixed file layout

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const USERNAME_ENV: &str = "CLOUDANT_USERNAME";
pub const PASSWORD_ENV: &str = "CLOUDANT_PASSWORD";

const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "pass";
const DEFAULT_CLUSTER_URL: &str = "http://cloudant-svc/";

/// Top-level entry name inside the archive, also the staging directory name
pub const BACKUP_DIR_NAME: &str = "cloudant-backup";
pub const ARCHIVE_FILE_NAME: &str = "cloudant-backup.tar";
pub const LOG_FILE_NAME: &str = "cloudant-backup.log";

/// Databases that are never exported regardless of cluster contents
pub const EXCLUDED_DATABASES: [&str; 4] = [
    "metrics",
    "portal-common-api_wdp_private_cloud",
    "notebook_api_wdp_private_cloud",
    "community_content",
];

/// Credentials for the cluster, sent as HTTP basic auth
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Base URL of the cluster, without credentials
    pub cluster_url: String,
    pub credentials: Credentials,
    /// Directory holding one `<database>.json` snapshot per database
    pub staging_dir: PathBuf,
    pub archive_path: PathBuf,
    pub log_file: PathBuf,
    pub excluded_databases: BTreeSet<String>,
    pub debug: bool,
}

impl MigrationConfig {
    /// Build a configuration rooted at `base_dir`, reading credentials from
    /// `CLOUDANT_USERNAME` / `CLOUDANT_PASSWORD` with their defaults.
    pub fn from_env(base_dir: &Path, debug: bool) -> Self {
        let credentials = Credentials {
            username: std::env::var(USERNAME_ENV).unwrap_or_else(|_| DEFAULT_USERNAME.to_string()),
            password: std::env::var(PASSWORD_ENV).unwrap_or_else(|_| DEFAULT_PASSWORD.to_string()),
        };
        Self::new(base_dir, DEFAULT_CLUSTER_URL, credentials, debug)
    }

    pub fn new(base_dir: &Path, cluster_url: &str, credentials: Credentials, debug: bool) -> Self {
        Self {
            cluster_url: cluster_url.to_string(),
            credentials,
            staging_dir: base_dir.join(BACKUP_DIR_NAME),
            archive_path: base_dir.join(ARCHIVE_FILE_NAME),
            log_file: base_dir.join(LOG_FILE_NAME),
            excluded_databases: EXCLUDED_DATABASES.iter().map(|s| s.to_string()).collect(),
            debug,
        }
    }

    /// Directory the archive is unpacked into; the archive's top-level entry
    /// lands here as `staging_dir`.
    pub fn base_dir(&self) -> &Path {
        self.staging_dir.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Directory containing the running executable
pub fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent()
        .map(Path::to_path_buf)
        .with_context(|| format!("Executable path {} has no parent directory", exe.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> Credentials {
        Credentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_paths_are_derived_from_base_dir() {
        let config = MigrationConfig::new(
            Path::new("/opt/tool"),
            "http://localhost:5984/",
            test_credentials(),
            false,
        );

        assert_eq!(config.staging_dir, Path::new("/opt/tool/cloudant-backup"));
        assert_eq!(config.archive_path, Path::new("/opt/tool/cloudant-backup.tar"));
        assert_eq!(config.log_file, Path::new("/opt/tool/cloudant-backup.log"));
        assert_eq!(config.base_dir(), Path::new("/opt/tool"));
    }

    #[test]
    fn test_default_exclusions_are_loaded() {
        let config = MigrationConfig::new(
            Path::new("/tmp"),
            "http://localhost:5984/",
            test_credentials(),
            false,
        );

        assert!(config.excluded_databases.contains("metrics"));
        assert!(config.excluded_databases.contains("community_content"));
        assert_eq!(config.excluded_databases.len(), EXCLUDED_DATABASES.len());
    }

    #[test]
    fn test_debug_output_redacts_password() {
        let rendered = format!("{:?}", test_credentials());
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("secret"));
    }
}
