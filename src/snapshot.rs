// ABOUTME: On-disk snapshot format holding one exported database
// ABOUTME: Reads and atomically writes `<database>.json` files in the staging directory

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_EXTENSION: &str = "json";

/// Body of an `_all_docs?include_docs=true` response
///
/// Rows are kept as raw JSON so documents survive the round trip untouched;
/// any extra top-level fields the cluster returns (e.g. `update_seq`) are
/// preserved as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllDocs {
    pub total_rows: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    pub rows: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AllDocs {
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0 || self.rows.is_empty()
    }
}

/// A persisted snapshot: the listing wrapped under a single `docs` key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotFile {
    pub docs: AllDocs,
}

impl SnapshotFile {
    pub fn new(docs: AllDocs) -> Self {
        Self { docs }
    }

    pub fn rows(&self) -> &[Value] {
        &self.docs.rows
    }
}

/// Path of the snapshot file for `database` inside `dir`
///
/// `/` is legal in database names but not in file names, so it is stored as
/// `%2F`. CouchDB names never contain `%`, which keeps the mapping reversible.
pub fn snapshot_path(dir: &Path, database: &str) -> PathBuf {
    dir.join(format!(
        "{}.{}",
        database.replace('/', "%2F"),
        SNAPSHOT_EXTENSION
    ))
}

/// Database name a snapshot file stands for, or `None` for non-snapshot files
pub fn database_name_from_path(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != SNAPSHOT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace("%2F", "/").replace("%2f", "/"))
}

/// Write a snapshot as UTF-8 JSON
///
/// Data goes to a temp file in the same directory that is renamed into place
/// once complete, so a failed write never leaves a partial snapshot behind.
pub fn write_snapshot(path: &Path, snapshot: &SnapshotFile) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp snapshot in {}", parent.display()))?;

    let mut writer = BufWriter::new(tmp);
    serde_json::to_writer(&mut writer, snapshot)
        .with_context(|| format!("Failed to serialize snapshot {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush snapshot {}", path.display()))?;

    let tmp = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Failed to flush snapshot {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist snapshot {}", path.display()))?;

    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<SnapshotFile> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
    let snapshot = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse snapshot JSON at {}", path.display()))?;
    Ok(snapshot)
}
