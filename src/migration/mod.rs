// ABOUTME: Per-database migration steps and archive handling
// ABOUTME: Exports databases to snapshots, imports snapshots, and packs/unpacks the archive

pub mod archive;
pub mod export;
pub mod import;

pub use archive::{pack, unpack};
pub use export::{export_one, ExportOutcome, SkipReason};
pub use import::{bulk_upload, import_one, recreate_database, ImportOutcome};
