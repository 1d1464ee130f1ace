// ABOUTME: Command implementations for each migration direction
// ABOUTME: Exports the export and import orchestrators plus their shared preflight and reporting

pub mod export;
pub mod import;
pub mod preflight;
pub mod report;

pub use export::export;
pub use import::{import, MissingArchive};
pub use preflight::{check_liveness, list_databases};
pub use report::{RunMode, RunReport};
