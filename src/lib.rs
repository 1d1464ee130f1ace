// ABOUTME: Library module for cloudant-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod cluster;
pub mod commands;
pub mod config;
pub mod filters;
pub mod logging;
pub mod migration;
pub mod snapshot;
pub mod transform;
pub mod utils;
