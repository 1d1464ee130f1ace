// ABOUTME: Tracing subscriber setup for console and log file output
// ABOUTME: Console lines carry no timestamp; the appended log file does

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives used when `RUST_LOG` is not set
///
/// At info level the HTTP stack is held to warnings so request chatter does
/// not fill the log file.
pub fn default_directives(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info,reqwest=warn,hyper=warn"
    }
}

/// Install the global subscriber: stderr (`LEVEL: message`) plus `log_file`
pub fn init(log_file: &Path, debug: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(debug)));

    let console_layer = fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Arc::new(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
