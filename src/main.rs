// ABOUTME: CLI entry point for cloudant-migrator
// ABOUTME: Parses the sub-command, sets up logging, and maps results to exit codes

use clap::{CommandFactory, Parser, Subcommand};
use cloudant_migrator::cluster::HttpCluster;
use cloudant_migrator::commands::{self, MissingArchive, RunReport};
use cloudant_migrator::config::{self, MigrationConfig};
use cloudant_migrator::logging;
use std::process::ExitCode;

/// Exit status for help output and every command-line error
const USAGE_EXIT_CODE: u8 = 2;

const USAGE_NOTES: &str = "\
The export process produces the tar file 'cloudant-backup.tar' in the same directory as this \
tool. It contains a directory of json files, one per exported database.

The import process expects the tar file 'cloudant-backup.tar', as produced by export, in the \
same directory as this tool. Every database in it is deleted and recreated before its \
documents are uploaded.

Cluster credentials are read from CLOUDANT_USERNAME and CLOUDANT_PASSWORD.";

#[derive(Parser)]
#[command(name = "cloudant-migrator")]
#[command(
    about = "Export from or import into the cloudant database",
    long_about = None,
    after_help = USAGE_NOTES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every database into cloudant-backup.tar
    Export,
    /// Recreate every database contained in cloudant-backup.tar
    Import,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(USAGE_EXIT_CODE);
        }
    };

    let base_dir = match config::executable_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let config = MigrationConfig::from_env(&base_dir, cli.debug);

    if let Err(e) = logging::init(&config.log_file, config.debug) {
        eprintln!("ERROR: {:#}", e);
        return ExitCode::FAILURE;
    }

    let result = run(&cli.command, &config).await;
    let code = match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            if e.downcast_ref::<MissingArchive>().is_some() {
                eprintln!();
                let _ = Cli::command().print_help();
            }
            ExitCode::FAILURE
        }
    };

    tracing::info!(
        "Log file with timestamps can be found at: {}",
        config.log_file.display()
    );
    code
}

async fn run(command: &Commands, config: &MigrationConfig) -> anyhow::Result<RunReport> {
    let cluster = HttpCluster::new(config)?;
    tracing::debug!("Using cloudant server at {}", cluster.endpoint());

    match command {
        Commands::Export => commands::export(config, &cluster).await?.ensure_success(),
        Commands::Import => commands::import(config, &cluster).await?.ensure_success(),
    }
}
