use backup_export::{
    BackupExport, BackupExportError, Cli, JobOutcome, JobState, OutputFormatter, OutputMode,
    UserFriendlyError,
};
use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let app = match BackupExport::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let backup_root = match cli.backup {
        Some(ref path) => path.clone(),
        None => {
            app.output_formatter().error("A backup folder is required");
            return 1;
        }
    };

    let backup = match app.open_backup(&backup_root) {
        Ok(backup) => Arc::new(backup),
        Err(e) => {
            app.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    let predicate = cli.predicate();

    if cli.list {
        return match app.search(backup.as_ref(), &predicate) {
            Ok(records) => {
                app.output_formatter().print_search_results(&records);
                0
            }
            Err(e) => {
                app.handle_error(&e);
                exit_code_for(&e)
            }
        };
    }

    match app.export_matching(backup, &predicate).await {
        Ok(outcome) => {
            app.output_formatter().print_outcome(&outcome);
            exit_code_for_outcome(&outcome)
        }
        Err(e) => {
            app.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &BackupExportError) -> i32 {
    match error {
        BackupExportError::Cancelled => 130, // Interrupted (SIGINT)
        BackupExportError::IndexUnavailable { .. } => 3,
        BackupExportError::InvalidJobConfiguration { .. } => 4,
        BackupExportError::NoMatches { .. } => 5,
        BackupExportError::JobFault { .. } | BackupExportError::DestinationUnavailable { .. } => 6,
        _ => 1,
    }
}

fn exit_code_for_outcome(outcome: &JobOutcome) -> i32 {
    match outcome.state {
        JobState::Succeeded if outcome.failures.is_empty() => 0,
        JobState::Succeeded => 2, // Finished with failed items
        JobState::Cancelled => 130,
        _ => 6,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "backup-export.toml".to_string());

    match BackupExport::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  backup-export <backup-folder> --config {}", config_path);
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &BackupExportError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flags.
fn setup_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("backup_export={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}
