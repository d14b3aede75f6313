pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod index;
pub mod job;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExportConfig, SearchConfig};
pub use error::{BackupExportError, ErrorKind, ExtractError, Result, UserFriendlyError};

// Core functionality re-exports
pub use backup::{BackupInfo, ManifestBackup};
pub use extractor::{ContentExtractor, FileOperations};
pub use index::{BackupIndex, ContentHandle, FileRecord, MatchPredicate};
pub use job::{
    BatchExportJob, CancelToken, ItemFailure, JobEvent, JobHandle, JobObserver, JobOutcome,
    JobState, StartError,
};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager, ProgressObserver};

use std::path::Path;
use std::sync::Arc;
use tokio::task;

/// Main library interface: query a backup and export the matches.
pub struct BackupExport {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl BackupExport {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create an instance without registering a signal handler.
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Open a backup folder with this instance's search and export settings.
    pub fn open_backup<P: AsRef<Path>>(&self, root: P) -> Result<ManifestBackup> {
        let backup = ManifestBackup::open(root)?
            .with_case_sensitive(self.config.search.case_sensitive)
            .with_file_operations(self.config.file_operations());

        self.output_formatter.info(&backup.info().display_summary());
        if backup.is_encrypted() {
            self.output_formatter
                .warning("Backup is encrypted; file contents cannot be exported until it is unlocked");
        }
        Ok(backup)
    }

    /// Resolve a query against a backup index.
    pub fn search(&self, index: &dyn BackupIndex, predicate: &MatchPredicate) -> Result<Vec<FileRecord>> {
        let spinner = self.progress_manager.create_spinner("Searching backup index");
        let result = index.search(predicate);
        spinner.finish_and_clear();

        let records = result?;
        self.output_formatter
            .info(&format!("Found {} matching files", records.len()));
        Ok(records)
    }

    /// Search `backup` and export every match into the configured destination.
    pub async fn export_matching(
        &self,
        backup: Arc<ManifestBackup>,
        predicate: &MatchPredicate,
    ) -> Result<JobOutcome> {
        self.shutdown.check_shutdown()?;

        let records = self.search(backup.as_ref(), predicate)?;
        if records.is_empty() {
            return Err(BackupExportError::NoMatches {
                domain: predicate.domain_pattern().to_string(),
                path: predicate.path_pattern().to_string(),
            });
        }

        let destination = self.config.export.destination.clone();
        self.output_formatter.start_operation(&format!(
            "Exporting {} files to {}",
            records.len(),
            destination.display()
        ));

        let handle = BatchExportJob::new(records, destination, backup)
            .with_include_domain(self.config.export.include_domain)
            .with_overwrite(self.config.export.overwrite)
            .with_cancel_token(self.shutdown.token())
            .start()?;

        let progress = self
            .progress_manager
            .create_export_progress(handle.total_count() as u64);
        let mut observer = ProgressObserver::new(progress);
        let outcome = task::spawn_blocking(move || handle.wait(&mut observer))
            .await
            .map_err(|e| BackupExportError::JobFault {
                message: format!("Export task failed: {}", e),
            })??;

        Ok(outcome)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &BackupExportError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Blocking convenience: search `backup_root` and export matches into
/// `destination` with default settings.
pub fn export_matching_simple<P, Q>(
    backup_root: P,
    predicate: &MatchPredicate,
    destination: Q,
) -> Result<JobOutcome>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let backup = Arc::new(ManifestBackup::open(backup_root)?);
    let records = backup.search(predicate)?;
    if records.is_empty() {
        return Err(BackupExportError::NoMatches {
            domain: predicate.domain_pattern().to_string(),
            path: predicate.path_pattern().to_string(),
        });
    }

    let job = BatchExportJob::new(records, destination.as_ref(), backup)
        .start()?
        .join()?;
    Ok(job.outcome())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::test_support::write_backup;
    use tempfile::TempDir;

    fn sample_backup() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_backup(
            dir.path(),
            &[
                ("CameraRollDomain", "Media/DCIM/100APPLE/IMG_0001.JPG", Some("one")),
                ("CameraRollDomain", "Media/DCIM/100APPLE/IMG_0002.JPG", Some("two")),
                ("CameraRollDomain", "Media/DCIM/100APPLE", None),
                ("HomeDomain", "Library/SMS/sms.db", Some("sms")),
            ],
            false,
        );
        dir
    }

    fn exporter(destination: &Path) -> BackupExport {
        let mut config = Config::default();
        config.export.destination = destination.to_path_buf();
        BackupExport::new_for_test(config, OutputMode::Plain, 0, true)
    }

    #[tokio::test]
    async fn test_export_matching_end_to_end() {
        let backup_dir = sample_backup();
        let dest = TempDir::new().unwrap();
        let app = exporter(dest.path());

        let backup = Arc::new(app.open_backup(backup_dir.path()).unwrap());
        let outcome = app
            .export_matching(backup, &MatchPredicate::new("Camera", "DCIM"))
            .await
            .unwrap();

        assert_eq!(outcome.state, JobState::Succeeded);
        assert_eq!(outcome.total_count, 3);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.skipped_count, 1);
        assert!(dest
            .path()
            .join("CameraRollDomain/Media/DCIM/100APPLE/IMG_0002.JPG")
            .exists());
    }

    #[tokio::test]
    async fn test_export_with_no_matches() {
        let backup_dir = sample_backup();
        let dest = TempDir::new().unwrap();
        let app = exporter(dest.path());

        let backup = Arc::new(app.open_backup(backup_dir.path()).unwrap());
        let result = app
            .export_matching(backup, &MatchPredicate::new("NoSuchDomain", ""))
            .await;
        assert!(matches!(result, Err(BackupExportError::NoMatches { .. })));
    }

    #[tokio::test]
    async fn test_export_to_missing_destination() {
        let backup_dir = sample_backup();
        let dest = TempDir::new().unwrap();
        let app = exporter(&dest.path().join("missing"));

        let backup = Arc::new(app.open_backup(backup_dir.path()).unwrap());
        let result = app.export_matching(backup, &MatchPredicate::all()).await;
        assert!(matches!(
            result,
            Err(BackupExportError::InvalidJobConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_before_export_is_cancelled() {
        let backup_dir = sample_backup();
        let dest = TempDir::new().unwrap();
        let app = exporter(dest.path());
        app.request_shutdown();
        assert!(!app.is_running());

        let backup = Arc::new(app.open_backup(backup_dir.path()).unwrap());
        let result = app.export_matching(backup, &MatchPredicate::all()).await;
        assert!(matches!(result, Err(BackupExportError::Cancelled)));
    }

    #[test]
    fn test_open_missing_backup_is_index_unavailable() {
        let dest = TempDir::new().unwrap();
        let app = exporter(dest.path());
        let result = app.open_backup(dest.path().join("nope"));
        assert!(matches!(
            result,
            Err(BackupExportError::IndexUnavailable { .. })
        ));
    }

    #[test]
    fn test_export_matching_simple() {
        let backup_dir = sample_backup();
        let dest = TempDir::new().unwrap();

        let outcome =
            export_matching_simple(backup_dir.path(), &MatchPredicate::new("Home", ""), dest.path())
                .unwrap();

        assert!(outcome.is_clean());
        assert_eq!(outcome.success_count, 1);
        let exported = dest.path().join("HomeDomain/Library/SMS/sms.db");
        assert_eq!(std::fs::read_to_string(exported).unwrap(), "sms");
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        BackupExport::generate_sample_config(&config_path).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[search]"));
        assert!(content.contains("[export]"));
    }
}
