use crate::job::{JobObserver, JobOutcome, JobState};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_export_progress(&self, total_files: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_files));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} files {msg}"
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        );
        pb.set_message("Exporting files...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Drives a progress bar from job events.
pub struct ProgressObserver {
    progress_bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new(progress_bar: ProgressBar) -> Self {
        Self { progress_bar }
    }

    pub fn progress_bar(&self) -> &ProgressBar {
        &self.progress_bar
    }
}

impl JobObserver for ProgressObserver {
    fn on_progress(&mut self, processed: usize, total: usize, message: &str) {
        self.progress_bar.set_length(total as u64);
        self.progress_bar.set_position(processed as u64);
        self.progress_bar.set_message(message.to_string());
    }

    fn on_complete(&mut self, outcome: &JobOutcome) {
        let elapsed = format_duration(outcome.elapsed);
        match outcome.state {
            JobState::Succeeded => self.progress_bar.finish_with_message(format!(
                "Exported {} of {} files (completed in {})",
                outcome.success_count, outcome.total_count, elapsed
            )),
            JobState::Cancelled => self.progress_bar.abandon_with_message(format!(
                "Cancelled after {} of {} files",
                outcome.processed_count, outcome.total_count
            )),
            _ => self.progress_bar.abandon_with_message(format!(
                "Export {} after {} of {} files",
                outcome.state, outcome.processed_count, outcome.total_count
            )),
        }
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn outcome(state: JobState, processed: usize) -> JobOutcome {
        JobOutcome {
            state,
            total_count: 4,
            processed_count: processed,
            success_count: processed,
            skipped_count: 0,
            failures: Vec::new(),
            bytes_written: 0,
            destination: PathBuf::from("/tmp/out"),
            fault: None,
            elapsed: Duration::from_millis(12),
        }
    }

    #[test]
    fn test_progress_manager_creation() {
        let manager = ProgressManager::new(true);
        assert!(manager.is_enabled());

        let disabled_manager = ProgressManager::new(false);
        assert!(!disabled_manager.is_enabled());
    }

    #[test]
    fn test_disabled_progress_bars() {
        let manager = ProgressManager::new(false);
        assert!(manager.create_export_progress(10).is_hidden());
        assert!(manager.create_spinner("searching").is_hidden());
    }

    #[test]
    fn test_observer_tracks_position() {
        let mut observer = ProgressObserver::new(ProgressBar::hidden());

        observer.on_progress(1, 4, "Exporting 1 of 4 files...");
        observer.on_progress(2, 4, "Exporting 2 of 4 files...");

        assert_eq!(observer.progress_bar().position(), 2);
        assert_eq!(observer.progress_bar().length(), Some(4));
        assert_eq!(observer.progress_bar().message(), "Exporting 2 of 4 files...");
    }

    #[test]
    fn test_observer_finishes_on_completion() {
        let mut observer = ProgressObserver::new(ProgressBar::hidden());
        observer.on_progress(4, 4, "Exporting 4 of 4 files...");
        observer.on_complete(&outcome(JobState::Succeeded, 4));

        assert!(observer.progress_bar().is_finished());
        assert!(observer.progress_bar().message().contains("Exported 4 of 4"));

        let mut cancelled = ProgressObserver::new(ProgressBar::hidden());
        cancelled.on_complete(&outcome(JobState::Cancelled, 2));
        assert!(cancelled.progress_bar().message().contains("Cancelled after 2 of 4"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
