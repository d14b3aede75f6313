//! Batch export of matched backup records.
//!
//! A [`BatchExportJob`] runs on its own worker thread and extracts its records
//! one at a time. Callers follow it through an ordered stream of
//! [`JobEvent`]s: one `Progress` per processed record, then exactly one
//! `Complete` carrying the [`JobOutcome`].

pub mod batch;
pub mod cancel;

pub use batch::{BatchExportJob, JobHandle, StartError};
pub use cancel::CancelToken;

use crate::error::ErrorKind;
use crate::index::FileRecord;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Running,
    Cancelled,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Cancelled | JobState::Succeeded | JobState::Failed
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Created => "created",
            JobState::Running => "running",
            JobState::Cancelled => "cancelled",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A record whose extraction failed, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFailure {
    pub record: FileRecord,
    pub kind: ErrorKind,
    pub message: String,
}

/// Terminal summary of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub state: JobState,
    pub total_count: usize,
    pub processed_count: usize,
    pub success_count: usize,
    pub skipped_count: usize,
    pub failures: Vec<ItemFailure>,
    pub bytes_written: u64,
    pub destination: PathBuf,
    pub fault: Option<String>,
    pub elapsed: Duration,
}

impl JobOutcome {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Ran to completion and every record with content was exported.
    pub fn is_clean(&self) -> bool {
        self.state == JobState::Succeeded && self.failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} files successfully exported to:\n{}",
            self.success_count,
            self.total_count,
            self.destination.display()
        )
    }
}

#[derive(Debug, Clone)]
pub enum JobEvent {
    Progress {
        processed: usize,
        total: usize,
        message: String,
    },
    Complete(JobOutcome),
}

/// Receives job updates on the thread that drains the event stream.
pub trait JobObserver {
    fn on_progress(&mut self, processed: usize, total: usize, message: &str);

    fn on_complete(&mut self, outcome: &JobOutcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(state: JobState, failures: Vec<ItemFailure>) -> JobOutcome {
        JobOutcome {
            state,
            total_count: 3,
            processed_count: 3,
            success_count: 3 - failures.len(),
            skipped_count: 0,
            failures,
            bytes_written: 0,
            destination: PathBuf::from("/tmp/export"),
            fault: None,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Created.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
    }

    #[test]
    fn test_summary_message() {
        let outcome = outcome(JobState::Succeeded, Vec::new());
        assert!(outcome.is_clean());
        assert_eq!(
            outcome.summary(),
            format!("3 of 3 files successfully exported to:\n{}", PathBuf::from("/tmp/export").display())
        );
    }

    #[test]
    fn test_outcome_with_failures_is_not_clean() {
        let failure = ItemFailure {
            record: FileRecord::new("HomeDomain", "a.txt", 1, None),
            kind: ErrorKind::Io,
            message: "disk full".to_string(),
        };
        let outcome = outcome(JobState::Succeeded, vec![failure]);
        assert!(!outcome.is_clean());
        assert_eq!(outcome.failed_count(), 1);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "succeeded");
        assert_eq!(json["failures"][0]["kind"], "io");
    }
}
