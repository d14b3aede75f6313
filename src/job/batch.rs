use super::{CancelToken, ItemFailure, JobEvent, JobObserver, JobOutcome, JobState};
use crate::error::{BackupExportError, ErrorKind, Result};
use crate::extractor::ContentExtractor;
use crate::index::FileRecord;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

const WORKER_THREAD_NAME: &str = "backup-export-job";

/// Extracts a fixed set of records into a destination directory.
///
/// Records are processed strictly in order on a single worker thread. Per-item
/// extraction errors are collected in the outcome and never stop the batch.
pub struct BatchExportJob {
    items: Vec<FileRecord>,
    destination: PathBuf,
    extractor: Arc<dyn ContentExtractor>,
    include_domain: bool,
    overwrite: bool,
    cancel: CancelToken,
    state: JobState,
    processed_count: usize,
    success_count: usize,
    skipped_count: usize,
    failures: Vec<ItemFailure>,
    bytes_written: u64,
    fault: Option<String>,
    elapsed: Duration,
}

impl BatchExportJob {
    pub fn new<P: Into<PathBuf>>(
        items: Vec<FileRecord>,
        destination: P,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        Self {
            items,
            destination: destination.into(),
            extractor,
            include_domain: true,
            overwrite: true,
            cancel: CancelToken::new(),
            state: JobState::Created,
            processed_count: 0,
            success_count: 0,
            skipped_count: 0,
            failures: Vec::new(),
            bytes_written: 0,
            fault: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Place each record under a directory named after its domain.
    pub fn with_include_domain(mut self, include_domain: bool) -> Self {
        self.include_domain = include_domain;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Share an existing token, e.g. one wired to a signal handler.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Check that the job can start: not yet run, at least one record, and
    /// an existing directory this process can create files in.
    pub fn validate(&self) -> Result<()> {
        if self.state != JobState::Created {
            return Err(invalid(format!("job has already been started ({})", self.state)));
        }

        if self.items.is_empty() {
            return Err(invalid("there are no files to export"));
        }

        let metadata = fs::metadata(&self.destination).map_err(|_| {
            invalid(format!(
                "destination does not exist: {}",
                self.destination.display()
            ))
        })?;

        if !metadata.is_dir() {
            return Err(invalid(format!(
                "destination is not a directory: {}",
                self.destination.display()
            )));
        }

        tempfile::tempfile_in(&self.destination).map_err(|e| {
            invalid(format!(
                "destination is not writable: {} ({})",
                self.destination.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Move the job onto its worker thread.
    ///
    /// On failure the job is handed back untouched, still `Created`.
    pub fn start(mut self) -> std::result::Result<JobHandle, StartError> {
        if let Err(error) = self.validate() {
            return Err(StartError::new(self, error));
        }

        let (event_tx, event_rx) = mpsc::channel();
        let (job_tx, job_rx) = mpsc::sync_channel::<BatchExportJob>(1);

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let mut job = job_rx.recv().ok()?;
                job.run(&event_tx);
                Some(job)
            });

        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                let error = BackupExportError::JobFault {
                    message: format!("failed to spawn export worker: {}", e),
                };
                return Err(StartError::new(self, error));
            }
        };

        let cancel = self.cancel.clone();
        let total = self.items.len();
        let destination = self.destination.clone();
        self.state = JobState::Running;

        if let Err(mpsc::SendError(mut job)) = job_tx.send(self) {
            job.state = JobState::Created;
            let error = BackupExportError::JobFault {
                message: "export worker exited before the job was handed over".to_string(),
            };
            return Err(StartError::new(job, error));
        }

        tracing::info!("Started export of {} files", total);

        Ok(JobHandle {
            cancel,
            events: event_rx,
            worker,
            total,
            destination,
        })
    }

    fn run(&mut self, events: &Sender<JobEvent>) {
        let started = Instant::now();
        let total = self.items.len();
        let items = std::mem::take(&mut self.items);

        for record in &items {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation observed after {} of {} files", self.processed_count, total);
                self.state = JobState::Cancelled;
                break;
            }

            if !self.destination.is_dir() {
                self.fail(format!(
                    "destination is no longer available: {}",
                    self.destination.display()
                ));
                break;
            }

            if let Err(fault) = self.process(record) {
                self.fail(fault);
                break;
            }
            self.processed_count += 1;

            let _ = events.send(JobEvent::Progress {
                processed: self.processed_count,
                total,
                message: format!("Exporting {} of {} files...", self.processed_count, total),
            });
        }

        self.items = items;
        if self.state == JobState::Running {
            self.state = JobState::Succeeded;
        }
        self.elapsed = started.elapsed();

        tracing::info!(
            "Export {}: {} exported, {} failed, {} skipped of {}",
            self.state,
            self.success_count,
            self.failures.len(),
            self.skipped_count,
            total
        );

        let _ = events.send(JobEvent::Complete(self.outcome()));
    }

    fn fail(&mut self, fault: String) {
        tracing::error!("{}", fault);
        self.fault = Some(fault);
        self.state = JobState::Failed;
    }

    /// Export one record. `Err` carries a job-level fault; the record is then
    /// left unprocessed.
    fn process(&mut self, record: &FileRecord) -> std::result::Result<(), String> {
        let handle = match record.content_handle {
            Some(ref handle) => handle,
            None => {
                tracing::debug!("Skipping {} (no content)", record.display_path());
                self.skipped_count += 1;
                return Ok(());
            }
        };

        let target = record.export_path(self.include_domain);
        match self
            .extractor
            .extract(handle, &self.destination, &target, self.overwrite)
        {
            Ok(bytes) => {
                tracing::debug!("Exported {} ({} bytes)", record.display_path(), bytes);
                self.success_count += 1;
                self.bytes_written += bytes;
            }
            Err(e) if e.kind == ErrorKind::DestinationUnavailable => {
                return Err(format!(
                    "destination is no longer available: {} (while exporting {})",
                    e.message,
                    record.display_path()
                ));
            }
            Err(e) => {
                tracing::warn!("Failed to export {}: {}", record.display_path(), e);
                self.failures.push(ItemFailure {
                    record: record.clone(),
                    kind: e.kind,
                    message: e.message,
                });
            }
        }

        Ok(())
    }

    /// Snapshot of the job's counters.
    pub fn outcome(&self) -> JobOutcome {
        JobOutcome {
            state: self.state,
            total_count: self.items.len(),
            processed_count: self.processed_count,
            success_count: self.success_count,
            skipped_count: self.skipped_count,
            failures: self.failures.clone(),
            bytes_written: self.bytes_written,
            destination: self.destination.clone(),
            fault: self.fault.clone(),
            elapsed: self.elapsed,
        }
    }
}

impl fmt::Debug for BatchExportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchExportJob")
            .field("items", &self.items.len())
            .field("destination", &self.destination)
            .field("state", &self.state)
            .field("processed_count", &self.processed_count)
            .field("success_count", &self.success_count)
            .field("skipped_count", &self.skipped_count)
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}

fn invalid<S: Into<String>>(reason: S) -> BackupExportError {
    BackupExportError::InvalidJobConfiguration {
        reason: reason.into(),
    }
}

/// A job that could not be started, returned together with the reason.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct StartError {
    pub job: Box<BatchExportJob>,
    pub error: BackupExportError,
}

impl StartError {
    fn new(job: BatchExportJob, error: BackupExportError) -> Self {
        Self {
            job: Box::new(job),
            error,
        }
    }

    pub fn into_job(self) -> BatchExportJob {
        *self.job
    }
}

impl From<StartError> for BackupExportError {
    fn from(error: StartError) -> Self {
        error.error
    }
}

/// Caller-side handle to a running job.
#[derive(Debug)]
pub struct JobHandle {
    cancel: CancelToken,
    events: Receiver<JobEvent>,
    worker: JoinHandle<Option<BatchExportJob>>,
    total: usize,
    destination: PathBuf,
}

impl JobHandle {
    /// Ask the job to stop at the next item boundary. Idempotent; has no
    /// effect once the job has finished.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn total_count(&self) -> usize {
        self.total
    }

    /// Blocking iterator over the job's events. Ends after `Complete`.
    pub fn events(&self) -> impl Iterator<Item = JobEvent> + '_ {
        self.events.iter()
    }

    /// Drain the event stream into `observer`, then return the outcome.
    ///
    /// The observer sees exactly one completion, even when the worker dies
    /// without sending one.
    pub fn wait(self, observer: &mut dyn JobObserver) -> Result<JobOutcome> {
        let mut completed = None;

        for event in self.events.iter() {
            match event {
                JobEvent::Progress {
                    processed,
                    total,
                    message,
                } => observer.on_progress(processed, total, &message),
                JobEvent::Complete(outcome) => {
                    observer.on_complete(&outcome);
                    completed = Some(outcome);
                }
            }
        }

        match join_worker(self.worker) {
            Ok(job) => Ok(completed.unwrap_or_else(|| job.outcome())),
            Err(error) => {
                if completed.is_none() {
                    observer.on_complete(&JobOutcome {
                        state: JobState::Failed,
                        total_count: self.total,
                        processed_count: 0,
                        success_count: 0,
                        skipped_count: 0,
                        failures: Vec::new(),
                        bytes_written: 0,
                        destination: self.destination,
                        fault: Some(error.to_string()),
                        elapsed: Duration::ZERO,
                    });
                }
                Err(error)
            }
        }
    }

    /// Wait for the worker and take back the finished job.
    pub fn join(self) -> Result<BatchExportJob> {
        join_worker(self.worker)
    }
}

fn join_worker(worker: JoinHandle<Option<BatchExportJob>>) -> Result<BatchExportJob> {
    match worker.join() {
        Ok(Some(job)) => Ok(job),
        Ok(None) => Err(BackupExportError::JobFault {
            message: "export worker never received its job".to_string(),
        }),
        Err(_) => Err(BackupExportError::JobFault {
            message: "export worker panicked".to_string(),
        }),
    }
}
