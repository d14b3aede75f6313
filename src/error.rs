use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupExportError {
    #[error("Backup index unavailable: {message}")]
    IndexUnavailable { message: String },

    #[error("Invalid export job configuration: {reason}")]
    InvalidJobConfiguration { reason: String },

    #[error("No files in the backup match the query")]
    NoMatches { domain: String, path: String },

    #[error("Export job aborted: {message}")]
    JobFault { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Destination directory is no longer available: {path}")]
    DestinationUnavailable { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for BackupExportError {
    fn user_message(&self) -> String {
        match self {
            BackupExportError::IndexUnavailable { message } => {
                format!("Could not read the backup file index: {}", message)
            }
            BackupExportError::InvalidJobConfiguration { reason } => {
                format!("Cannot start export: {}", reason)
            }
            BackupExportError::NoMatches { domain, path } => {
                format!(
                    "No files match domain '{}' and path '{}'",
                    display_pattern(domain),
                    display_pattern(path)
                )
            }
            BackupExportError::JobFault { message } => {
                format!("Export error: {}", message)
            }
            BackupExportError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            BackupExportError::Cancelled => "Operation was cancelled by user".to_string(),
            BackupExportError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            BackupExportError::DestinationUnavailable { path } => {
                format!("Destination directory disappeared: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            BackupExportError::IndexUnavailable { .. } => Some(
                "Check that the path points to a backup folder containing a readable Manifest.json.".to_string()
            ),
            BackupExportError::InvalidJobConfiguration { .. } => Some(
                "Choose an existing, writable destination directory with --output.".to_string()
            ),
            BackupExportError::NoMatches { .. } => Some(
                "Broaden the query: patterns match as substrings, '%' matches any run of characters and an empty pattern matches everything.".to_string()
            ),
            BackupExportError::JobFault { .. } | BackupExportError::DestinationUnavailable { .. } => Some(
                "Make sure the destination directory stays available while the export runs.".to_string()
            ),
            BackupExportError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for BackupExportError {
    fn from(error: toml::de::Error) -> Self {
        BackupExportError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupExportError>;

/// Classification of a single item's extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Reading the store or writing the destination failed.
    Io,
    /// The content or its target location could not be accessed.
    Access,
    /// The stored content is malformed or uses an unsupported format.
    UnreadableContent,
    /// The backup is encrypted and has not been unlocked.
    Locked,
    /// The destination root vanished. Aborts the job instead of being
    /// recorded against the item.
    DestinationUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Io => "I/O fault",
            ErrorKind::Access => "access fault",
            ErrorKind::UnreadableContent => "unreadable content",
            ErrorKind::Locked => "backup locked",
            ErrorKind::DestinationUnavailable => "destination unavailable",
        };
        f.write_str(label)
    }
}

/// A per-item extraction error. These are recorded in the job outcome
/// and never abort a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ExtractError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ExtractError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(error: std::io::Error) -> Self {
        use std::io::ErrorKind as IoKind;

        let kind = match error.kind() {
            IoKind::PermissionDenied => ErrorKind::Access,
            IoKind::InvalidData | IoKind::UnexpectedEof => ErrorKind::UnreadableContent,
            _ => ErrorKind::Io,
        };

        ExtractError::new(kind, error.to_string())
    }
}

impl From<BackupExportError> for ExtractError {
    fn from(error: BackupExportError) -> Self {
        match error {
            BackupExportError::Io(e) => ExtractError::from(e),
            BackupExportError::InvalidPath { path } => ExtractError::new(ErrorKind::Access, path),
            BackupExportError::DestinationUnavailable { path } => {
                ExtractError::new(ErrorKind::DestinationUnavailable, path)
            }
            other => ExtractError::new(ErrorKind::Io, other.to_string()),
        }
    }
}

fn display_pattern(pattern: &str) -> &str {
    if pattern.is_empty() {
        "*"
    } else {
        pattern
    }
}
