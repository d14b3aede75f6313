pub mod manifest;

pub use manifest::{EntryKind, Manifest, ManifestEntry, MANIFEST_FILE_NAME};

use crate::error::{BackupExportError, ErrorKind, ExtractError, Result};
use crate::extractor::{ContentExtractor, FileOperations};
use crate::index::{BackupIndex, ContentHandle, FileRecord, MatchPredicate};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A backup folder holding a `Manifest.json` index and content blobs stored
/// under `<root>/<first two chars of id>/<id>` (or `<root>/<id>` for the
/// older flat layout).
#[derive(Debug)]
pub struct ManifestBackup {
    root: PathBuf,
    manifest: Manifest,
    modified_by_id: HashMap<String, SystemTime>,
    case_sensitive: bool,
    file_ops: FileOperations,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub root: PathBuf,
    pub entries: usize,
    pub files: usize,
    pub encrypted: bool,
}

impl BackupInfo {
    pub fn display_summary(&self) -> String {
        format!(
            "Backup at {}: {} entries ({} files){}",
            self.root.display(),
            self.entries,
            self.files,
            if self.encrypted { ", encrypted" } else { "" }
        )
    }
}

impl ManifestBackup {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(BackupExportError::IndexUnavailable {
                message: format!("Backup directory not found: {}", root.display()),
            });
        }

        let manifest_path = root.join(MANIFEST_FILE_NAME);
        let content = fs::read_to_string(&manifest_path).map_err(|e| {
            BackupExportError::IndexUnavailable {
                message: format!("Failed to read {}: {}", manifest_path.display(), e),
            }
        })?;

        let manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
            BackupExportError::IndexUnavailable {
                message: format!("Failed to parse {}: {}", manifest_path.display(), e),
            }
        })?;

        let modified_by_id = manifest
            .files
            .iter()
            .filter_map(|entry| {
                let id = entry.content_id()?;
                let modified = entry.modified?;
                Some((id.to_string(), SystemTime::from(modified)))
            })
            .collect();

        tracing::debug!(
            "Loaded manifest with {} entries from {}",
            manifest.files.len(),
            root.display()
        );

        Ok(Self {
            root,
            manifest,
            modified_by_id,
            case_sensitive: false,
            file_ops: FileOperations::new(),
        })
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_file_operations(mut self, file_ops: FileOperations) -> Self {
        self.file_ops = file_ops;
        self
    }

    pub fn is_encrypted(&self) -> bool {
        self.manifest.encrypted
    }

    pub fn info(&self) -> BackupInfo {
        BackupInfo {
            root: self.root.clone(),
            entries: self.manifest.files.len(),
            files: self
                .manifest
                .files
                .iter()
                .filter(|entry| entry.content_id().is_some())
                .count(),
            encrypted: self.manifest.encrypted,
        }
    }

    fn blob_path(&self, id: &str) -> std::result::Result<PathBuf, ExtractError> {
        if id.len() < 3 || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ExtractError::new(
                ErrorKind::UnreadableContent,
                format!("Malformed content id: {}", id),
            ));
        }

        let nested = self.root.join(&id[..2]).join(id);
        if nested.is_file() {
            return Ok(nested);
        }

        let flat = self.root.join(id);
        if flat.is_file() {
            return Ok(flat);
        }

        Err(ExtractError::new(
            ErrorKind::Io,
            format!("Content {} is missing from the backup", id),
        ))
    }
}

impl BackupIndex for ManifestBackup {
    fn search(&self, predicate: &MatchPredicate) -> Result<Vec<FileRecord>> {
        let matcher = predicate.compile(self.case_sensitive)?;

        let mut records: Vec<FileRecord> = self
            .manifest
            .files
            .iter()
            .filter(|entry| matcher.is_match(&entry.domain, &entry.relative_path))
            .map(|entry| {
                FileRecord::new(
                    entry.domain.clone(),
                    entry.relative_path.clone(),
                    entry.size,
                    entry.content_id().map(ContentHandle::new),
                )
                .with_modified(entry.modified)
            })
            .collect();

        records.sort_by(|a, b| {
            a.domain
                .cmp(&b.domain)
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });

        tracing::debug!(
            "Query domain='{}' path='{}' matched {} records",
            predicate.domain_pattern(),
            predicate.path_pattern(),
            records.len()
        );

        Ok(records)
    }
}

impl ContentExtractor for ManifestBackup {
    fn extract(
        &self,
        handle: &ContentHandle,
        destination_dir: &Path,
        relative_path: &Path,
        overwrite: bool,
    ) -> std::result::Result<u64, ExtractError> {
        if self.manifest.encrypted {
            return Err(ExtractError::new(
                ErrorKind::Locked,
                "backup is encrypted and has not been unlocked",
            ));
        }

        let blob = self.blob_path(handle.as_str())?;
        let source = fs::File::open(&blob)?;
        let modified = self.modified_by_id.get(handle.as_str()).copied();

        self.file_ops
            .clone()
            .with_overwrite(overwrite)
            .write_entry(source, destination_dir, relative_path, modified)
            .map_err(ExtractError::from)
    }
}
