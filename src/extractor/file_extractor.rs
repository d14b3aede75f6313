use crate::error::{BackupExportError, Result};
use std::fs;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

#[cfg(windows)]
const MAX_PATH: usize = 260;

#[cfg(not(windows))]
const MAX_PATH: usize = 4096;

/// Writes extracted content below a destination root.
///
/// Content is streamed into a temporary file next to its final location and
/// renamed into place once complete, so a failed or interrupted write never
/// leaves a truncated file at the target path.
#[derive(Debug, Clone)]
pub struct FileOperations {
    overwrite: bool,
    preserve_mtime: bool,
    buffer_size: usize,
}

impl FileOperations {
    pub fn new() -> Self {
        Self {
            overwrite: true,
            preserve_mtime: true,
            buffer_size: 64 * 1024,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Resolve `relative_path` below `dest_root`, rejecting anything that
    /// would escape it.
    pub fn target_path(&self, dest_root: &Path, relative_path: &Path) -> Result<PathBuf> {
        validate_relative_path(relative_path)?;
        let target = dest_root.join(relative_path);
        check_path_length(&target)?;
        Ok(target)
    }

    /// Stream `source` to `dest_root/relative_path`. Returns the bytes written.
    ///
    /// `dest_root` must already exist; only directories below it are created.
    /// Losing the root mid-write yields `DestinationUnavailable`.
    pub fn write_entry<R: Read>(
        &self,
        source: R,
        dest_root: &Path,
        relative_path: &Path,
        modified: Option<SystemTime>,
    ) -> Result<u64> {
        let dest = self.target_path(dest_root, relative_path)?;

        if !dest_root.is_dir() {
            return Err(destination_unavailable(dest_root));
        }

        self.write_below_root(source, dest_root, relative_path, &dest, modified)
            .map_err(|e| match e {
                BackupExportError::Io(_) if !dest_root.is_dir() => destination_unavailable(dest_root),
                other => other,
            })
    }

    fn write_below_root<R: Read>(
        &self,
        source: R,
        dest_root: &Path,
        relative_path: &Path,
        dest: &Path,
        modified: Option<SystemTime>,
    ) -> Result<u64> {
        if !self.overwrite && dest.exists() {
            return Err(BackupExportError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("File already exists: {}", dest.display()),
            )));
        }

        let parent = dest.parent().ok_or_else(|| BackupExportError::InvalidPath {
            path: dest.display().to_string(),
        })?;
        if let Some(relative_dir) = relative_path.parent() {
            create_dirs_below(dest_root, relative_dir)?;
        }

        let staging = tempfile::Builder::new()
            .prefix(".export-")
            .tempfile_in(parent)?;

        let mut reader = BufReader::with_capacity(self.buffer_size, source);
        let mut writer = BufWriter::with_capacity(self.buffer_size, staging);
        let total_bytes = std::io::copy(&mut reader, &mut writer)?;

        let staging = writer
            .into_inner()
            .map_err(|e| BackupExportError::Io(e.into_error()))?;
        staging.as_file().sync_all()?;

        let persisted = if self.overwrite {
            staging.persist(dest)
        } else {
            staging.persist_noclobber(dest)
        };
        persisted.map_err(|e| BackupExportError::Io(e.error))?;

        if self.preserve_mtime {
            if let Some(modified) = modified {
                let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(modified));
            }
        }

        Ok(total_bytes)
    }

    /// Write an in-memory buffer; convenience over `write_entry`.
    pub fn write_bytes(&self, bytes: &[u8], dest_root: &Path, relative_path: &Path) -> Result<u64> {
        self.write_entry(bytes, dest_root, relative_path, None)
    }
}

impl Default for FileOperations {
    fn default() -> Self {
        Self::new()
    }
}

/// Create each directory of `relative_dir` under `dest_root`, one level at a
/// time, so a missing root is never recreated.
fn create_dirs_below(dest_root: &Path, relative_dir: &Path) -> Result<()> {
    let mut current = dest_root.to_path_buf();

    for component in relative_dir.components() {
        current.push(component);
        match fs::create_dir(&current) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && current.is_dir() => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn destination_unavailable(dest_root: &Path) -> BackupExportError {
    BackupExportError::DestinationUnavailable {
        path: dest_root.display().to_string(),
    }
}

fn validate_relative_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(BackupExportError::InvalidPath {
            path: "empty relative path".to_string(),
        });
    }

    for component in path.components() {
        match component {
            Component::Normal(name) => validate_file_name(&name.to_string_lossy())?,
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(BackupExportError::InvalidPath {
                    path: format!("Directory traversal not allowed: {}", path.display()),
                });
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(BackupExportError::InvalidPath {
                    path: format!("Absolute path not allowed: {}", path.display()),
                });
            }
        }
    }

    Ok(())
}

fn validate_file_name(name: &str) -> Result<()> {
    if name.chars().any(|c| c == '\0' || c.is_control()) {
        return Err(BackupExportError::InvalidPath {
            path: format!("Filename contains control characters: {}", name.escape_debug()),
        });
    }

    #[cfg(windows)]
    {
        let invalid_chars = ['<', '>', ':', '"', '|', '?', '*'];
        if name.chars().any(|c| invalid_chars.contains(&c)) {
            return Err(BackupExportError::InvalidPath {
                path: format!("Filename contains invalid characters: {}", name),
            });
        }

        if name.ends_with(' ') || name.ends_with('.') {
            return Err(BackupExportError::InvalidPath {
                path: format!("Filename cannot end with space or dot: {}", name),
            });
        }
    }

    Ok(())
}

pub fn check_path_length(path: &Path) -> Result<()> {
    let path_str = path.to_string_lossy();

    if path_str.len() > MAX_PATH {
        Err(BackupExportError::InvalidPath {
            path: format!("Path too long: {} characters (max: {})", path_str.len(), MAX_PATH),
        })
    } else {
        Ok(())
    }
}
