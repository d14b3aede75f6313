use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Opaque reference to a file's content inside a backup store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHandle(String);

impl ContentHandle {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry matched in a backup's file index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub domain: String,
    pub relative_path: String,
    pub file_name: String,
    pub parent_path: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub content_handle: Option<ContentHandle>,
}

impl FileRecord {
    pub fn new<D, P>(domain: D, relative_path: P, size: u64, content_handle: Option<ContentHandle>) -> Self
    where
        D: Into<String>,
        P: Into<String>,
    {
        let relative_path = relative_path.into();
        let (parent_path, file_name) = match relative_path.rfind('/') {
            Some(pos) => (
                relative_path[..pos].to_string(),
                relative_path[pos + 1..].to_string(),
            ),
            None => (String::new(), relative_path.clone()),
        };

        Self {
            domain: domain.into(),
            relative_path,
            file_name,
            parent_path,
            size,
            modified: None,
            content_handle,
        }
    }

    pub fn with_modified(mut self, modified: Option<DateTime<Utc>>) -> Self {
        self.modified = modified;
        self
    }

    /// A record with index metadata but no content to export.
    pub fn is_placeholder(&self) -> bool {
        self.content_handle.is_none()
    }

    /// Target path of this record relative to an export destination.
    pub fn export_path(&self, include_domain: bool) -> PathBuf {
        let mut path = PathBuf::new();
        if include_domain && !self.domain.is_empty() {
            path.push(&self.domain);
        }
        for segment in self.relative_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    pub fn display_path(&self) -> String {
        format!("{}/{}", self.domain, self.relative_path)
    }

    pub fn format_size(&self) -> String {
        format_bytes(self.size)
    }
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_derived_names() {
        let record = FileRecord::new(
            "CameraRollDomain",
            "Media/DCIM/100APPLE/IMG_0001.JPG",
            2048,
            Some(ContentHandle::new("ab12")),
        );

        assert_eq!(record.file_name, "IMG_0001.JPG");
        assert_eq!(record.parent_path, "Media/DCIM/100APPLE");
        assert!(!record.is_placeholder());
        assert_eq!(record.format_size(), "2.0 KB");
    }

    #[test]
    fn test_top_level_record_has_empty_parent() {
        let record = FileRecord::new("HomeDomain", "Library", 0, None);
        assert_eq!(record.file_name, "Library");
        assert_eq!(record.parent_path, "");
        assert!(record.is_placeholder());
    }

    #[test]
    fn test_export_path() {
        let record = FileRecord::new("HomeDomain", "Library/SMS/sms.db", 10, None);
        assert_eq!(
            record.export_path(true),
            Path::new("HomeDomain").join("Library").join("SMS").join("sms.db")
        );
        assert_eq!(
            record.export_path(false),
            Path::new("Library").join("SMS").join("sms.db")
        );
    }
}
