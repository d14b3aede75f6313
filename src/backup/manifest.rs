use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE_NAME: &str = "Manifest.json";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub file_id: Option<String>,
    pub domain: String,
    pub relative_path: String,
    #[serde(default)]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    File,
    Directory,
    Symlink,
}

impl ManifestEntry {
    /// The blob id, if this entry has exportable content.
    pub fn content_id(&self) -> Option<&str> {
        match self.kind {
            EntryKind::File => self.file_id.as_deref().filter(|id| !id.is_empty()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parsing_defaults() {
        let json = r#"{
            "files": [
                { "file_id": "3d0d7e5fb2ce288813306e4d4636395e047a3d28", "domain": "HomeDomain",
                  "relative_path": "Library/SMS/sms.db", "size": 4096,
                  "modified": "2023-05-01T10:00:00Z" },
                { "domain": "HomeDomain", "relative_path": "Library/SMS", "kind": "directory" }
            ]
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert!(!manifest.encrypted);
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].kind, EntryKind::File);
        assert!(manifest.files[0].content_id().is_some());
        assert!(manifest.files[0].modified.is_some());
        assert_eq!(manifest.files[1].content_id(), None);
    }

    #[test]
    fn test_file_without_id_has_no_content() {
        let entry = ManifestEntry {
            file_id: Some(String::new()),
            domain: "HomeDomain".to_string(),
            relative_path: "x".to_string(),
            kind: EntryKind::File,
            size: 0,
            modified: None,
        };
        assert_eq!(entry.content_id(), None);
    }
}
