pub mod pattern;
pub mod record;

pub use pattern::Pattern;
pub use record::{ContentHandle, FileRecord};

use crate::error::Result;
use serde::Serialize;

/// Query descriptor handed to a backup index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchPredicate {
    domain_pattern: String,
    path_pattern: String,
}

impl MatchPredicate {
    pub fn new<D: Into<String>, P: Into<String>>(domain_pattern: D, path_pattern: P) -> Self {
        Self {
            domain_pattern: domain_pattern.into(),
            path_pattern: path_pattern.into(),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn domain_pattern(&self) -> &str {
        &self.domain_pattern
    }

    pub fn path_pattern(&self) -> &str {
        &self.path_pattern
    }

    pub fn is_match_all(&self) -> bool {
        self.domain_pattern.is_empty() && self.path_pattern.is_empty()
    }

    /// Compile both patterns into a matcher over `(domain, relative_path)`.
    pub fn compile(&self, case_sensitive: bool) -> Result<CompiledPredicate> {
        Ok(CompiledPredicate {
            domain: Pattern::compile(&self.domain_pattern, case_sensitive)?,
            path: Pattern::compile(&self.path_pattern, case_sensitive)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    domain: Pattern,
    path: Pattern,
}

impl CompiledPredicate {
    pub fn is_match(&self, domain: &str, relative_path: &str) -> bool {
        self.domain.is_match(domain) && self.path.is_match(relative_path)
    }
}

/// A searchable file index of one backup.
///
/// Implementations must be deterministic for a fixed snapshot and fail with
/// `BackupExportError::IndexUnavailable` when the index cannot be queried.
pub trait BackupIndex {
    fn search(&self, predicate: &MatchPredicate) -> Result<Vec<FileRecord>>;
}
