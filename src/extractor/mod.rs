pub mod file_extractor;

pub use file_extractor::FileOperations;

use crate::error::ExtractError;
use crate::index::ContentHandle;
use std::path::Path;

/// Extracts the bytes behind a content handle onto disk.
///
/// Implementations write `destination_dir/relative_path` and must not leave a
/// partially written file behind when they fail.
pub trait ContentExtractor: Send + Sync {
    fn extract(
        &self,
        handle: &ContentHandle,
        destination_dir: &Path,
        relative_path: &Path,
        overwrite: bool,
    ) -> std::result::Result<u64, ExtractError>;
}
