use crate::error::{BackupExportError, Result};
use crate::extractor::FileOperations;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub search: SearchConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchConfig {
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    pub include_domain: bool,
    pub overwrite: bool,
    pub preserve_mtime: bool,
    pub buffer_size: usize,
    pub destination: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_domain: true,
            overwrite: true,
            preserve_mtime: true,
            buffer_size: 64 * 1024, // 64KB
            destination: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BackupExportError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BackupExportError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| BackupExportError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["backup-export.toml", ".backup-export.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref destination) = cli_args.destination {
            self.export.destination = destination.clone();
        }

        if let Some(include_domain) = cli_args.include_domain {
            self.export.include_domain = include_domain;
        }

        if let Some(overwrite) = cli_args.overwrite {
            self.export.overwrite = overwrite;
        }

        if let Some(case_sensitive) = cli_args.case_sensitive {
            self.search.case_sensitive = case_sensitive;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| BackupExportError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| BackupExportError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.export.buffer_size < 4096 {
            return Err(BackupExportError::Config {
                message: "Export buffer size must be at least 4096 bytes".to_string(),
            });
        }

        if self.export.destination.as_os_str().is_empty() {
            return Err(BackupExportError::Config {
                message: "Export destination must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// File writer settings derived from the export section.
    pub fn file_operations(&self) -> FileOperations {
        FileOperations::new()
            .with_overwrite(self.export.overwrite)
            .with_preserve_mtime(self.export.preserve_mtime)
            .with_buffer_size(self.export.buffer_size)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub destination: Option<PathBuf>,
    pub include_domain: Option<bool>,
    pub overwrite: Option<bool>,
    pub case_sensitive: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_include_domain(mut self, include_domain: Option<bool>) -> Self {
        self.include_domain = include_domain;
        self
    }

    pub fn with_overwrite(mut self, overwrite: Option<bool>) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: Option<bool>) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.export.include_domain);
        assert!(config.export.overwrite);
        assert!(!config.search.case_sensitive);
        assert_eq!(config.export.buffer_size, 64 * 1024);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.export.buffer_size = 16;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.search.case_sensitive = true;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert!(loaded_config.search.case_sensitive);
        assert_eq!(config.export.destination, loaded_config.export.destination);
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(BackupExportError::Config { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_destination(Some(PathBuf::from("/tmp/exported")))
            .with_include_domain(Some(false))
            .with_overwrite(None);

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.export.destination, PathBuf::from("/tmp/exported"));
        assert!(!config.export.include_domain);
        assert!(config.export.overwrite);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[search]"));
        assert!(sample.contains("[export]"));
    }
}
