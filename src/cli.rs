use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::index::MatchPredicate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "backup-export")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search a device backup and export matching files")]
#[command(
    long_about = "backup-export queries a backup's file index by domain and relative path \
                  and exports every matching file into a destination directory."
)]
#[command(after_help = "EXAMPLES:\n  \
    backup-export ./Backup/00008030-001A --list\n  \
    backup-export ./Backup/00008030-001A --domain CameraRollDomain --path DCIM --output photos\n  \
    backup-export ./Backup/00008030-001A --path 'Library/SMS/%.db' --flat -o sms\n\n\
    Patterns match as substrings; '%' matches any run of characters, '_' exactly one.")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Backup folder containing Manifest.json
    #[arg(required_unless_present = "generate_config")]
    pub backup: Option<PathBuf>,

    /// Domain pattern (empty matches every domain)
    #[arg(short, long, default_value = "")]
    pub domain: String,

    /// Relative path pattern (empty matches every path)
    #[arg(short, long, default_value = "")]
    pub path: String,

    /// Destination directory for exported files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only list matching files, do not export
    #[arg(short, long)]
    pub list: bool,

    /// Do not create a directory per domain under the destination
    #[arg(long)]
    pub flat: bool,

    /// Fail items whose target file already exists instead of overwriting
    #[arg(long)]
    pub no_overwrite: bool,

    /// Match patterns case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let destination = self.output.as_ref().map(|o| {
            if o.is_absolute() {
                o.clone()
            } else {
                std::env::current_dir().unwrap_or_default().join(o)
            }
        });

        CliOverrides::new()
            .with_destination(destination)
            .with_include_domain(self.flat.then_some(false))
            .with_overwrite(self.no_overwrite.then_some(false))
            .with_case_sensitive(self.case_sensitive.then_some(true))
    }

    pub fn predicate(&self) -> MatchPredicate {
        MatchPredicate::new(self.domain.clone(), self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_arguments() {
        let cli = Cli::try_parse_from([
            "backup-export",
            "/backups/device",
            "--domain",
            "CameraRollDomain",
            "-p",
            "DCIM",
            "-o",
            "/tmp/photos",
            "--flat",
        ])
        .unwrap();

        assert_eq!(cli.backup, Some(PathBuf::from("/backups/device")));
        assert_eq!(cli.predicate(), MatchPredicate::new("CameraRollDomain", "DCIM"));
        assert!(cli.flat);
        assert!(!cli.list);
    }

    #[test]
    fn test_patterns_default_to_match_all() {
        let cli = Cli::try_parse_from(["backup-export", "/backups/device", "--list"]).unwrap();
        assert!(cli.predicate().is_match_all());
        assert!(cli.list);
    }

    #[test]
    fn test_backup_required_unless_generating_config() {
        assert!(Cli::try_parse_from(["backup-export", "--list"]).is_err());
        assert!(Cli::try_parse_from(["backup-export", "--generate-config"]).is_ok());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["backup-export", "/b", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "backup-export",
            "/b",
            "-o",
            "/tmp/out",
            "--no-overwrite",
        ])
        .unwrap();

        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.destination, Some(PathBuf::from("/tmp/out")));
        assert_eq!(overrides.overwrite, Some(false));
        assert_eq!(overrides.include_domain, None);
        assert_eq!(overrides.case_sensitive, None);
    }
}
