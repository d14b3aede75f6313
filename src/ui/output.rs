use crate::error::{BackupExportError, UserFriendlyError};
use crate::index::record::format_bytes;
use crate::index::FileRecord;
use crate::job::{JobOutcome, JobState};
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &BackupExportError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Matched records as a table of domain, name, parent path and size.
    pub fn print_search_results(&self, records: &[FileRecord]) {
        match self.mode {
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "search_results",
                    "count": records.len(),
                    "files": records
                }));
            }
            OutputMode::Plain => {
                for record in records {
                    println!(
                        "{}\t{}\t{}\t{}",
                        record.domain, record.file_name, record.parent_path, record.size
                    );
                }
            }
            OutputMode::Human => {
                self.print_header(&format!("{} matching files", records.len()));

                let domain_width = column_width(records.iter().map(|r| r.domain.as_str()), "Domain");
                let name_width = column_width(records.iter().map(|r| r.file_name.as_str()), "Name");

                let header = format!(
                    "{:<dw$}  {:<nw$}  {:>10}  {}",
                    "Domain",
                    "Name",
                    "Size",
                    "Path",
                    dw = domain_width,
                    nw = name_width
                );
                if self.use_colors {
                    println!("{}", style(header).bold());
                } else {
                    println!("{}", header);
                }

                for record in records {
                    let size = if record.is_placeholder() {
                        "-".to_string()
                    } else {
                        record.format_size()
                    };
                    println!(
                        "{:<dw$}  {:<nw$}  {:>10}  {}",
                        record.domain,
                        record.file_name,
                        size,
                        record.parent_path,
                        dw = domain_width,
                        nw = name_width
                    );
                }
            }
        }
    }

    pub fn print_outcome(&self, outcome: &JobOutcome) {
        match self.mode {
            OutputMode::Human => self.print_human_outcome(outcome),
            OutputMode::Json => {
                let json_output = serde_json::to_string_pretty(outcome)
                    .unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_outcome(outcome),
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_outcome(&self, outcome: &JobOutcome) {
        println!();
        self.print_separator();

        let headline = match outcome.state {
            JobState::Succeeded if outcome.failures.is_empty() => "Export completed!",
            JobState::Succeeded => "Export completed with errors",
            JobState::Cancelled => "Export cancelled",
            _ => "Export failed",
        };

        if self.use_colors {
            let styled = match outcome.state {
                JobState::Succeeded if outcome.failures.is_empty() => style(headline).green().bold(),
                JobState::Succeeded | JobState::Cancelled => style(headline).yellow().bold(),
                _ => style(headline).red().bold(),
            };
            println!("{}", styled);
        } else {
            println!("{}", headline);
        }

        println!();
        println!("  {}", outcome.summary().replace('\n', "\n  "));
        println!();
        println!("  Files processed: {}/{}", outcome.processed_count, outcome.total_count);
        println!("  Bytes written:   {}", format_bytes(outcome.bytes_written));
        println!("  Time taken:      {}", format_duration(outcome.elapsed));

        if outcome.skipped_count > 0 {
            println!("  Skipped:         {} (no content in backup)", outcome.skipped_count);
        }

        if let Some(ref fault) = outcome.fault {
            println!("  Fault:           {}", fault);
        }

        if !outcome.failures.is_empty() {
            println!();
            println!("  Failed files:");
            for failure in &outcome.failures {
                println!(
                    "    - {} ({}: {})",
                    failure.record.display_path(),
                    failure.kind,
                    failure.message
                );
            }
        }

        self.print_separator();
    }

    fn print_plain_outcome(&self, outcome: &JobOutcome) {
        println!("COMPLETED: Export {}", outcome.state);
        println!("Exported: {}", outcome.success_count);
        println!("Processed: {}", outcome.processed_count);
        println!("Total: {}", outcome.total_count);
        println!("Skipped: {}", outcome.skipped_count);
        println!("Destination: {}", outcome.destination.display());
        println!("Duration: {:?}", outcome.elapsed);
        for failure in &outcome.failures {
            println!("FAILED: {}\t{}\t{}", failure.record.display_path(), failure.kind, failure.message);
        }
        if let Some(ref fault) = outcome.fault {
            println!("FAULT: {}", fault);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn column_width<'a, I>(values: I, header: &str) -> usize
where
    I: Iterator<Item = &'a str>,
{
    values
        .map(|v| v.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(header.len())
        .min(48)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputMode::Human, 1, false);
        assert_eq!(formatter.mode(), OutputMode::Human);
        assert_eq!(formatter.verbose_level, 1);
        assert!(!formatter.quiet);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(formatter.quiet);
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 1, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(!formatter.should_show_message(2));

        let quiet_formatter = OutputFormatter::new(OutputMode::Plain, 2, true);
        assert!(!quiet_formatter.should_show_message(0));
    }

    #[test]
    fn test_column_width() {
        let names = ["a", "longer-name"];
        assert_eq!(column_width(names.iter().copied(), "Name"), 11);
        assert_eq!(column_width(std::iter::empty(), "Domain"), 6);

        let long = "x".repeat(100);
        assert_eq!(column_width(std::iter::once(long.as_str()), "Path"), 48);
    }
}
