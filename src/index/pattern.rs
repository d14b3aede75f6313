use crate::error::{BackupExportError, Result};
use regex::{Regex, RegexBuilder};

/// Compiled form of a `LIKE`-style query pattern.
///
/// `%` matches any run of characters and `_` matches exactly one. A pattern
/// containing `%` must match the whole value; without it the pattern matches
/// anywhere inside the value. The empty pattern matches everything.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self> {
        if pattern.is_empty() || pattern.chars().all(|c| c == '%') {
            return Ok(Self {
                source: pattern.to_string(),
                regex: None,
            });
        }

        let anchored = pattern.contains('%');
        let mut expr = String::with_capacity(pattern.len() + 8);
        if anchored {
            expr.push('^');
        }

        let mut literal = [0u8; 4];
        for ch in pattern.chars() {
            match ch {
                '%' => expr.push_str(".*"),
                '_' => expr.push('.'),
                c => expr.push_str(&regex::escape(c.encode_utf8(&mut literal))),
            }
        }

        if anchored {
            expr.push('$');
        }

        let regex = RegexBuilder::new(&expr)
            .case_insensitive(!case_sensitive)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| BackupExportError::Config {
                message: format!("Invalid query pattern '{}': {}", pattern, e),
            })?;

        Ok(Self {
            source: pattern.to_string(),
            regex: Some(regex),
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self.regex {
            Some(ref regex) => regex.is_match(value),
            None => true,
        }
    }

    pub fn matches_everything(&self) -> bool {
        self.regex.is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn like(pattern: &str) -> Pattern {
        Pattern::compile(pattern, false).unwrap()
    }

    #[test]
    fn test_empty_matches_everything() {
        let pattern = like("");
        assert!(pattern.matches_everything());
        assert!(pattern.is_match(""));
        assert!(pattern.is_match("HomeDomain"));
        assert!(like("%%").matches_everything());
    }

    #[test]
    fn test_plain_pattern_is_substring() {
        let pattern = like("sms");
        assert!(pattern.is_match("Library/SMS/sms.db"));
        assert!(pattern.is_match("SMS"));
        assert!(!pattern.is_match("Library/Notes"));
    }

    #[test]
    fn test_percent_anchors() {
        let pattern = like("Library/%.db");
        assert!(pattern.is_match("Library/SMS/sms.db"));
        assert!(!pattern.is_match("Media/Library/x.db"));
        assert!(!pattern.is_match("Library/SMS/sms.db-wal"));
    }

    #[test]
    fn test_underscore_matches_single_char() {
        let pattern = like("IMG_000_.JPG");
        assert!(pattern.is_match("Media/DCIM/IMG_0001.JPG"));
        assert!(!pattern.is_match("Media/DCIM/IMG_01.JPG"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = like("a+b (1).txt");
        assert!(pattern.is_match("docs/a+b (1).txt"));
        assert!(!pattern.is_match("docs/aab 1.txt"));
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(like("homedomain").is_match("HomeDomain"));
        let strict = Pattern::compile("homedomain", true).unwrap();
        assert!(!strict.is_match("HomeDomain"));
    }
}
