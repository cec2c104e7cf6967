//! Report generation with multiple output formats
//!
//! Architecture: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to text, JSON or CI annotations
//! - Output depends only on the report and options, so identical inputs render identically
//! - Empty reports render through the same path as any other

use crate::domain::violations::{display_path, GuardError, GuardResult, Severity, ValidationReport, Violation};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::str::FromStr;

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// `file:line: severity: message` lines and a summary
    #[default]
    Text,
    /// Array of violation records
    Json,
    /// GitHub Actions workflow commands
    GitHub,
}

impl OutputFormat {
    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["text", "json", "github"]
    }
}

impl FromStr for OutputFormat {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "github" => Ok(Self::GitHub),
            other => Err(GuardError::config(format!(
                "unknown output format '{other}' (expected one of: {})",
                Self::all_formats().join(", ")
            ))),
        }
    }
}

/// Options for customizing report output
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// ANSI colours in text output
    pub use_colors: bool,
    /// Whether to show violation suggestions
    pub show_suggestions: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonRecord<'a> {
    file: String,
    line: Option<u32>,
    rule_id: &'a str,
    severity: Severity,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

/// Renders validation reports
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a validation report in the specified format
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardResult<String> {
        let (violations, hidden) = self.filter_violations(&report.violations);

        match format {
            OutputFormat::Text => Ok(self.format_text(report, &violations, hidden)),
            OutputFormat::Json => self.format_json(&violations),
            OutputFormat::GitHub => Ok(self.format_github(&violations)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> GuardResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Violations at or above the minimum severity, and how many of those the limit cut
    fn filter_violations<'a>(&self, violations: &'a [Violation]) -> (Vec<&'a Violation>, usize) {
        let mut filtered: Vec<&Violation> = violations
            .iter()
            .filter(|v| self.options.min_severity.map_or(true, |min| v.severity >= min))
            .collect();

        let matching = filtered.len();
        if let Some(max) = self.options.max_violations {
            filtered.truncate(max);
        }
        let hidden = matching - filtered.len();
        (filtered, hidden)
    }

    fn format_text(&self, report: &ValidationReport, violations: &[&Violation], hidden: usize) -> String {
        let mut output = String::new();

        for violation in violations {
            let _ = writeln!(output, "{}", self.text_line(violation));
            if self.options.show_suggestions {
                if let Some(suggestion) = &violation.suggested_fix {
                    let _ = writeln!(output, "  help: {}", self.paint("2", suggestion));
                }
            }
        }

        if hidden > 0 {
            let _ = writeln!(output, "({hidden} more not shown)");
        }

        output.push_str(&self.format_summary(report));
        output
    }

    fn text_line(&self, violation: &Violation) -> String {
        if !self.options.use_colors {
            return violation.format_display();
        }
        let color = match violation.severity {
            Severity::Error => "31",
            Severity::Warning => "33",
        };
        let location = match violation.line_number {
            Some(line) => format!("{}:{line}", display_path(&violation.file_path)),
            None => display_path(&violation.file_path),
        };
        format!(
            "{}: {}: {}",
            self.paint("1", &location),
            self.paint(color, violation.severity.as_str()),
            violation.message
        )
    }

    fn format_summary(&self, report: &ValidationReport) -> String {
        let summary = &report.summary;
        let counts = summary.violations_by_severity;

        let mut line = format!(
            "checked {}: {}, {}",
            plural(summary.files_checked, "file"),
            plural(counts.error, "error"),
            plural(counts.warning, "warning")
        );
        if summary.cancelled {
            let _ = write!(line, " (cancelled, {} skipped)", plural(summary.files_skipped, "file"));
        }

        let color = if counts.error > 0 { "31" } else if counts.warning > 0 { "33" } else { "32" };
        format!("{}\n", self.paint(color, &line))
    }

    fn format_json(&self, violations: &[&Violation]) -> GuardResult<String> {
        let records: Vec<JsonRecord<'_>> = violations
            .iter()
            .map(|v| JsonRecord {
                file: display_path(&v.file_path),
                line: v.line_number,
                rule_id: &v.rule_id,
                severity: v.severity,
                message: &v.message,
                suggestion: v.suggested_fix.as_deref().filter(|_| self.options.show_suggestions),
            })
            .collect();

        let mut json = serde_json::to_string_pretty(&records)
            .map_err(|e| GuardError::config(format!("JSON serialization failed: {e}")))?;
        json.push('\n');
        Ok(json)
    }

    fn format_github(&self, violations: &[&Violation]) -> String {
        let mut output = String::new();

        for violation in violations {
            let level = match violation.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            let mut properties = format!("file={}", escape_property(&display_path(&violation.file_path)));
            if let Some(line) = violation.line_number {
                let _ = write!(properties, ",line={line}");
            }
            let _ = writeln!(
                output,
                "::{level} {properties},title={}::{}",
                escape_property(&violation.rule_id),
                escape_data(&violation.message)
            );
        }
        output
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.options.use_colors {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Escape workflow command data
fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

/// Escape workflow command property values
fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;

    fn create_test_report() -> ValidationReport {
        let mut report = ValidationReport::new();
        report.add_violation(
            Violation::new("go-file-header", Severity::Error, "pkg/cache.go", "missing required tag `WHY` in file header")
                .at_line(1)
                .with_suggestion("add a `WHY:` line to the header comment"),
        );
        report.add_violation(Violation::new(
            "unsupported-file-type",
            Severity::Warning,
            "assets/logo.png",
            "no language is registered for this file type",
        ));
        report.set_files_checked(2);
        report
    }

    fn plain() -> ReportFormatter {
        ReportFormatter::default()
    }

    #[test]
    fn test_text_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Text).unwrap();

        assert_eq!(
            output,
            "pkg/cache.go:1: error: missing required tag `WHY` in file header\n\
             assets/logo.png: warning: no language is registered for this file type\n\
             checked 2 files: 1 error, 1 warning\n"
        );
    }

    #[test]
    fn test_text_suggestions_and_colors() {
        let formatter = ReportFormatter::new(ReportOptions {
            use_colors: true,
            show_suggestions: true,
            ..Default::default()
        });
        let output = formatter.format_report(&create_test_report(), OutputFormat::Text).unwrap();

        assert!(output.contains("\x1b[31merror\x1b[0m"));
        assert!(output.contains("  help: "));
        assert!(output.contains("WHY:"));
    }

    #[test]
    fn test_json_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::Json).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();

        let records = json.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["file"], "pkg/cache.go");
        assert_eq!(records[0]["line"], 1);
        assert_eq!(records[0]["ruleId"], "go-file-header");
        assert_eq!(records[0]["severity"], "error");
        assert!(records[0].get("suggestion").is_none());
        assert!(records[1]["line"].is_null());
    }

    #[test]
    fn test_github_format() {
        let output = plain().format_report(&create_test_report(), OutputFormat::GitHub).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[0],
            "::error file=pkg/cache.go,line=1,title=go-file-header::missing required tag `WHY` in file header"
        );
        assert!(lines[1].starts_with("::warning file=assets/logo.png,title=unsupported-file-type::"));
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::new();

        assert_eq!(
            plain().format_report(&report, OutputFormat::Text).unwrap(),
            "checked 0 files: 0 errors, 0 warnings\n"
        );
        assert_eq!(plain().format_report(&report, OutputFormat::Json).unwrap(), "[]\n");
        assert_eq!(plain().format_report(&report, OutputFormat::GitHub).unwrap(), "");
    }

    #[test]
    fn test_output_is_byte_identical_across_calls() {
        let report = create_test_report();
        for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::GitHub] {
            let first = plain().format_report(&report, format).unwrap();
            let second = plain().format_report(&report.clone(), format).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_severity_filter_and_limit() {
        let formatter = ReportFormatter::new(ReportOptions {
            min_severity: Some(Severity::Error),
            ..Default::default()
        });
        let output = formatter.format_report(&create_test_report(), OutputFormat::Json).unwrap();
        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);

        let output = formatter.format_report(&create_test_report(), OutputFormat::Text).unwrap();
        assert!(!output.contains("more not shown"));

        let formatter = ReportFormatter::new(ReportOptions { max_violations: Some(1), ..Default::default() });
        let output = formatter.format_report(&create_test_report(), OutputFormat::Text).unwrap();
        assert!(output.contains("(1 more not shown)"));
        assert!(output.ends_with("checked 2 files: 1 error, 1 warning\n"));
    }

    #[test]
    fn test_cancelled_summary() {
        let mut report = ValidationReport::new();
        report.set_files_checked(3);
        report.mark_cancelled(7);

        let output = plain().format_report(&report, OutputFormat::Text).unwrap();
        assert_eq!(output, "checked 3 files: 0 errors, 0 warnings (cancelled, 7 files skipped)\n");
    }

    #[test]
    fn test_write_report_matches_format_report() {
        let report = create_test_report();
        let mut buffer = Vec::new();
        plain().write_report(&report, OutputFormat::GitHub, &mut buffer).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            plain().format_report(&report, OutputFormat::GitHub).unwrap()
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_github_escaping() {
        assert_eq!(escape_data("50%\nnext"), "50%25%0Anext");
        assert_eq!(escape_property("a:b,c"), "a%3Ab%2Cc");
    }
}
