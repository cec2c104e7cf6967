//! Core domain models for convention violations and validation results
//!
//! Architecture: Rich Domain Models - Violations are values with behavior, not just data
//! - Violations know whether they block a run and how to render their location
//! - ValidationReport acts as the aggregate root for one checking run
//! - GuardError names every failure the checker can surface to a caller

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Severity levels for convention violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Deviations worth fixing that never fail a run
    Warning,
    /// Deviations that fail the run (non-zero exit)
    Error,
}

impl Severity {
    /// Whether this severity level should cause validation to fail
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single detected deviation from a convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Convention rule id or built-in check id that produced this violation
    pub rule_id: String,
    pub severity: Severity,
    /// File (or commit message source) the violation belongs to
    pub file_path: PathBuf,
    /// Line number (1-indexed); `None` for file-level entries
    pub line_number: Option<u32>,
    /// Human-readable description of the violation
    pub message: String,
    /// Suggested fix for the violation (if available)
    pub suggested_fix: Option<String>,
}

impl Violation {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        file_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            file_path: file_path.into(),
            line_number: None,
            message: message.into(),
            suggested_fix: None,
        }
    }

    /// Attach a 1-indexed line number
    pub fn at_line(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }

    /// Add a suggested fix
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested_fix = Some(suggestion.into());
        self
    }

    /// Whether this violation fails the run
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Format as `file:line: severity: message`
    pub fn format_display(&self) -> String {
        match self.line_number {
            Some(line) => format!(
                "{}:{}: {}: {}",
                display_path(&self.file_path),
                line,
                self.severity,
                self.message
            ),
            None => {
                format!("{}: {}: {}", display_path(&self.file_path), self.severity, self.message)
            }
        }
    }
}

/// Render a path with forward slashes so reports read the same on every platform
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Count of violations by severity level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub error: usize,
    pub warning: usize,
}

impl ViolationCounts {
    pub fn total(&self) -> usize {
        self.error + self.warning
    }

    /// Whether there are any blocking violations
    pub fn has_blocking(&self) -> bool {
        self.error > 0
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
        }
    }
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of files whose check completed
    pub files_checked: usize,
    /// Files never scheduled because the run was cancelled
    pub files_skipped: usize,
    pub violations_by_severity: ViolationCounts,
    /// Whether a cancellation signal cut the run short
    pub cancelled: bool,
}

/// Complete validation report for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Violations in discovery order
    pub violations: Vec<Violation>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_violation(&mut self, violation: Violation) {
        self.summary.violations_by_severity.add(violation.severity);
        self.violations.push(violation);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        for violation in violations {
            self.add_violation(violation);
        }
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether the report contains blocking violations (errors)
    pub fn has_errors(&self) -> bool {
        self.summary.violations_by_severity.has_blocking()
    }

    /// Success indicator: no error-severity violations. Warnings never affect it.
    pub fn is_success(&self) -> bool {
        !self.has_errors()
    }

    pub fn violations_by_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.severity == severity)
    }

    pub fn set_files_checked(&mut self, count: usize) {
        self.summary.files_checked = count;
    }

    /// Record that the run was cancelled with `skipped` files never scheduled
    pub fn mark_cancelled(&mut self, skipped: usize) {
        self.summary.cancelled = true;
        self.summary.files_skipped = skipped;
    }

    /// Merge another report into this one, appending its violations
    pub fn merge(&mut self, other: ValidationReport) {
        self.extend(other.violations);
        self.summary.files_checked += other.summary.files_checked;
        self.summary.files_skipped += other.summary.files_skipped;
        self.summary.cancelled |= other.summary.cancelled;
    }

    /// Stable sort by file path; violations within a file keep discovery order
    pub fn sort_violations(&mut self) {
        self.violations.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    }
}

/// Error types that can occur while checking conventions
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Configuration file could not be loaded, parsed or validated
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Glob or regex compilation failed
    #[error("pattern error: {message}")]
    Pattern { message: String },

    /// No registered language handles this file
    #[error("unsupported file type: {}", display_path(path))]
    UnsupportedFileType { path: PathBuf },

    #[error("file too large: {} is {size} bytes (limit {limit})", display_path(path))]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("timed out reading {} after {timeout_ms}ms", display_path(path))]
    ReadTimeout { path: PathBuf, timeout_ms: u64 },

    /// Checking failed for a specific file
    #[error("analysis error in {file}: {message}")]
    Analysis { file: String, message: String },

    #[error("unknown commit type `{commit_type}`")]
    UnknownCommitType { commit_type: String },

    #[error("breaking change has no rationale in the commit body")]
    MissingBreakingRationale,

    #[error("malformed commit header: {message}")]
    MalformedCommit { message: String },
}

impl GuardError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern { message: message.into() }
    }

    pub fn analysis(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis { file: file.into(), message: message.into() }
    }

    pub fn malformed_commit(message: impl Into<String>) -> Self {
        Self::MalformedCommit { message: message.into() }
    }

    /// Stable check id used when this error is recorded as a report entry
    pub fn check_id(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "config-error",
            Self::Io { .. } | Self::Analysis { .. } => "read-error",
            Self::Pattern { .. } => "pattern-error",
            Self::UnsupportedFileType { .. } => "unsupported-file-type",
            Self::FileTooLarge { .. } => "file-too-large",
            Self::ReadTimeout { .. } => "read-timeout",
            Self::UnknownCommitType { .. } => "unknown-commit-type",
            Self::MissingBreakingRationale => "missing-breaking-rationale",
            Self::MalformedCommit { .. } => "malformed-commit",
        }
    }
}

/// Result type for doc-guardian operations
pub type GuardResult<T> = Result<T, GuardError>;
