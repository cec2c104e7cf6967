//! Doc Guardian - Documentation convention enforcement for polyglot repositories
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure domain logic separated from file system and terminal concerns
//! - File path: extractor -> rule engine -> reporter
//! - Commit path: raw message -> commit validator -> reporter

pub mod analyzer;
pub mod commit;
pub mod config;
pub mod domain;
pub mod extractor;
pub mod patterns;
pub mod report;

// Re-export main types for convenient access
pub use domain::violations::{
    GuardError, GuardResult, Severity, ValidationReport, ValidationSummary, Violation,
};

pub use domain::{Cleanup, CommitMessage, DocumentationUnit, UnitKind};

pub use config::{ConfigBuilder, ConventionRule, GuardConfig, TagMatch};

pub use analyzer::{AnalysisOptions, Analyzer, CancelSignal};

pub use commit::{CommitValidator, CommitVerdict};

pub use extractor::{extract_units, Language, LanguageRegistry};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

use std::path::Path;

/// Main entry point bundling file checks, commit checks and report rendering
pub struct DocGuardian {
    analyzer: Analyzer,
    commit_validator: CommitValidator,
    report_formatter: ReportFormatter,
}

impl DocGuardian {
    /// Create a guardian with the given configuration
    pub fn new_with_config(config: GuardConfig) -> GuardResult<Self> {
        let commit_validator = CommitValidator::new(&config.commit);
        let analyzer = Analyzer::new(config)?;

        Ok(Self { analyzer, commit_validator, report_formatter: ReportFormatter::default() })
    }

    /// Create a guardian with the built-in conventions
    pub fn new() -> GuardResult<Self> {
        Self::new_with_config(GuardConfig::default())
    }

    /// Create a guardian loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        Self::new_with_config(GuardConfig::load_from_file(path)?)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        self.analyzer.config()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Check files and directory trees concurrently
    pub async fn check_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
        cancel: &CancelSignal,
    ) -> GuardResult<ValidationReport> {
        self.analyzer.check_paths(paths, options, cancel).await
    }

    /// Check in-memory source text as if it were the file at `path`
    pub fn check_source(&self, path: &Path, text: &str) -> GuardResult<ValidationReport> {
        let mut report = ValidationReport::new();
        report.extend(self.analyzer.check_source(path, text)?);
        report.set_files_checked(1);
        Ok(report)
    }

    /// Validate one verbatim commit message; `source` labels it in the report
    pub fn check_commit(&self, raw: &str, source: &Path) -> ValidationReport {
        self.check_commit_with(raw, source, Cleanup::Whitespace)
    }

    /// Validate one commit message after applying `cleanup`
    pub fn check_commit_with(&self, raw: &str, source: &Path, cleanup: Cleanup) -> ValidationReport {
        let verdict = self.commit_validator.validate_with(raw, source, cleanup);

        let mut report = ValidationReport::new();
        report.extend(verdict.violations);
        report.set_files_checked(1);
        report
    }

    /// Typed-error commit validation
    pub fn check_commit_strict(&self, raw: &str) -> GuardResult<CommitMessage> {
        self.commit_validator.validate_strict(raw)
    }

    /// Format a validation report for output
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> GuardResult<String> {
        self.report_formatter.format_report(report, format)
    }
}
