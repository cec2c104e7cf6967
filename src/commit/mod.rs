//! Conventional commit validation
//!
//! Architecture: Domain Service - Stateless validation of a single commit message
//! - `validate` collects every finding as a violation for reporting
//! - `validate_strict` stops at the first failure and returns it as a typed error
//! - Both are pure: no git access, no I/O

use crate::config::CommitConfig;
use crate::domain::commit::{Cleanup, CommitMessage};
use crate::domain::violations::{GuardError, GuardResult, Severity, Violation};
use std::path::Path;

/// Check id for subjects longer than the configured limit
pub const SUBJECT_TOO_LONG: &str = "subject-too-long";
/// Check id for a body that starts right after the header
pub const MISSING_BLANK_LINE: &str = "missing-blank-line";

/// Outcome of validating one commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitVerdict {
    /// Parsed message; `None` when malformed or exempt
    pub message: Option<CommitMessage>,
    pub violations: Vec<Violation>,
    /// Merge/revert/fixup message accepted without checks
    pub exempt: bool,
}

impl CommitVerdict {
    pub fn is_success(&self) -> bool {
        !self.violations.iter().any(Violation::is_blocking)
    }
}

/// Validates commit messages against the configured conventions
#[derive(Debug, Clone)]
pub struct CommitValidator {
    config: CommitConfig,
}

impl CommitValidator {
    pub fn new(config: &CommitConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Collect all violations for a verbatim message; `source` names it in reports
    pub fn validate(&self, raw: &str, source: &Path) -> CommitVerdict {
        self.validate_with(raw, source, Cleanup::Whitespace)
    }

    /// Like `validate`, applying `cleanup` first (`Strip` for editor message files)
    pub fn validate_with(&self, raw: &str, source: &Path, cleanup: Cleanup) -> CommitVerdict {
        if self.config.ignore_autogenerated && CommitMessage::is_autogenerated(raw) {
            tracing::debug!("autogenerated commit message accepted without checks");
            return CommitVerdict { message: None, violations: Vec::new(), exempt: true };
        }

        let message = match CommitMessage::parse_with(raw, cleanup) {
            Ok(message) => message,
            Err(err) => {
                let violation = error_violation(&err, source)
                    .with_suggestion("use `type(scope): subject`, e.g. `fix(api): handle empty token`");
                return CommitVerdict { message: None, violations: vec![violation], exempt: false };
            }
        };

        let mut violations = Vec::new();

        if let Err(err) = self.check_type(&message) {
            let known = self.config.types.keys().cloned().collect::<Vec<_>>().join(", ");
            violations.push(error_violation(&err, source).with_suggestion(format!("use one of: {known}")));
        }

        let length = message.subject_len();
        if length > self.config.max_subject_length {
            violations.push(
                Violation::new(
                    SUBJECT_TOO_LONG,
                    Severity::Warning,
                    source,
                    format!(
                        "subject is {length} characters, longer than {}",
                        self.config.max_subject_length
                    ),
                )
                .at_line(1),
            );
        }

        if !message.header_separated {
            violations.push(
                Violation::new(
                    MISSING_BLANK_LINE,
                    Severity::Warning,
                    source,
                    "header and body must be separated by a blank line",
                )
                .at_line(2),
            );
        }

        if let Err(err) = check_rationale(&message) {
            violations.push(
                error_violation(&err, source)
                    .with_suggestion("explain the break in the body, e.g. `BREAKING CHANGE: <what changed>`"),
            );
        }

        tracing::debug!(
            commit_type = %message.commit_type,
            breaking = message.is_breaking(),
            footers = ?message.footers(),
            violations = violations.len(),
            "commit message validated"
        );
        CommitVerdict { message: Some(message), violations, exempt: false }
    }

    /// Parse and validate, returning the first failure as a typed error.
    /// Warnings (subject length, missing blank line) never fail here, and
    /// autogenerated messages get no exemption.
    pub fn validate_strict(&self, raw: &str) -> GuardResult<CommitMessage> {
        let message = CommitMessage::parse(raw)?;
        self.check_type(&message)?;
        check_rationale(&message)?;
        Ok(message)
    }

    fn check_type(&self, message: &CommitMessage) -> GuardResult<()> {
        if self.config.open_types || self.config.types.contains_key(&message.commit_type) {
            return Ok(());
        }
        Err(GuardError::UnknownCommitType { commit_type: message.commit_type.clone() })
    }
}

fn check_rationale(message: &CommitMessage) -> GuardResult<()> {
    if message.is_breaking() && !message.has_rationale() {
        return Err(GuardError::MissingBreakingRationale);
    }
    Ok(())
}

fn error_violation(err: &GuardError, source: &Path) -> Violation {
    Violation::new(err.check_id(), Severity::Error, source, err.to_string()).at_line(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SOURCE: &str = "COMMIT_EDITMSG";

    fn validator() -> CommitValidator {
        CommitValidator::new(&CommitConfig::default())
    }

    fn check_ids(raw: &str) -> Vec<String> {
        validator()
            .validate(raw, Path::new(SOURCE))
            .violations
            .into_iter()
            .map(|v| v.rule_id)
            .collect()
    }

    #[rstest]
    #[case::scoped_feature("feat(auth): add SMS 2FA")]
    #[case::no_scope("fix: handle empty token")]
    #[case::breaking_with_footer(
        "feat(db)!: drop PostgreSQL 11 support\n\nBREAKING CHANGE: Requires PG >= 13.2"
    )]
    #[case::breaking_with_prose("refactor!: rename env vars\n\nAPP_ENV replaces ENV everywhere.")]
    #[case::footer_only_breaking("perf: batch writes\n\nBREAKING-CHANGE: flush is now async")]
    #[case::bare_breaking_token("feat!: drop v1 API\n\nBREAKING CHANGE:")]
    #[case::issue_reference_body("fix!: drop flag\n\n#42 explains why the flag is gone")]
    #[case::fifty_chars("docs: 12345678901234567890123456789012345678901234567890")]
    #[case::merge("Merge branch 'main' into feature/login")]
    #[case::fixup("fixup! feat(auth): add SMS 2FA")]
    fn test_valid_messages(#[case] raw: &str) {
        assert_eq!(check_ids(raw), Vec::<String>::new(), "{raw}");
    }

    #[rstest]
    #[case::no_colon("add login page", "malformed-commit")]
    #[case::empty_scope("feat(): add login", "malformed-commit")]
    #[case::empty("", "malformed-commit")]
    #[case::unknown_type("feature: add login", "unknown-commit-type")]
    #[case::breaking_blank_body("feat!: drop v1 API\n\n  \n", "missing-breaking-rationale")]
    #[case::long_subject(
        "feat: add a very long subject line that keeps going past fifty",
        SUBJECT_TOO_LONG
    )]
    #[case::no_separator("chore: bump deps\nrenovate weekly run", MISSING_BLANK_LINE)]
    fn test_single_finding(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(check_ids(raw), [expected], "{raw}");
    }

    #[test]
    fn test_breaking_without_body_has_exactly_one_rationale_violation() {
        let verdict = validator().validate("feat(db)!: drop PostgreSQL 11 support", Path::new(SOURCE));

        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].rule_id, "missing-breaking-rationale");
        assert_eq!(verdict.violations[0].file_path, Path::new(SOURCE));
        assert!(!verdict.is_success());
    }

    #[test]
    fn test_editor_file_cleanup() {
        let raw = "fix!: drop flag\n\n# Please enter the commit message\n";
        let validator = validator();

        let verdict = validator.validate_with(raw, Path::new(SOURCE), Cleanup::Strip);
        assert_eq!(verdict.violations[0].rule_id, "missing-breaking-rationale");

        // verbatim, the comment line is body text
        assert!(validator.validate(raw, Path::new(SOURCE)).violations.is_empty());
    }

    #[test]
    fn test_warnings_do_not_fail_verdict() {
        let verdict = validator().validate(
            "chore: a subject that is definitely longer than fifty characters\nbody",
            Path::new(SOURCE),
        );

        assert_eq!(verdict.violations.len(), 2);
        assert!(verdict.violations.iter().all(|v| v.severity == Severity::Warning));
        assert!(verdict.is_success());
    }

    #[test]
    fn test_open_types_and_custom_limits() {
        let config = CommitConfig { open_types: true, max_subject_length: 10, ..Default::default() };
        let verdict = CommitValidator::new(&config).validate("wip: quick save now", Path::new(SOURCE));

        assert_eq!(verdict.violations.len(), 1);
        assert_eq!(verdict.violations[0].rule_id, SUBJECT_TOO_LONG);
    }

    #[test]
    fn test_autogenerated_checked_when_not_ignored() {
        let config = CommitConfig { ignore_autogenerated: false, ..Default::default() };
        let verdict =
            CommitValidator::new(&config).validate("Merge branch 'main'", Path::new(SOURCE));

        assert!(!verdict.exempt);
        assert_eq!(verdict.violations[0].rule_id, "malformed-commit");
    }

    #[test]
    fn test_strict_returns_typed_errors() {
        let validator = validator();

        let message = validator.validate_strict("feat(auth): add SMS 2FA").unwrap();
        assert_eq!(message.scope.as_deref(), Some("auth"));

        assert!(matches!(
            validator.validate_strict("feature: x"),
            Err(GuardError::UnknownCommitType { commit_type }) if commit_type == "feature"
        ));
        assert!(matches!(
            validator.validate_strict("fix!: tighten parser"),
            Err(GuardError::MissingBreakingRationale)
        ));
        assert!(matches!(
            validator.validate_strict("nonsense"),
            Err(GuardError::MalformedCommit { .. })
        ));
    }
}
