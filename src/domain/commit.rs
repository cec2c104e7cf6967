//! Conventional commit messages decomposed into their parts
//!
//! Architecture: Value Object - A parsed commit message has no identity beyond its text
//! - Parsing applies one of git's cleanup modes before reading the header
//! - Breaking-change detection covers both the `!` marker and footer tokens

use crate::domain::violations::{GuardError, GuardResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Footer tokens that mark a commit as breaking
pub const BREAKING_TOKENS: [&str; 2] = ["BREAKING CHANGE:", "BREAKING-CHANGE:"];

/// Line below which git discards an editor-session message
const SCISSORS_LINE: &str = "# ------------------------ >8 ------------------------";

/// Header prefixes git and review tools generate on their own
const AUTOGENERATED_PREFIXES: [&str; 5] = ["Merge ", "Revert \"", "fixup! ", "squash! ", "amend! "];

fn trailer_regex() -> &'static Regex {
    static TRAILER: OnceLock<Regex> = OnceLock::new();
    TRAILER.get_or_init(|| {
        Regex::new(r"^(?P<token>BREAKING[ -]CHANGE|[A-Za-z][A-Za-z0-9-]*)(?:: | #)(?P<value>.*)$")
            .expect("commit trailer regex is a valid constant")
    })
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(
            r"^(?P<type>[A-Za-z][A-Za-z0-9_-]*)(?:\((?P<scope>[^()]*)\))?(?P<breaking>!)?: (?P<subject>.*)$",
        )
        .expect("commit header regex is a valid constant")
    })
}

/// Which of git's cleanup modes to apply before parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cleanup {
    /// Strip trailing whitespace and surrounding blank lines only
    #[default]
    Whitespace,
    /// Also drop `#` comment lines and everything below the scissors line,
    /// as git does for messages written in an editor
    Strip,
}

/// A commit message split into `type(scope)!: subject` and an optional body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMessage {
    pub commit_type: String,
    pub scope: Option<String>,
    /// `!` present before the colon
    pub breaking_marker: bool,
    pub subject: String,
    /// Everything after the header, leading blank lines removed
    pub body: Option<String>,
    /// Whether a blank line separates header and body
    pub header_separated: bool,
}

impl CommitMessage {
    /// Parse a raw commit message taken verbatim (argument, stdin, `git log`).
    /// Fails with `MalformedCommit` when the header does not follow
    /// `type(scope)!: subject`.
    pub fn parse(raw: &str) -> GuardResult<Self> {
        Self::parse_with(raw, Cleanup::Whitespace)
    }

    /// Parse after applying `mode`
    pub fn parse_with(raw: &str, mode: Cleanup) -> GuardResult<Self> {
        let lines = cleanup(raw, mode);
        let Some((header, rest)) = lines.split_first() else {
            return Err(GuardError::malformed_commit("commit message is empty"));
        };

        let captures = header_regex().captures(header).ok_or_else(|| {
            GuardError::malformed_commit(format!(
                "`{header}` does not match `type(scope): subject`"
            ))
        })?;

        let scope = match captures.name("scope") {
            Some(scope) if scope.as_str().trim().is_empty() => {
                return Err(GuardError::malformed_commit("scope parentheses are empty"));
            }
            Some(scope) => Some(scope.as_str().trim().to_string()),
            None => None,
        };

        let subject = captures.name("subject").map_or("", |m| m.as_str()).trim();
        if subject.is_empty() {
            return Err(GuardError::malformed_commit("subject is empty"));
        }

        let header_separated = rest.first().map_or(true, |line| line.is_empty());
        let body_lines: Vec<&str> =
            rest.iter().map(String::as_str).skip_while(|line| line.is_empty()).collect();
        let body = if body_lines.is_empty() { None } else { Some(body_lines.join("\n")) };

        Ok(Self {
            commit_type: captures["type"].to_string(),
            scope,
            breaking_marker: captures.name("breaking").is_some(),
            subject: subject.to_string(),
            body,
            header_separated,
        })
    }

    /// Whether the header was generated by git or a review tool (merge, revert, fixup)
    pub fn is_autogenerated(raw: &str) -> bool {
        cleanup(raw, Cleanup::Strip)
            .first()
            .is_some_and(|header| AUTOGENERATED_PREFIXES.iter().any(|p| header.starts_with(p)))
    }

    /// Breaking via `!` or a `BREAKING CHANGE:` footer line
    pub fn is_breaking(&self) -> bool {
        self.breaking_marker || self.body_lines().any(|line| breaking_footer(line).is_some())
    }

    /// Whether the body has at least one non-empty line
    pub fn has_rationale(&self) -> bool {
        self.body_lines().any(|line| !line.trim().is_empty())
    }

    /// `Token: value` trailers from the last body paragraph
    pub fn footers(&self) -> Vec<(String, String)> {
        let body = self.body.as_deref().unwrap_or_default();
        let last_paragraph = body.rsplit("\n\n").next().unwrap_or_default();
        last_paragraph
            .lines()
            .filter_map(|line| trailer_regex().captures(line))
            .map(|captures| (captures["token"].to_string(), captures["value"].trim().to_string()))
            .collect()
    }

    /// Subject length in characters
    pub fn subject_len(&self) -> usize {
        self.subject.chars().count()
    }

    fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.body.as_deref().unwrap_or_default().lines()
    }
}

/// Text after a breaking-change footer token, if the line starts with one
fn breaking_footer(line: &str) -> Option<&str> {
    BREAKING_TOKENS.iter().find_map(|token| line.strip_prefix(token))
}

/// Message lines after `mode`, with trailing whitespace and surrounding
/// blank lines removed
fn cleanup(raw: &str, mode: Cleanup) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        if mode == Cleanup::Strip && line.starts_with('#') {
            if line.trim_end() == SCISSORS_LINE {
                break;
            }
            continue;
        }
        lines.push(line.trim_end().to_string());
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);
    lines
}
