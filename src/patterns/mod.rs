//! Rule selection and tag matching
//!
//! Architectural Principle: Service Layer - Rule selection is a deterministic policy
//! - Globs without `/` match the file name, globs with `/` match the relative path
//! - The most specific (longest) matching glob wins; ties go to the first-declared rule
//! - Tag lookup is case-insensitive and independent of comment syntax

pub mod path_filter;

use crate::config::{ConventionRule, TagMatch};
use crate::domain::violations::{GuardError, GuardResult};
use glob::MatchOptions;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};

pub use path_filter::{CheckTarget, PathFilter};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A gitignore-flavoured glob
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    source: String,
    glob: glob::Pattern,
    /// Contains a `/`, so it is matched against the whole relative path
    anchored: bool,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> GuardResult<Self> {
        let anchored = pattern.contains('/');
        let body = pattern.strip_prefix('/').unwrap_or(pattern);
        let glob = glob::Pattern::new(body)
            .map_err(|e| GuardError::pattern(format!("invalid glob '{pattern}': {e}")))?;
        Ok(Self { source: pattern.to_string(), glob, anchored })
    }

    pub fn matches(&self, relative: &str, file_name: &str) -> bool {
        if self.anchored {
            self.glob.matches_with(relative, MATCH_OPTIONS)
        } else {
            self.glob.matches_with(file_name, MATCH_OPTIONS)
        }
    }

    /// Longer patterns are more specific
    pub fn specificity(&self) -> usize {
        self.source.chars().count()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Normalize `path` to a forward-slash path relative to `root`
pub fn relative_path(path: &Path, root: Option<&Path>) -> String {
    let relative = root.and_then(|root| path.strip_prefix(root).ok()).unwrap_or(path);
    let text = relative.to_string_lossy().replace('\\', "/");
    text.strip_prefix("./").map(str::to_string).unwrap_or(text)
}

/// Forward-slash form of `path` below `base` (an absolute directory);
/// `None` when the path lies outside it
pub fn base_relative(path: &Path, base: &Path) -> Option<String> {
    let absolute = std::path::absolute(path).ok()?;
    absolute.strip_prefix(base).ok().map(|relative| relative_path(relative, None))
}

/// Absolute path without `.` components, so `./a.go` and `a.go` compare equal
pub fn path_identity(path: &Path) -> PathBuf {
    std::path::absolute(path)
        .map(|absolute| absolute.components().collect())
        .unwrap_or_else(|_| path.to_path_buf())
}

#[derive(Debug)]
struct CompiledRule {
    rule: ConventionRule,
    matcher: GlobMatcher,
    order: usize,
}

/// Convention rules compiled once per run and shared read-only by all workers
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: &[ConventionRule]) -> GuardResult<Self> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(order, rule)| {
                Ok(CompiledRule { rule: rule.clone(), matcher: GlobMatcher::new(&rule.pattern)?, order })
            })
            .collect::<GuardResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Most specific matching rule: longest glob, then first declared
    pub fn select(&self, relative: &str, file_name: &str) -> Option<&ConventionRule> {
        let selected = self
            .rules
            .iter()
            .filter(|compiled| compiled.matcher.matches(relative, file_name))
            .max_by_key(|compiled| (compiled.matcher.specificity(), Reverse(compiled.order)))?;

        tracing::debug!(file = relative, rule = selected.rule.rule_id(), "selected convention rule");
        Some(&selected.rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConventionRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Whether `tag` appears in the comment content under the given matching mode
pub fn tag_present(content: &[String], tag: &str, mode: TagMatch) -> bool {
    let needle = tag.trim().to_lowercase();
    match mode {
        TagMatch::Substring => content.iter().any(|line| line.to_lowercase().contains(&needle)),
        TagMatch::Prefix => {
            let prefix = format!("{needle}:");
            content.iter().any(|line| line.trim_start().to_lowercase().starts_with(&prefix))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(patterns: &[(&str, &str)]) -> RuleSet {
        let rules: Vec<_> = patterns
            .iter()
            .map(|(id, pattern)| ConventionRule::new(*pattern, &["PURPOSE"]).with_id(*id))
            .collect();
        RuleSet::new(&rules).unwrap()
    }

    fn selected<'a>(set: &'a RuleSet, relative: &str) -> Option<&'a str> {
        let file_name = relative.rsplit('/').next().unwrap_or(relative);
        set.select(relative, file_name).map(|rule| rule.rule_id())
    }

    #[test]
    fn test_most_specific_rule_wins() {
        let set = rules(&[("script", "*.sh"), ("pipeline", "pipelines/**/*.sh")]);

        assert_eq!(selected(&set, "pipelines/etl/load.sh"), Some("pipeline"));
        assert_eq!(selected(&set, "tools/release.sh"), Some("script"));
        assert_eq!(selected(&set, "main.go"), None);
    }

    #[test]
    fn test_ties_resolve_to_declaration_order() {
        let set = rules(&[("first", "*.go"), ("second", "c*.go"), ("third", "*.go")]);
        assert_eq!(selected(&set, "cache.go"), Some("second"));

        let set = rules(&[("first", "a*.go"), ("second", "*c.go")]);
        assert_eq!(selected(&set, "abc.go"), Some("first"));
    }

    #[test]
    fn test_unanchored_globs_match_file_name_anywhere() {
        let set = rules(&[("make", "Makefile")]);
        assert_eq!(selected(&set, "services/api/Makefile"), Some("make"));
    }

    #[test]
    fn test_anchored_single_star_stays_in_directory() {
        let matcher = GlobMatcher::new("scripts/*.sh").unwrap();
        assert!(matcher.matches("scripts/run.sh", "run.sh"));
        assert!(!matcher.matches("scripts/ci/run.sh", "run.sh"));

        let rooted = GlobMatcher::new("/infra/*.tf").unwrap();
        assert!(rooted.matches("infra/main.tf", "main.tf"));
    }

    #[test]
    fn test_relative_path_normalization() {
        assert_eq!(relative_path(Path::new("./src/a.go"), None), "src/a.go");
        assert_eq!(
            relative_path(Path::new("/repo/scripts/x.sh"), Some(Path::new("/repo"))),
            "scripts/x.sh"
        );
        assert_eq!(relative_path(Path::new("b.sh"), Some(Path::new("/elsewhere"))), "b.sh");
    }

    #[test]
    fn test_tag_matching_modes() {
        let content = vec!["Package cache implements storage".to_string(), "why: speed".to_string()];

        assert!(tag_present(&content, "WHY", TagMatch::Substring));
        assert!(tag_present(&content, "WHY", TagMatch::Prefix));
        assert!(!tag_present(&content, "PURPOSE", TagMatch::Substring));
        assert!(tag_present(&content, "cache", TagMatch::Substring));
        assert!(!tag_present(&content, "cache", TagMatch::Prefix));
    }
}
