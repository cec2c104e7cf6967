//! Path filtering using .gitignore-style patterns
//!
//! Architectural Principle: Service Layer - PathFilter owns every walk-time exclusion decision
//! - Configured patterns apply from the base directory (else the walk root)
//! - Ignore files apply from their own directory
//! - The last matching pattern wins; `!` re-includes
//! - Excluded directories are pruned, so nothing below them can be re-included

use crate::config::PathConfig;
use crate::domain::violations::GuardResult;
use crate::patterns::{base_relative, relative_path, GlobMatcher};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file selected for checking
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CheckTarget {
    pub path: PathBuf,
    /// Forward-slash path used for rule and override globs
    pub relative: String,
}

impl CheckTarget {
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<String>) -> Self {
        Self { path: path.into(), relative: relative.into() }
    }

    /// A file named directly on the command line
    pub fn explicit(path: &Path) -> Self {
        Self::new(path, relative_path(path, None))
    }

    /// A named file whose globs resolve from `base` when it lies below it
    pub fn explicit_in(path: &Path, base: Option<&Path>) -> Self {
        match base.and_then(|base| base_relative(path, base)) {
            Some(relative) => Self::new(path, relative),
            None => Self::explicit(path),
        }
    }

    pub fn file_name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }
}

/// Manages path filtering using .gitignore-style patterns
#[derive(Debug, Clone)]
pub struct PathFilter {
    rules: Vec<FilterRule>,
    /// Per-directory ignore file name; `None` disables ignore files
    ignore_filename: Option<String>,
    /// Absolute directory that relative paths are taken from
    base: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct FilterRule {
    matcher: GlobMatcher,
    /// `dir/**` also excludes `dir` itself so the walk can prune it
    container: Option<GlobMatcher>,
    directory_only: bool,
    negated: bool,
}

impl FilterRule {
    fn parse(line: &str) -> GuardResult<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (negated, body) = match line.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, line),
        };
        let directory_only = body.ends_with('/');
        let body = body.trim_end_matches('/');

        let container = match body.strip_suffix("/**") {
            Some(stem) if !stem.is_empty() => {
                let anchored = if stem.contains('/') { stem.to_string() } else { format!("/{stem}") };
                Some(GlobMatcher::new(&anchored)?)
            }
            _ => None,
        };

        Ok(Some(Self { matcher: GlobMatcher::new(body)?, container, directory_only, negated }))
    }

    fn matches_dir(&self, relative: &str) -> bool {
        let name = file_name(relative);
        self.matcher.matches(relative, name)
            || self.container.as_ref().is_some_and(|c| c.matches(relative, name))
    }

    fn matches(&self, relative: &str, is_dir: bool) -> bool {
        if is_dir {
            return self.matches_dir(relative) || ancestors(relative).any(|d| self.matches_dir(d));
        }
        (!self.directory_only && self.matcher.matches(relative, file_name(relative)))
            || ancestors(relative).any(|d| self.matches_dir(d))
    }
}

/// `Some(true)` if the last matching rule excludes, `Some(false)` if it re-includes
fn decide(rules: &[FilterRule], relative: &str, is_dir: bool) -> Option<bool> {
    rules.iter().rev().find(|rule| rule.matches(relative, is_dir)).map(|rule| !rule.negated)
}

fn file_name(relative: &str) -> &str {
    relative.rsplit('/').next().unwrap_or(relative)
}

/// Proper directory prefixes of a relative path: `a/b/c` yields `a`, `a/b`
fn ancestors(relative: &str) -> impl Iterator<Item = &str> {
    relative.match_indices('/').map(move |(index, _)| &relative[..index])
}

impl PathFilter {
    /// Create a filter from patterns and an optional ignore file name
    pub fn new(patterns: &[String], ignore_filename: Option<String>) -> GuardResult<Self> {
        let mut filter = Self { rules: Vec::new(), ignore_filename, base: None };
        for pattern in patterns {
            filter.add_pattern(pattern)?;
        }
        Ok(filter)
    }

    pub fn from_config(config: &PathConfig) -> GuardResult<Self> {
        Self::new(&config.patterns, config.ignore_file.clone())
    }

    /// Stop reading per-directory ignore files
    pub fn without_ignore_files(mut self) -> Self {
        self.ignore_filename = None;
        self
    }

    /// Take relative paths from `base` (absolute) instead of each walk root, so a
    /// file gets the same relative path whichever directory is walked
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Append a pattern; it overrides every earlier one
    pub fn add_pattern(&mut self, pattern: &str) -> GuardResult<()> {
        if let Some(rule) = FilterRule::parse(pattern)? {
            self.rules.push(rule);
        }
        Ok(())
    }

    /// Whether configured patterns exclude `relative` (ignore files not consulted)
    pub fn is_excluded(&self, relative: &str) -> bool {
        decide(&self.rules, relative, false).unwrap_or(false)
    }

    /// All files under `root` that survive filtering, in walk order
    pub fn find_files(&self, root: &Path) -> GuardResult<Vec<CheckTarget>> {
        let mut ignore_cache: HashMap<PathBuf, Vec<FilterRule>> = HashMap::new();
        let mut targets = Vec::new();

        let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name().into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable path during walk");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            let relative = self
                .base
                .as_deref()
                .and_then(|base| base_relative(entry.path(), base))
                .unwrap_or_else(|| relative_path(entry.path(), Some(root)));
            if self.excluded(root, entry.path(), &relative, is_dir, &mut ignore_cache) {
                tracing::trace!(path = %relative, "excluded");
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if entry.file_type().is_file() && !self.is_ignore_file(&entry.file_name().to_string_lossy()) {
                targets.push(CheckTarget::new(entry.path(), relative));
            }
        }

        Ok(targets)
    }

    fn is_ignore_file(&self, name: &str) -> bool {
        self.ignore_filename.as_deref() == Some(name)
    }

    fn excluded(
        &self,
        root: &Path,
        path: &Path,
        relative: &str,
        is_dir: bool,
        cache: &mut HashMap<PathBuf, Vec<FilterRule>>,
    ) -> bool {
        let mut excluded = decide(&self.rules, relative, is_dir).unwrap_or(false);

        let Some(ignore_filename) = &self.ignore_filename else {
            return excluded;
        };

        // Outermost directory first so deeper ignore files override
        let mut dirs: Vec<&Path> = path
            .parent()
            .map(|parent| parent.ancestors().take_while(|dir| dir.starts_with(root)).collect())
            .unwrap_or_default();
        dirs.reverse();

        for dir in dirs {
            let rules = cache
                .entry(dir.to_path_buf())
                .or_insert_with(|| load_ignore_file(&dir.join(ignore_filename)));
            if let Some(decision) = decide(rules, &relative_path(path, Some(dir)), is_dir) {
                excluded = decision;
            }
        }
        excluded
    }
}

/// Parse an ignore file; a missing file has no rules and bad lines are skipped
fn load_ignore_file(path: &Path) -> Vec<FilterRule> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read ignore file");
            return Vec::new();
        }
    };

    content
        .lines()
        .filter_map(|line| match FilterRule::parse(line) {
            Ok(rule) => rule,
            Err(err) => {
                tracing::warn!(path = %path.display(), pattern = line.trim(), error = %err, "invalid ignore pattern");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn filter(patterns: &[&str]) -> PathFilter {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        PathFilter::new(&patterns, None).unwrap()
    }

    fn relatives(targets: &[CheckTarget]) -> Vec<&str> {
        targets.iter().map(|t| t.relative.as_str()).collect()
    }

    #[test]
    fn test_basic_pattern_matching() {
        let filter = filter(&["target/**", "*.md"]);

        assert!(!filter.is_excluded("src/main.go"));
        assert!(filter.is_excluded("target/debug/build.sh"));
        assert!(filter.is_excluded("docs/README.md"));
        assert!(!filter.is_excluded("crates/target.sh"));
    }

    #[test]
    fn test_last_match_wins() {
        let filter = filter(&["*.sh", "!deploy.sh"]);

        assert!(filter.is_excluded("scripts/build.sh"));
        assert!(!filter.is_excluded("scripts/deploy.sh"));
    }

    #[test]
    fn test_directory_patterns() {
        let filter = filter(&["generated/", "**/.terraform/**"]);

        assert!(filter.is_excluded("api/generated/client.go"));
        assert!(!filter.is_excluded("api/generated.go"));
        assert!(filter.is_excluded("infra/.terraform/modules/x.tf"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(PathFilter::new(&["[invalid".to_string()], None).is_err());
    }

    #[test]
    fn test_find_files_prunes_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "").unwrap();
        fs::write(root.join("src/b.go"), "").unwrap();
        fs::write(root.join("src/a.go"), "").unwrap();
        fs::write(root.join("Makefile"), "").unwrap();

        let filter = PathFilter::from_config(&PathConfig::default()).unwrap();
        let targets = filter.find_files(root).unwrap();

        assert_eq!(relatives(&targets), ["Makefile", "src/a.go", "src/b.go"]);
        assert_eq!(targets[1].file_name(), "a.go");
    }

    #[test]
    fn test_ignore_files_apply_from_their_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("scripts/legacy")).unwrap();
        fs::write(root.join(".docguardignore"), "# legacy code\n*.tmp\n").unwrap();
        fs::write(root.join("scripts/.docguardignore"), "legacy/\n[broken\n").unwrap();
        fs::write(root.join("scripts/run.sh"), "").unwrap();
        fs::write(root.join("scripts/legacy/old.sh"), "").unwrap();
        fs::write(root.join("notes.tmp"), "").unwrap();

        let filter = PathFilter::new(&[], Some(".docguardignore".to_string())).unwrap();
        let targets = filter.find_files(root).unwrap();
        assert_eq!(relatives(&targets), ["scripts/run.sh"]);

        let all = filter.without_ignore_files().find_files(root).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_base_keeps_walk_root_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("scripts/legacy")).unwrap();
        fs::write(root.join("scripts/run.sh"), "").unwrap();
        fs::write(root.join("scripts/legacy/old.sh"), "").unwrap();

        let filter = PathFilter::new(&["scripts/legacy/".to_string()], None).unwrap().with_base(root);
        let targets = filter.find_files(&root.join("scripts")).unwrap();
        assert_eq!(relatives(&targets), ["scripts/run.sh"]);

        let target = CheckTarget::explicit_in(&root.join("scripts/./run.sh"), Some(root));
        assert_eq!(target.relative, "scripts/run.sh");
    }

    #[test]
    fn test_explicit_target_keeps_given_path() {
        let target = CheckTarget::explicit(Path::new("./infra/main.tf"));
        assert_eq!(target.relative, "infra/main.tf");
        assert_eq!(target.file_name(), "main.tf");
    }
}
