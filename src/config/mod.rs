//! Configuration loading and management for Doc Guardian
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML formats
//! - Raw YAML structures are deserialized into immutable rule sets
//! - Default conventions for the supported ecosystems are embedded here
//! - Validation rejects malformed rule sets before any checking starts

use crate::domain::violations::{GuardError, GuardResult, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names searched (in order) when no `--config` is given
pub const DEFAULT_CONFIG_FILES: [&str; 3] =
    ["doc_guardian.yaml", "doc_guardian.yml", ".doc_guardian.yaml"];

const SUPPORTED_VERSIONS: [&str; 1] = ["1.0"];

/// Main configuration structure for Doc Guardian
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Directory-walk filtering
    #[serde(default)]
    pub paths: PathConfig,
    /// Convention rules in declaration order
    #[serde(default)]
    pub rules: Vec<ConventionRule>,
    #[serde(default)]
    pub unsupported: UnsupportedPolicy,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Additional languages registered next to the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageConfig>,
    /// Explicit file type assignments that win over extension detection
    #[serde(default, skip_serializing_if = "Vec::is_empty", alias = "fileTypes")]
    pub file_types: Vec<FileTypeOverride>,
    #[serde(default)]
    pub commit: CommitConfig,
}

/// Path filtering configuration for directory walks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathConfig {
    /// Exclude patterns (gitignore-style, `!` re-includes)
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Per-directory ignore file name
    #[serde(default, alias = "ignoreFile")]
    pub ignore_file: Option<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            patterns: vec![
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/vendor/**".to_string(),
                "**/.terraform/**".to_string(),
            ],
            ignore_file: Some(".docguardignore".to_string()),
        }
    }
}

/// Required documentation for files matching a glob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConventionRule {
    /// Identifier reported with violations (defaults to the pattern)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Glob selecting the files this rule governs
    pub pattern: String,
    /// Tags the file header must contain
    #[serde(default, alias = "requiredTags")]
    pub required_tags: Vec<String>,
    /// Ceiling on header block length
    #[serde(default, alias = "maxHeaderLines", skip_serializing_if = "Option::is_none")]
    pub max_header_lines: Option<u32>,
    #[serde(default = "default_rule_severity")]
    pub severity: Severity,
    #[serde(default, alias = "tagMatch")]
    pub tag_match: TagMatch,
    /// Tags every declaration doc comment must contain
    #[serde(default, alias = "declarationTags", skip_serializing_if = "Vec::is_empty")]
    pub declaration_tags: Vec<String>,
}

impl ConventionRule {
    pub fn new(pattern: impl Into<String>, required_tags: &[&str]) -> Self {
        Self {
            id: None,
            pattern: pattern.into(),
            required_tags: required_tags.iter().map(|t| t.to_string()).collect(),
            max_header_lines: None,
            severity: Severity::Error,
            tag_match: TagMatch::Substring,
            declaration_tags: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_max_header_lines(mut self, max: u32) -> Self {
        self.max_header_lines = Some(max);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_tag_match(mut self, tag_match: TagMatch) -> Self {
        self.tag_match = tag_match;
        self
    }

    pub fn with_declaration_tags(mut self, tags: &[&str]) -> Self {
        self.declaration_tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Id reported with violations
    pub fn rule_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.pattern)
    }
}

/// How a required tag is recognized inside a comment block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    /// Tag name appears anywhere (case-insensitive)
    #[default]
    Substring,
    /// A comment line begins with `TAG:` (case-insensitive)
    Prefix,
}

/// What to do with files no language handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnsupportedPolicy {
    #[serde(default)]
    pub action: UnsupportedAction,
    #[serde(default = "default_unsupported_severity")]
    pub severity: Severity,
}

impl Default for UnsupportedPolicy {
    fn default() -> Self {
        Self { action: UnsupportedAction::Report, severity: Severity::Warning }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedAction {
    /// Record an `unsupported-file-type` entry
    #[default]
    Report,
    /// Drop the file silently
    Skip,
}

/// Resource bounds for file checking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_bytes", alias = "maxFileBytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_read_timeout_ms", alias = "readTimeoutMs")]
    pub read_timeout_ms: u64,
    /// Concurrent file checks (defaults to available parallelism)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            read_timeout_ms: default_read_timeout_ms(),
            workers: None,
        }
    }
}

impl LimitsConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn effective_workers(&self) -> usize {
        self.workers
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, |n| n.get()))
            .max(1)
    }
}

/// A user-declared language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Exact file names (e.g. `Earthfile`)
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default, alias = "lineComments")]
    pub line_comments: Vec<String>,
    #[serde(default, alias = "blockComments")]
    pub block_comments: Vec<(String, String)>,
    /// Regexes matching top-level declarations; a `name` group captures the identifier
    #[serde(default)]
    pub declarations: Vec<String>,
}

/// Force files matching `pattern` to be read as `language`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileTypeOverride {
    pub pattern: String,
    pub language: String,
}

/// Commit message conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitConfig {
    /// Recognized commit types mapped to their descriptions
    #[serde(default = "default_commit_types")]
    pub types: BTreeMap<String, String>,
    /// Accept any type name
    #[serde(default, alias = "openTypes")]
    pub open_types: bool,
    #[serde(default = "default_max_subject_length", alias = "maxSubjectLength")]
    pub max_subject_length: usize,
    /// Accept merge/revert/fixup messages without checks
    #[serde(default = "default_true", alias = "ignoreAutogenerated")]
    pub ignore_autogenerated: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            types: default_commit_types(),
            open_types: false,
            max_subject_length: default_max_subject_length(),
            ignore_autogenerated: true,
        }
    }
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GuardResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            GuardError::config(format!("failed to read config file '{}': {e}", path.display()))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            GuardError::config(format!("failed to parse config file '{}': {e}", path.display()))
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), rules = config.rules.len(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> GuardResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| GuardError::config(format!("failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// First default config file present in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES.iter().map(|name| dir.join(name)).find(|candidate| candidate.is_file())
    }

    /// Load an explicit config, else a discovered one in `dir`, else the defaults
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> GuardResult<Self> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::discover(dir)) {
            Some(path) => Self::load_from_file(path),
            None => {
                tracing::debug!("no configuration file found, using built-in conventions");
                Ok(Self::default())
            }
        }
    }

    /// Default configuration with built-in conventions for each ecosystem
    pub fn with_defaults() -> Self {
        Self {
            version: default_version(),
            paths: PathConfig::default(),
            rules: Self::default_rules(),
            unsupported: UnsupportedPolicy::default(),
            limits: LimitsConfig::default(),
            languages: Vec::new(),
            file_types: Vec::new(),
            commit: CommitConfig::default(),
        }
    }

    fn default_rules() -> Vec<ConventionRule> {
        vec![
            ConventionRule::new("*.go", &["PURPOSE"])
                .with_id("go-file-header")
                .with_max_header_lines(30),
            ConventionRule::new("*.sh", &["PURPOSE", "USAGE"])
                .with_id("shell-script-header")
                .with_max_header_lines(25),
            ConventionRule::new("*.tf", &["PURPOSE", "SCOPE"])
                .with_id("terraform-module-header")
                .with_max_header_lines(20),
            ConventionRule::new("*.vue", &["PURPOSE"])
                .with_id("vue-component-header")
                .with_severity(Severity::Warning),
            ConventionRule::new("*.tsx", &["PURPOSE"])
                .with_id("tsx-component-header")
                .with_severity(Severity::Warning),
            ConventionRule::new("Makefile", &["PURPOSE"])
                .with_id("makefile-header")
                .with_severity(Severity::Warning),
            ConventionRule::new("[Jj]ustfile", &["PURPOSE"])
                .with_id("justfile-header")
                .with_severity(Severity::Warning),
            ConventionRule::new("Taskfile.yml", &["PURPOSE"])
                .with_id("taskfile-header")
                .with_severity(Severity::Warning),
        ]
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> GuardResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(GuardError::config(format!(
                "unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        for pattern in &self.paths.patterns {
            let body = pattern.strip_prefix('!').unwrap_or(pattern).trim_end_matches('/');
            compile_glob(body, "path pattern")?;
        }

        let mut seen_ids = HashSet::new();
        for rule in &self.rules {
            if rule.pattern.trim().is_empty() {
                return Err(GuardError::config("rule pattern must not be empty"));
            }
            compile_glob(&rule.pattern, &format!("rule '{}'", rule.rule_id()))?;

            if !seen_ids.insert(rule.rule_id()) {
                return Err(GuardError::config(format!("duplicate rule id '{}'", rule.rule_id())));
            }
            if rule.required_tags.iter().chain(&rule.declaration_tags).any(|t| t.trim().is_empty())
            {
                return Err(GuardError::config(format!(
                    "rule '{}' declares an empty tag name",
                    rule.rule_id()
                )));
            }
            if rule.max_header_lines == Some(0) {
                return Err(GuardError::config(format!(
                    "rule '{}' has max_header_lines of 0",
                    rule.rule_id()
                )));
            }
        }

        if self.limits.max_file_bytes == 0 || self.limits.read_timeout_ms == 0 {
            return Err(GuardError::config("limits must be greater than zero"));
        }
        if self.limits.workers == Some(0) {
            return Err(GuardError::config("limits.workers must be at least 1"));
        }

        for language in &self.languages {
            if language.name.trim().is_empty() {
                return Err(GuardError::config("custom language name must not be empty"));
            }
            if language.extensions.is_empty() && language.filenames.is_empty() {
                return Err(GuardError::config(format!(
                    "language '{}' needs at least one extension or filename",
                    language.name
                )));
            }
            if language.line_comments.is_empty() && language.block_comments.is_empty() {
                return Err(GuardError::config(format!(
                    "language '{}' declares no comment syntax",
                    language.name
                )));
            }
            for declaration in &language.declarations {
                regex::Regex::new(declaration).map_err(|e| {
                    GuardError::config(format!(
                        "invalid declaration regex in language '{}': {e}",
                        language.name
                    ))
                })?;
            }
        }

        for file_type in &self.file_types {
            compile_glob(&file_type.pattern, &format!("file type '{}'", file_type.language))?;
        }

        if self.commit.max_subject_length == 0 {
            return Err(GuardError::config("commit.max_subject_length must be at least 1"));
        }
        if self.commit.types.is_empty() && !self.commit.open_types {
            return Err(GuardError::config(
                "commit.types is empty; list types or set open_types: true",
            ));
        }

        Ok(())
    }

    pub fn to_yaml(&self) -> GuardResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardError::config(format!("failed to serialize config: {e}")))
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn compile_glob(pattern: &str, owner: &str) -> GuardResult<glob::Pattern> {
    glob::Pattern::new(pattern)
        .map_err(|e| GuardError::config(format!("invalid glob '{pattern}' in {owner}: {e}")))
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_true() -> bool {
    true
}

fn default_rule_severity() -> Severity {
    Severity::Error
}

fn default_unsupported_severity() -> Severity {
    Severity::Warning
}

fn default_max_file_bytes() -> u64 {
    1024 * 1024
}

fn default_read_timeout_ms() -> u64 {
    5_000
}

fn default_max_subject_length() -> usize {
    50
}

fn default_commit_types() -> BTreeMap<String, String> {
    [
        ("build", "Changes to the build system or external dependencies"),
        ("chore", "Maintenance that touches neither source nor tests"),
        ("ci", "Changes to CI configuration and scripts"),
        ("docs", "Documentation only changes"),
        ("feat", "A new feature"),
        ("fix", "A bug fix"),
        ("perf", "A change that improves performance"),
        ("refactor", "A change that neither fixes a bug nor adds a feature"),
        ("revert", "Reverts a previous commit"),
        ("style", "Formatting changes that do not affect meaning"),
        ("test", "Adding or correcting tests"),
    ]
    .into_iter()
    .map(|(name, description)| (name.to_string(), description.to_string()))
    .collect()
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: GuardConfig,
}

impl ConfigBuilder {
    /// Start from the built-in defaults
    pub fn new() -> Self {
        Self { config: GuardConfig::default() }
    }

    /// Start from the defaults with no convention rules
    pub fn without_rules() -> Self {
        let mut config = GuardConfig::default();
        config.rules.clear();
        Self { config }
    }

    pub fn add_rule(mut self, rule: ConventionRule) -> Self {
        self.config.rules.push(rule);
        self
    }

    pub fn add_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.paths.patterns.push(pattern.into());
        self
    }

    pub fn add_language(mut self, language: LanguageConfig) -> Self {
        self.config.languages.push(language);
        self
    }

    pub fn add_file_type(mut self, pattern: impl Into<String>, language: impl Into<String>) -> Self {
        self.config
            .file_types
            .push(FileTypeOverride { pattern: pattern.into(), language: language.into() });
        self
    }

    pub fn unsupported(mut self, action: UnsupportedAction, severity: Severity) -> Self {
        self.config.unsupported = UnsupportedPolicy { action, severity };
        self
    }

    pub fn limits(mut self, limits: LimitsConfig) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn commit(mut self, commit: CommitConfig) -> Self {
        self.config.commit = commit;
        self
    }

    pub fn build(self) -> GuardResult<GuardConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = GuardConfig::default();
        config.validate().unwrap();
        assert!(!config.rules.is_empty());
        assert_eq!(config.commit.max_subject_length, 50);
        assert!(config.commit.types.contains_key("feat"));
    }

    #[test]
    fn test_camel_case_schema() {
        let yaml = r#"
rules:
  - pattern: "*.go"
    requiredTags: [PURPOSE, WHY]
    maxHeaderLines: 12
    severity: warning
"#;
        let config = GuardConfig::load_from_str(yaml).unwrap();

        assert_eq!(config.version, "1.0");
        let rule = &config.rules[0];
        assert_eq!(rule.rule_id(), "*.go");
        assert_eq!(rule.required_tags, ["PURPOSE", "WHY"]);
        assert_eq!(rule.max_header_lines, Some(12));
        assert_eq!(rule.severity, Severity::Warning);
        assert_eq!(rule.tag_match, TagMatch::Substring);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = GuardConfig::load_from_str("rules: [pattern: ").unwrap_err();
        assert!(matches!(err, GuardError::Configuration { .. }));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = GuardConfig::load_from_str("rules:\n  - pattern: '*.sh'\n    requird_tags: [X]\n")
            .unwrap_err();
        assert!(err.to_string().contains("requird_tags"));
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            "version: '2.0'",
            "rules:\n  - pattern: '[oops'",
            "rules:\n  - {id: a, pattern: '*.sh'}\n  - {id: a, pattern: '*.go'}",
            "rules:\n  - {pattern: '*.sh', required_tags: ['  ']}",
            "rules:\n  - {pattern: '*.sh', max_header_lines: 0}",
            "limits: {workers: 0}",
            "commit: {max_subject_length: 0}",
            "commit: {types: {}}",
            "languages:\n  - {name: hcl2, extensions: [hcl2]}",
            "languages:\n  - {name: x, extensions: [x], line_comments: ['#'], declarations: ['(']}",
        ];

        for yaml in cases {
            let err = GuardConfig::load_from_str(yaml).unwrap_err();
            assert!(matches!(err, GuardError::Configuration { .. }), "{yaml}: {err}");
        }
    }

    #[test]
    fn test_open_types_allow_empty_type_map() {
        let config = GuardConfig::load_from_str("commit: {types: {}, open_types: true}").unwrap();
        assert!(config.commit.open_types);
    }

    #[test]
    fn test_discovery_and_resolve() {
        let temp_dir = TempDir::new().unwrap();
        assert!(GuardConfig::discover(temp_dir.path()).is_none());
        assert_eq!(GuardConfig::resolve(None, temp_dir.path()).unwrap(), GuardConfig::default());

        let path = temp_dir.path().join("doc_guardian.yml");
        fs::write(&path, "rules:\n  - {pattern: '*.sh', required_tags: [WHY]}\n").unwrap();

        assert_eq!(GuardConfig::discover(temp_dir.path()), Some(path));
        let config = GuardConfig::resolve(None, temp_dir.path()).unwrap();
        assert_eq!(config.rules.len(), 1);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.yaml");
        let err = GuardConfig::resolve(Some(&missing), temp_dir.path()).unwrap_err();
        assert!(matches!(err, GuardError::Configuration { .. }));
    }

    #[test]
    fn test_yaml_round_trip_keeps_rules() {
        let config = GuardConfig::default();
        let reloaded = GuardConfig::load_from_str(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(config, reloaded);
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::without_rules()
            .add_rule(ConventionRule::new("*.tf", &["SCOPE"]).with_id("tf"))
            .add_file_type("*.tfvars", "terraform")
            .unsupported(UnsupportedAction::Skip, Severity::Warning)
            .add_path_pattern("generated/")
            .build()
            .unwrap();

        assert_eq!(config.rules.len(), 1);
        assert!(config.paths.patterns.contains(&"generated/".to_string()));
        assert_eq!(config.unsupported.action, UnsupportedAction::Skip);

        let err = ConfigBuilder::without_rules()
            .add_rule(ConventionRule::new("[", &["X"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, GuardError::Configuration { .. }));
    }

    #[test]
    fn test_effective_workers_floor() {
        let limits = LimitsConfig { workers: Some(3), ..Default::default() };
        assert_eq!(limits.effective_workers(), 3);
        assert!(LimitsConfig::default().effective_workers() >= 1);
    }
}
