//! File checking orchestrator for Doc Guardian
//!
//! Architecture: Domain Services - Analyzer coordinates discovery, bounded reads and rule evaluation
//! - Rule set, language registry and path filter are built once and shared read-only
//! - A semaphore bounds in-flight checks; results are reassembled in path order
//! - Per-file failures become report entries and never stop other files

pub mod engine;

pub use engine::evaluate_units;

use crate::config::{GuardConfig, LimitsConfig, UnsupportedAction};
use crate::domain::violations::{GuardError, GuardResult, Severity, ValidationReport, Violation};
use crate::extractor::{extract_units, Language, LanguageRegistry};
use crate::patterns::{path_identity, relative_path, CheckTarget, PathFilter, RuleSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Main analyzer; cheap to clone, all clones share one rule set
#[derive(Clone)]
pub struct Analyzer {
    inner: Arc<AnalyzerState>,
}

struct AnalyzerState {
    config: GuardConfig,
    rules: RuleSet,
    languages: LanguageRegistry,
    path_filter: PathFilter,
}

/// Options for customizing a checking run
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Concurrent checks; falls back to `limits.workers`, then available parallelism
    pub workers: Option<usize>,
    /// Maximum number of files to check
    pub max_files: Option<usize>,
    /// Additional exclude patterns for directory walks
    pub exclude_patterns: Vec<String>,
    /// Whether to skip per-directory ignore files
    pub ignore_ignore_files: bool,
    /// Directory that rule and exclude globs are relative to; defaults to the
    /// working directory. Files outside it fall back to their walk root.
    pub base_dir: Option<PathBuf>,
}

/// Cooperative cancellation shared between the caller and a running check
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop scheduling new files; in-flight checks still finish
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        let rules = RuleSet::new(&config.rules)
            .map_err(|e| GuardError::config(format!("failed to compile rules: {e}")))?;
        let languages = LanguageRegistry::from_config(&config)?;
        let path_filter = PathFilter::from_config(&config.paths)
            .map_err(|e| GuardError::config(format!("failed to create path filter: {e}")))?;

        tracing::debug!(rules = rules.len(), languages = languages.all().len(), "analyzer ready");
        Ok(Self { inner: Arc::new(AnalyzerState { config, rules, languages, path_filter }) })
    }

    /// Create an analyzer with default configuration
    pub fn with_defaults() -> GuardResult<Self> {
        Self::new(GuardConfig::default())
    }

    pub fn config(&self) -> &GuardConfig {
        &self.inner.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.inner.rules
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.inner.languages
    }

    /// Check already-loaded text as if it were the file at `path`
    pub fn check_source(&self, path: &Path, text: &str) -> GuardResult<Vec<Violation>> {
        let target = CheckTarget::explicit(path);
        let language = self.language_for(&target)?;
        Ok(self.evaluate(&target, language, text))
    }

    /// Read (bounded) and check a single file
    pub async fn check_file(&self, target: &CheckTarget) -> GuardResult<Vec<Violation>> {
        let language = self.language_for(target)?;
        let text = read_bounded(&target.path, &self.inner.config.limits).await?;
        Ok(self.evaluate(target, language, &text))
    }

    /// Check files and directory trees, returning violations in path order
    pub async fn check_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
        cancel: &CancelSignal,
    ) -> GuardResult<ValidationReport> {
        let start_time = Instant::now();
        let targets = self.collect_targets(paths, options)?;
        let total = targets.len();
        let workers = options
            .workers
            .unwrap_or_else(|| self.inner.config.limits.effective_workers())
            .max(1);

        tracing::debug!(files = total, workers, "scheduling file checks");

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();
        let mut scheduled = 0;

        for (index, target) in targets.into_iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| GuardError::analysis("scheduler", e.to_string()))?;
            if cancel.is_cancelled() {
                break;
            }

            let analyzer = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = analyzer.check_file(&target).await;
                (index, target, result)
            });
            scheduled += 1;
        }

        let mut results: Vec<Vec<Violation>> = vec![Vec::new(); scheduled];
        while let Some(joined) = tasks.join_next().await {
            let (index, target, result) =
                joined.map_err(|e| GuardError::analysis("worker", e.to_string()))?;
            results[index] = match result {
                Ok(violations) => violations,
                Err(err) => self.error_entry(&target, err).into_iter().collect(),
            };
        }

        let mut report = ValidationReport::new();
        for violations in results {
            report.extend(violations);
        }
        report.set_files_checked(scheduled);
        if scheduled < total {
            tracing::warn!(skipped = total - scheduled, "run cancelled before all files were checked");
            report.mark_cancelled(total - scheduled);
        }

        tracing::info!(
            files = scheduled,
            errors = report.summary.violations_by_severity.error,
            warnings = report.summary.violations_by_severity.warning,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "file check complete"
        );
        Ok(report)
    }

    /// Sorted, deduplicated check targets for the given paths
    fn collect_targets<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> GuardResult<Vec<CheckTarget>> {
        let base = options
            .base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .map(|dir| path_identity(&dir));

        let mut filter = self.inner.path_filter.clone();
        for pattern in &options.exclude_patterns {
            filter.add_pattern(pattern)?;
        }
        if options.ignore_ignore_files {
            filter = filter.without_ignore_files();
        }
        if let Some(base) = &base {
            filter = filter.with_base(base.clone());
        }

        let mut targets = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                targets.extend(filter.find_files(path)?);
            } else if path.exists() {
                // named special files (pipes, devices) are read like any other
                targets.push(CheckTarget::explicit_in(path, base.as_deref()));
            } else {
                return Err(GuardError::Io {
                    source: io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("{} does not exist", path.display()),
                    ),
                });
            }
        }

        let mut keyed: Vec<(PathBuf, CheckTarget)> =
            targets.into_iter().map(|target| (path_identity(&target.path), target)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|a, b| a.0 == b.0);

        let mut targets: Vec<CheckTarget> = keyed.into_iter().map(|(_, target)| target).collect();
        if let Some(max_files) = options.max_files {
            targets.truncate(max_files);
        }
        Ok(targets)
    }

    fn language_for(&self, target: &CheckTarget) -> GuardResult<&Language> {
        self.inner
            .languages
            .detect(&target.path, &target.relative)
            .ok_or_else(|| GuardError::UnsupportedFileType { path: target.path.clone() })
    }

    fn evaluate(&self, target: &CheckTarget, language: &Language, text: &str) -> Vec<Violation> {
        let Some(rule) = self.inner.rules.select(&target.relative, target.file_name()) else {
            tracing::trace!(file = %target.relative, "no convention rule applies");
            return Vec::new();
        };
        tracing::debug!(file = %target.relative, language = %language.name, rule = rule.rule_id(), "checking");
        evaluate_units(rule, &report_path(&target.path), extract_units(language, text))
    }

    /// Per-file failure as a report entry; `None` when policy drops it
    fn error_entry(&self, target: &CheckTarget, err: GuardError) -> Option<Violation> {
        let path = report_path(&target.path);
        let (severity, message) = match &err {
            GuardError::UnsupportedFileType { .. } => {
                let policy = self.inner.config.unsupported;
                if policy.action == UnsupportedAction::Skip {
                    tracing::debug!(file = %target.relative, "skipping unsupported file");
                    return None;
                }
                (policy.severity, "no language is registered for this file type".to_string())
            }
            GuardError::FileTooLarge { size, limit, .. } => {
                (Severity::Error, format!("file is {size} bytes, above the {limit}-byte limit"))
            }
            GuardError::ReadTimeout { timeout_ms, .. } => {
                (Severity::Error, format!("read did not finish within {timeout_ms}ms"))
            }
            GuardError::Io { source } => (Severity::Error, format!("failed to read file: {source}")),
            other => (Severity::Error, other.to_string()),
        };

        tracing::warn!(file = %target.relative, error = %err, "file not checked");
        Some(Violation::new(err.check_id(), severity, path, message))
    }
}

/// Path as shown in reports: the given path without a leading `./`
fn report_path(path: &Path) -> PathBuf {
    PathBuf::from(relative_path(path, None))
}

/// Read a file as text within the configured size and time limits
async fn read_bounded(path: &Path, limits: &LimitsConfig) -> GuardResult<String> {
    let limit = limits.max_file_bytes;
    let too_large = |size: u64| GuardError::FileTooLarge { path: path.to_path_buf(), size, limit };

    let read = async {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        if size > limit {
            return Err(too_large(size));
        }

        let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
        file.take(limit + 1).read_to_end(&mut bytes).await?;
        if bytes.len() as u64 > limit {
            return Err(too_large(bytes.len() as u64));
        }
        Ok::<_, GuardError>(bytes)
    };

    let bytes = tokio::time::timeout(limits.read_timeout(), read).await.map_err(|_| {
        GuardError::ReadTimeout { path: path.to_path_buf(), timeout_ms: limits.read_timeout_ms }
    })??;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
