//! Doc Guardian CLI - Command-line interface for documentation convention checks
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates commands into file checks, commit checks and config inspection
//! - Owns process concerns: exit codes, terminal detection, Ctrl-C, logging setup
//! - Reports go to stdout, logs and fatal errors to stderr

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use doc_guardian::config::DEFAULT_CONFIG_FILES;
use doc_guardian::{
    AnalysisOptions, CancelSignal, Cleanup, DocGuardian, GuardConfig, OutputFormat,
    ReportFormatter, ReportOptions, Severity,
};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "DOC_GUARDIAN_LOG";

/// Doc Guardian - Documentation convention enforcement
#[derive(Parser)]
#[command(name = "doc-guardian")]
#[command(version)]
#[command(about = "Enforces file header, tag and commit message conventions")]
#[command(
    long_about = "Doc Guardian checks that source files carry the header blocks and comment tags a team style guide requires, and that commit messages follow the conventional commit grammar. Exit status is 0 when no error-severity violations are found, 1 when some are, and 2 on configuration or other fatal errors."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, global = true, default_value = "text")]
    log_format: LogFormatArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Check files for documentation convention violations
    CheckFiles {
        /// Paths to check (files or directories)
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormatArg,

        /// Concurrent file checks
        #[arg(short, long)]
        workers: Option<usize>,

        /// Additional exclude patterns
        #[arg(long, action = clap::ArgAction::Append)]
        exclude: Vec<String>,

        /// Ignore .docguardignore files
        #[arg(long)]
        no_ignore: bool,

        /// Minimum severity level to report
        #[arg(long, value_enum)]
        min_severity: Option<SeverityArg>,

        /// Maximum number of violations to report
        #[arg(long)]
        max_violations: Option<usize>,

        /// Show a suggested fix under each violation
        #[arg(long)]
        suggestions: bool,
    },

    /// Validate a commit message
    CheckCommit {
        /// Message text, a file containing it, or `-` for stdin
        message: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormatArg,

        /// Show a suggested fix under each violation
        #[arg(long)]
        suggestions: bool,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// List convention rules and supported languages
    Rules,

    /// Write the built-in conventions to a configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq, Eq)]
enum OutputFormatArg {
    Text,
    Json,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Text => OutputFormat::Text,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    match run_command(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(2);
        }
    }
}

async fn run_command(cli: Cli) -> Result<i32> {
    let use_colors = !cli.no_color && io::stdout().is_terminal();

    match cli.command {
        Commands::CheckFiles {
            paths,
            format,
            workers,
            exclude,
            no_ignore,
            min_severity,
            max_violations,
            suggestions,
        } => {
            let report_options = ReportOptions {
                use_colors: use_colors && format == OutputFormatArg::Text,
                show_suggestions: suggestions,
                max_violations,
                min_severity: min_severity.map(Into::into),
            };
            let analysis_options = AnalysisOptions {
                workers,
                exclude_patterns: exclude,
                ignore_ignore_files: no_ignore,
                ..Default::default()
            };
            run_check_files(cli.config.as_deref(), paths, format, report_options, analysis_options)
                .await
        }
        Commands::CheckCommit { message, format, suggestions } => {
            let report_options = ReportOptions {
                use_colors: use_colors && format == OutputFormatArg::Text,
                show_suggestions: suggestions,
                ..Default::default()
            };
            run_check_commit(cli.config.as_deref(), &message, format, report_options)
        }
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
        Commands::Rules => run_list_rules(cli.config.as_deref()),
        Commands::Init { force } => run_init(cli.config.as_deref(), force),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<GuardConfig> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    GuardConfig::resolve(explicit, &cwd).context("failed to load configuration")
}

async fn run_check_files(
    config_path: Option<&Path>,
    paths: Vec<PathBuf>,
    format: OutputFormatArg,
    report_options: ReportOptions,
    analysis_options: AnalysisOptions,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let guardian = DocGuardian::new_with_config(config)?
        .with_report_formatter(ReportFormatter::new(report_options));

    // Use current directory if no paths specified
    let paths = if paths.is_empty() { vec![PathBuf::from(".")] } else { paths };

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing files already in progress");
            on_interrupt.cancel();
        }
    });

    let report = guardian.check_files(&paths, &analysis_options, &cancel).await?;
    print!("{}", guardian.format_report(&report, format.into())?);

    Ok(if report.has_errors() { 1 } else { 0 })
}

fn run_check_commit(
    config_path: Option<&Path>,
    message: &str,
    format: OutputFormatArg,
    report_options: ReportOptions,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let guardian = DocGuardian::new_with_config(config)?
        .with_report_formatter(ReportFormatter::new(report_options));

    let (raw, source, cleanup) = read_commit_message(message)?;
    let report = guardian.check_commit_with(&raw, &source, cleanup);
    print!("{}", guardian.format_report(&report, format.into())?);

    Ok(if report.has_errors() { 1 } else { 0 })
}

/// `-` reads stdin, an existing file is read, anything else is the message itself.
/// Only message files get git's comment stripping; they come from an editor session.
fn read_commit_message(argument: &str) -> Result<(String, PathBuf, Cleanup)> {
    if argument == "-" {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw).context("failed to read commit message from stdin")?;
        return Ok((raw, PathBuf::from("<stdin>"), Cleanup::Whitespace));
    }

    let path = Path::new(argument);
    if path.is_file() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read commit message file {}", path.display()))?;
        return Ok((raw, path.to_path_buf(), Cleanup::Strip));
    }

    Ok((argument.to_string(), PathBuf::from("<message>"), Cleanup::Whitespace))
}

fn run_validate_config(config_path: Option<PathBuf>) -> Result<i32> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let Some(config_path) = config_path.or_else(|| GuardConfig::discover(&cwd)) else {
        bail!("no configuration file found (looked for {})", DEFAULT_CONFIG_FILES.join(", "));
    };

    let config = GuardConfig::load_from_file(&config_path)
        .with_context(|| format!("{} is invalid", config_path.display()))?;
    // Compiles rules and languages, catching overrides that name unknown languages
    let guardian = DocGuardian::new_with_config(config)
        .with_context(|| format!("{} is invalid", config_path.display()))?;

    println!("{} is valid", config_path.display());
    println!("  rules: {}", guardian.config().rules.len());
    println!("  languages: {}", guardian.analyzer().languages().all().len());
    println!("  path patterns: {}", guardian.config().paths.patterns.len());
    println!("  commit types: {}", guardian.config().commit.types.len());
    Ok(0)
}

fn run_list_rules(config_path: Option<&Path>) -> Result<i32> {
    let guardian = DocGuardian::new_with_config(load_config(config_path)?)?;
    let analyzer = guardian.analyzer();

    println!("Convention rules (most specific pattern wins):");
    for rule in analyzer.rules().iter() {
        let mut line = format!(
            "  {} [{}] {} requires {}",
            rule.rule_id(),
            rule.severity,
            rule.pattern,
            if rule.required_tags.is_empty() { "-".to_string() } else { rule.required_tags.join(", ") }
        );
        if let Some(max) = rule.max_header_lines {
            line.push_str(&format!("; header <= {max} lines"));
        }
        if !rule.declaration_tags.is_empty() {
            line.push_str(&format!("; declarations require {}", rule.declaration_tags.join(", ")));
        }
        println!("{line}");
    }

    println!();
    println!("Languages:");
    for language in analyzer.languages().all() {
        let mut matches: Vec<String> = language.extensions.iter().map(|e| format!("*.{e}")).collect();
        matches.extend(language.filenames.iter().cloned());
        println!("  {} ({}) comments: {}", language.name, matches.join(" "), language.style.describe());
    }
    Ok(0)
}

fn run_init(config_path: Option<&Path>, force: bool) -> Result<i32> {
    let target = config_path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]), Path::to_path_buf);

    if target.exists() && !force {
        bail!("{} already exists; use --force to overwrite", target.display());
    }

    let yaml = GuardConfig::with_defaults().to_yaml()?;
    fs::write(&target, yaml).with_context(|| format!("writing {}", target.display()))?;

    println!("Wrote default conventions to {}", target.display());
    Ok(0)
}

fn init_logging(verbose: bool, format: LogFormatArg) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_commit_argument_resolution() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("COMMIT_EDITMSG");
        fs::write(&file, "fix: handle empty token\n").unwrap();

        let (raw, source, cleanup) = read_commit_message(file.to_str().unwrap()).unwrap();
        assert_eq!(raw, "fix: handle empty token\n");
        assert_eq!(source, file);
        assert_eq!(cleanup, Cleanup::Strip);

        let (raw, source, cleanup) = read_commit_message("feat(auth): add SMS 2FA").unwrap();
        assert_eq!(raw, "feat(auth): add SMS 2FA");
        assert_eq!(source, PathBuf::from("<message>"));
        assert_eq!(cleanup, Cleanup::Whitespace);
    }

    #[tokio::test]
    async fn test_check_files_exit_codes() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.go");
        let bad = temp_dir.path().join("bad.go");
        fs::write(&good, "// PURPOSE: demo\npackage a\n").unwrap();
        fs::write(&bad, "package a\n").unwrap();
        let config = temp_dir.path().join("doc_guardian.yaml");
        fs::write(&config, "rules:\n  - {pattern: '*.go', required_tags: [PURPOSE]}\n").unwrap();

        for (path, expected) in [(good, 0), (bad, 1)] {
            let code = run_check_files(
                Some(config.as_path()),
                vec![path],
                OutputFormatArg::Json,
                ReportOptions::default(),
                AnalysisOptions::default(),
            )
            .await
            .unwrap();
            assert_eq!(code, expected);
        }
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("doc_guardian.yaml");

        assert_eq!(run_init(Some(target.as_path()), false).unwrap(), 0);
        assert!(run_init(Some(target.as_path()), false).is_err());
        assert_eq!(run_init(Some(target.as_path()), true).unwrap(), 0);
        assert_eq!(run_validate_config(Some(target)).unwrap(), 0);
    }
}
