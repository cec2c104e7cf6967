//! Language registry: file type detection, comment styles and declaration grammars
//!
//! Architecture: Registry - Languages are data registered at startup
//! - Built-in languages cover the ecosystems of the style guide
//! - Custom languages and file type overrides come from configuration
//! - Adding a language never touches the rule engine

use crate::config::GuardConfig;
use crate::domain::violations::{GuardError, GuardResult};
use crate::extractor::comment_style::{
    style_for, BlockComments, CommentStyle, HybridComments, LineComments,
};
use crate::patterns::GlobMatcher;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Top-level declaration recognizers for one language
#[derive(Debug, Clone, Default)]
pub struct DeclarationGrammar {
    patterns: Vec<Regex>,
}

impl DeclarationGrammar {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> GuardResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    GuardError::pattern(format!("invalid declaration regex '{}': {e}", p.as_ref()))
                })
            })
            .collect::<GuardResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Name of the declaration on `line`, if it is one. Uses the `name`
    /// capture when present, otherwise the trimmed line.
    pub fn match_line(&self, line: &str) -> Option<String> {
        self.patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(line)?;
            let name = captures.name("name").map_or(line, |m| m.as_str());
            Some(name.trim().to_string())
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// A file type the extractor understands
#[derive(Debug, Clone)]
pub struct Language {
    pub name: String,
    /// Lowercase extensions without the dot
    pub extensions: Vec<String>,
    /// Exact file names such as `Makefile`
    pub filenames: Vec<String>,
    pub style: Arc<dyn CommentStyle>,
    pub declarations: DeclarationGrammar,
}

impl Language {
    pub fn new(
        name: &str,
        extensions: &[&str],
        filenames: &[&str],
        style: Arc<dyn CommentStyle>,
        declarations: &[&str],
    ) -> GuardResult<Self> {
        Ok(Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            filenames: filenames.iter().map(|f| f.to_string()).collect(),
            style,
            declarations: DeclarationGrammar::new(declarations)?,
        })
    }
}

/// Registered languages with lookup by override, file name and extension
#[derive(Debug, Default)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
    by_extension: HashMap<String, usize>,
    by_filename: HashMap<String, usize>,
    overrides: Vec<(GlobMatcher, usize)>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a language; later registrations take over shared extensions
    pub fn register(&mut self, language: Language) {
        let index = self.languages.len();
        for extension in &language.extensions {
            self.by_extension.insert(extension.clone(), index);
        }
        for filename in &language.filenames {
            self.by_filename.insert(filename.clone(), index);
        }
        self.languages.push(language);
    }

    /// Force files matching `pattern` to resolve to the named language
    pub fn add_override(&mut self, pattern: &str, language: &str) -> GuardResult<()> {
        let index = self.position(language).ok_or_else(|| {
            GuardError::config(format!("file type override names unknown language '{language}'"))
        })?;
        self.overrides.push((GlobMatcher::new(pattern)?, index));
        Ok(())
    }

    /// Built-in languages plus those declared in configuration
    pub fn from_config(config: &GuardConfig) -> GuardResult<Self> {
        let mut registry = Self::builtin()?;

        for custom in &config.languages {
            let extensions: Vec<&str> = custom.extensions.iter().map(String::as_str).collect();
            let filenames: Vec<&str> = custom.filenames.iter().map(String::as_str).collect();
            let declarations: Vec<&str> = custom.declarations.iter().map(String::as_str).collect();
            let language = Language::new(
                &custom.name,
                &extensions,
                &filenames,
                style_for(&custom.line_comments, &custom.block_comments),
                &declarations,
            )
            .map_err(|e| GuardError::config(format!("language '{}': {e}", custom.name)))?;
            registry.register(language);
        }

        for file_type in &config.file_types {
            registry.add_override(&file_type.pattern, &file_type.language)?;
        }

        tracing::debug!(languages = registry.languages.len(), "language registry ready");
        Ok(registry)
    }

    /// Resolve the language for `path`; `relative` is the path used for glob overrides
    pub fn detect(&self, path: &Path, relative: &str) -> Option<&Language> {
        let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();

        if let Some((_, index)) =
            self.overrides.iter().find(|(matcher, _)| matcher.matches(relative, &file_name))
        {
            return Some(&self.languages[*index]);
        }
        if let Some(index) = self.by_filename.get(&*file_name) {
            return Some(&self.languages[*index]);
        }

        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        self.by_extension.get(&extension).map(|index| &self.languages[*index])
    }

    pub fn get(&self, name: &str) -> Option<&Language> {
        self.position(name).map(|index| &self.languages[index])
    }

    pub fn all(&self) -> &[Language] {
        &self.languages
    }

    /// Last registered language with this name (case-insensitive)
    fn position(&self, name: &str) -> Option<usize> {
        self.languages.iter().rposition(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Languages from the style guide's ecosystems
    pub fn builtin() -> GuardResult<Self> {
        let mut registry = Self::new();
        let c_like = || Arc::new(HybridComments::new(&["//"], &[("/*", "*/")]));
        let hash = || Arc::new(LineComments::new(&["#"]));
        let markup = || Arc::new(BlockComments::new(&[("<!--", "-->")]));

        registry.register(Language::new(
            "go",
            &["go"],
            &[],
            c_like(),
            &[
                r"^func\s+(?:\([^)]*\)\s*)?(?P<name>\w+)",
                r"^type\s+(?P<name>\w+)",
                r"^(?:var|const)\s+(?P<name>\w+)",
                r"^(?:var|const|type)\s*\(",
                r"^package\s+(?P<name>\w+)",
            ],
        )?);

        registry.register(Language::new(
            "shell",
            &["sh", "bash", "zsh", "ksh"],
            &[],
            hash(),
            &[
                r"^(?:function\s+)?(?P<name>[A-Za-z_][\w:-]*)\s*\(\)",
                r"^function\s+(?P<name>[A-Za-z_][\w:-]*)",
            ],
        )?);

        registry.register(Language::new(
            "terraform",
            &["tf", "hcl"],
            &[],
            Arc::new(HybridComments::new(&["#", "//"], &[("/*", "*/")])),
            &[
                r#"^(?P<name>(?:resource|data)\s+"[^"]+"\s+"[^"]+")"#,
                r#"^(?P<name>(?:module|variable|output|provider)\s+"[^"]+")"#,
                r"^(?P<name>locals|terraform)\s*\{",
            ],
        )?);

        registry.register(Language::new(
            "javascript",
            &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"],
            &[],
            c_like(),
            &[
                r"^(?:export\s+(?:default\s+)?)?(?:async\s+)?function\*?\s+(?P<name>[\w$]+)",
                r"^(?:export\s+(?:default\s+)?)?(?:abstract\s+)?class\s+(?P<name>[\w$]+)",
                r"^(?:export\s+)?(?:declare\s+)?(?:const|let|var)\s+(?P<name>[\w$]+)",
                r"^(?:export\s+)?(?:declare\s+)?(?:interface|type|enum)\s+(?P<name>[\w$]+)",
                r"^export\s+default\s+(?P<name>[\w$]+)",
            ],
        )?);

        registry.register(Language::new(
            "component",
            &["vue", "svelte", "html", "htm"],
            &[],
            markup(),
            &[r"^<(?P<name>[A-Za-z][\w-]*)"],
        )?);

        registry.register(Language::new(
            "markdown",
            &["md", "markdown"],
            &[],
            markup(),
            &[r"^#{1,6}\s+(?P<name>.+)$"],
        )?);

        registry.register(Language::new(
            "make",
            &["mk"],
            &["Makefile", "makefile", "GNUmakefile"],
            hash(),
            &[r"^(?P<name>[A-Za-z0-9_./%-]+)\s*::?(?:[^=]|$)"],
        )?);

        registry.register(Language::new(
            "just",
            &["just"],
            &["justfile", "Justfile", ".justfile"],
            hash(),
            &[r"^@?(?P<name>[A-Za-z_][\w-]*)(?:\s+[^:]*)?:(?:[^=]|$)"],
        )?);

        registry.register(Language::new(
            "yaml",
            &["yml", "yaml"],
            &[],
            hash(),
            &[r"^(?P<name>[A-Za-z_][\w.-]*):", r"^  (?P<name>[A-Za-z_][\w:.-]*):\s*$"],
        )?);

        registry.register(Language::new(
            "rust",
            &["rs"],
            &[],
            Arc::new(HybridComments::new(&["//!", "///", "//"], &[("/*", "*/")])),
            &[
                r"^(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:fn|struct|enum|trait|mod|type|const|static)\s+(?P<name>\w+)",
                r"^impl\b(?P<name>[^{]*)",
            ],
        )?);

        registry.register(Language::new(
            "python",
            &["py", "pyi"],
            &[],
            hash(),
            &[r"^(?:async\s+)?def\s+(?P<name>\w+)", r"^class\s+(?P<name>\w+)"],
        )?);

        Ok(registry)
    }
}
