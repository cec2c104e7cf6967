//! Documentation unit extraction
//!
//! Architecture: Tokenizer - Source text becomes a lazy stream of documentation units
//! - Comment styles classify lines; this module decides what forms a unit
//! - The file header is the first comment run before any code
//! - Other units are comment runs immediately preceding a top-level declaration

pub mod comment_style;
pub mod language;

pub use comment_style::{CommentStyle, LineClass, ScanState};
pub use language::{DeclarationGrammar, Language, LanguageRegistry};

use crate::domain::unit::{DocumentationUnit, UnitKind};
use std::iter::{Enumerate, FusedIterator};
use std::str::Lines;

/// Units of `text` read as `language`, in file order
pub fn extract_units<'a>(language: &'a Language, text: &'a str) -> UnitIter<'a> {
    UnitIter::new(language, text)
}

/// Comment lines collected since the last blank or code line
struct Run<'a> {
    start_line: u32,
    end_line: u32,
    raw: Vec<&'a str>,
    content: Vec<String>,
}

impl Run<'_> {
    fn into_unit(self, kind: UnitKind, declaration: Option<String>) -> DocumentationUnit {
        DocumentationUnit {
            kind,
            start_line: self.start_line,
            end_line: self.end_line,
            raw: self.raw.join("\n"),
            content: self.content,
            declaration,
        }
    }
}

/// Single-pass iterator over the documentation units of one file
pub struct UnitIter<'a> {
    language: &'a Language,
    lines: Enumerate<Lines<'a>>,
    state: ScanState,
    run: Option<Run<'a>>,
    /// No code seen yet, so the next finished run is the header
    header_open: bool,
    finished: bool,
}

impl<'a> UnitIter<'a> {
    pub fn new(language: &'a Language, text: &'a str) -> Self {
        Self {
            language,
            lines: text.lines().enumerate(),
            state: ScanState::default(),
            run: None,
            header_open: true,
            finished: false,
        }
    }

    fn push_comment(&mut self, line_number: u32, line: &'a str, content: String) {
        let run = self.run.get_or_insert_with(|| Run {
            start_line: line_number,
            end_line: line_number,
            raw: Vec::new(),
            content: Vec::new(),
        });
        run.end_line = line_number;
        run.raw.push(line);
        run.content.push(content);
    }

    /// Emit the pending run as the header if no code has been seen
    fn close_header(&mut self, declaration: Option<String>) -> Option<DocumentationUnit> {
        if !self.header_open || self.run.is_none() {
            return None;
        }
        self.header_open = false;
        self.run.take().map(|run| run.into_unit(UnitKind::Header, declaration))
    }
}

impl Iterator for UnitIter<'_> {
    type Item = DocumentationUnit;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some((index, line)) = self.lines.next() {
            if index == 0 && is_shebang(line) {
                continue;
            }
            let line_number = u32::try_from(index + 1).unwrap_or(u32::MAX);

            match self.language.style.classify(line, &mut self.state) {
                LineClass::Comment(content) => self.push_comment(line_number, line, content),
                LineClass::Blank => {
                    if let Some(unit) = self.close_header(None) {
                        return Some(unit);
                    }
                    // orphan run
                    self.run = None;
                }
                LineClass::Code => {
                    if self.run.is_none() {
                        self.header_open = false;
                        continue;
                    }
                    let declaration = self.language.declarations.match_line(line.trim_end());
                    if let Some(unit) = self.close_header(declaration.clone()) {
                        return Some(unit);
                    }
                    if let (Some(run), Some(name)) = (self.run.take(), declaration) {
                        return Some(run.into_unit(UnitKind::Declaration, Some(name)));
                    }
                }
            }
        }

        self.finished = true;
        self.close_header(None)
    }
}

impl FusedIterator for UnitIter<'_> {}

/// `#!/bin/sh` or `#! /usr/bin/env bash`, but not a Rust `#![attr]`
fn is_shebang(line: &str) -> bool {
    line.strip_prefix("#!").is_some_and(|rest| rest.trim_start().starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(language: &str, text: &str) -> Vec<DocumentationUnit> {
        let registry = LanguageRegistry::builtin().unwrap();
        let language = registry.get(language).unwrap();
        extract_units(language, text).collect()
    }

    #[test]
    fn test_go_header_and_declarations() {
        let text = "\
// Package cache implements TTL-based object storage
package cache

import \"time\"

// Get returns a cached value.
// WHY: avoids a database round trip
func (c *Cache) Get(key string) string {
\t// inner comment
\treturn \"\"
}

// orphan

var x = 1
";
        let units = units("go", text);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].kind, UnitKind::Header);
        assert_eq!(units[0].declaration.as_deref(), Some("cache"));
        assert_eq!((units[0].start_line, units[0].end_line), (1, 1));
        assert_eq!(units[0].content, ["Package cache implements TTL-based object storage"]);

        assert_eq!(units[1].kind, UnitKind::Declaration);
        assert_eq!(units[1].declaration.as_deref(), Some("Get"));
        assert_eq!((units[1].start_line, units[1].end_line), (6, 7));
        assert_eq!(units[1].raw, "// Get returns a cached value.\n// WHY: avoids a database round trip");
    }

    #[test]
    fn test_shell_shebang_is_skipped() {
        let text = "#!/usr/bin/env bash\n# PURPOSE: deploy\n# USAGE: ./deploy.sh env\n\nset -euo pipefail\n";
        let units = units("shell", text);

        assert_eq!(units.len(), 1);
        assert!(units[0].is_header());
        assert_eq!((units[0].start_line, units[0].end_line), (2, 3));
        assert_eq!(units[0].content, ["PURPOSE: deploy", "USAGE: ./deploy.sh env"]);
        assert_eq!(units[0].declaration, None);
    }

    #[test]
    fn test_inner_attribute_is_code_not_shebang() {
        let units = units("rust", "#![deny(missing_docs)]\n// PURPOSE: entry point\nfn main() {}\n");

        assert!(units.iter().all(|unit| !unit.is_header()));
        assert!(is_shebang("#! /usr/bin/env bash"));
        assert!(!is_shebang("#![allow(dead_code)]"));
    }

    #[test]
    fn test_file_without_comments_yields_nothing() {
        assert!(units("go", "package main\n\nfunc main() {}\n").is_empty());
        assert!(units("shell", "").is_empty());
        assert!(units("shell", "#!/bin/sh\necho hi\n").is_empty());
    }

    #[test]
    fn test_comment_after_code_is_not_a_header() {
        let units = units("shell", "set -e\n# PURPOSE: late\necho done\n");
        assert!(units.is_empty());
    }

    #[test]
    fn test_header_only_file() {
        let units = units("terraform", "# PURPOSE: network\n# SCOPE: vpc\n");

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].line_count(), 2);
    }

    #[test]
    fn test_blank_line_splits_runs() {
        let text = "# License: MIT\n\n# deploys the app\ndeploy() {\n  :\n}\n";
        let units = units("shell", text);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].content, ["License: MIT"]);
        assert_eq!(units[0].declaration, None);
        assert_eq!(units[1].kind, UnitKind::Declaration);
        assert_eq!(units[1].declaration.as_deref(), Some("deploy"));
    }

    #[test]
    fn test_vue_block_header() {
        let text = "<!--\n  PURPOSE: primary button\n\n  WHY: shared styling\n-->\n<template>\n  <button/>\n</template>\n";
        let units = units("component", text);

        assert_eq!(units.len(), 1);
        assert_eq!((units[0].start_line, units[0].end_line), (1, 5));
        assert_eq!(units[0].declaration.as_deref(), Some("template"));
        assert!(units[0].text().contains("WHY: shared styling"));
    }

    #[test]
    fn test_makefile_targets() {
        let text = "# PURPOSE: build helpers\n\n# Compile everything\nbuild: deps\n\tgo build ./...\n\n# not a target\nCC := gcc\n";
        let units = units("make", text);

        assert_eq!(units.len(), 2);
        assert_eq!(units[1].declaration.as_deref(), Some("build"));
    }

    #[test]
    fn test_iteration_is_lazy_and_fused() {
        let registry = LanguageRegistry::builtin().unwrap();
        let go = registry.get("go").unwrap();
        let text = "// a\npackage a\n\n// b\nfunc B() {}\n\n// c\nfunc C() {}\n";

        let mut iter = extract_units(go, text);
        assert_eq!(iter.next().map(|u| u.start_line), Some(1));
        assert_eq!(iter.next().map(|u| u.declaration), Some(Some("B".to_string())));
        assert_eq!(iter.next().map(|u| u.declaration), Some(Some("C".to_string())));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }
}
