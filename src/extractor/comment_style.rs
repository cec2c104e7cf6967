//! Comment syntax variants
//!
//! Every language plugs a `CommentStyle` into the extractor. Styles only
//! classify lines; they never decide what a documentation unit is.

use std::fmt;
use std::sync::Arc;

/// How a single source line reads under a comment style
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Comment line with its markers stripped
    Comment(String),
    Blank,
    Code,
}

/// Scanner state carried across lines (open block comments)
#[derive(Debug, Default)]
pub struct ScanState {
    open_block: Option<usize>,
}

impl ScanState {
    pub fn in_block(&self) -> bool {
        self.open_block.is_some()
    }
}

/// A comment syntax that can classify source lines
pub trait CommentStyle: fmt::Debug + Send + Sync {
    /// Short label used in logs and `rules` output
    fn describe(&self) -> String;

    fn classify(&self, line: &str, state: &mut ScanState) -> LineClass;
}

/// Line comments introduced by a marker such as `//` or `#`
#[derive(Debug, Clone)]
pub struct LineComments {
    /// Longest marker first so `///` strips before `//`
    markers: Vec<String>,
}

impl LineComments {
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Self {
        let mut markers: Vec<String> = markers.iter().map(|m| m.as_ref().to_string()).collect();
        markers.sort_by_key(|m| std::cmp::Reverse(m.len()));
        Self { markers }
    }
}

impl CommentStyle for LineComments {
    fn describe(&self) -> String {
        self.markers.join(" ")
    }

    fn classify(&self, line: &str, _state: &mut ScanState) -> LineClass {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineClass::Blank;
        }
        self.markers
            .iter()
            .find_map(|marker| trimmed.strip_prefix(marker.as_str()))
            .map_or(LineClass::Code, |rest| LineClass::Comment(rest.trim().to_string()))
    }
}

/// Delimited comments such as `<!-- -->` or `/* */`, possibly spanning lines
#[derive(Debug, Clone)]
pub struct BlockComments {
    pairs: Vec<(String, String)>,
}

impl BlockComments {
    pub fn new<S: AsRef<str>>(pairs: &[(S, S)]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|(open, close)| (open.as_ref().to_string(), close.as_ref().to_string()))
                .collect(),
        }
    }

    /// Continue or close the block opened by pair `index`
    fn continue_block(&self, index: usize, trimmed: &str, state: &mut ScanState) -> LineClass {
        let close = &self.pairs[index].1;
        let content = match trimmed.find(close.as_str()) {
            Some(end) => {
                state.open_block = None;
                &trimmed[..end]
            }
            None => trimmed,
        };
        LineClass::Comment(strip_gutter(content))
    }
}

impl CommentStyle for BlockComments {
    fn describe(&self) -> String {
        self.pairs.iter().map(|(open, close)| format!("{open} {close}")).collect::<Vec<_>>().join(" ")
    }

    fn classify(&self, line: &str, state: &mut ScanState) -> LineClass {
        let trimmed = line.trim();
        if let Some(index) = state.open_block {
            return self.continue_block(index, trimmed, state);
        }
        if trimmed.is_empty() {
            return LineClass::Blank;
        }

        for (index, (open, _)) in self.pairs.iter().enumerate() {
            if let Some(rest) = trimmed.strip_prefix(open.as_str()) {
                state.open_block = Some(index);
                return self.continue_block(index, rest, state);
            }
        }
        LineClass::Code
    }
}

/// Line and block comments together, as in Go, Rust, JS or HCL
#[derive(Debug, Clone)]
pub struct HybridComments {
    line: LineComments,
    block: BlockComments,
}

impl HybridComments {
    pub fn new<S: AsRef<str>>(markers: &[S], pairs: &[(S, S)]) -> Self {
        Self { line: LineComments::new(markers), block: BlockComments::new(pairs) }
    }
}

impl CommentStyle for HybridComments {
    fn describe(&self) -> String {
        format!("{} {}", self.line.describe(), self.block.describe())
    }

    fn classify(&self, line: &str, state: &mut ScanState) -> LineClass {
        if state.in_block() {
            return self.block.classify(line, state);
        }
        match self.line.classify(line, state) {
            LineClass::Code => self.block.classify(line, state),
            other => other,
        }
    }
}

/// Build the style matching whichever syntaxes a language declares
pub fn style_for(markers: &[String], pairs: &[(String, String)]) -> Arc<dyn CommentStyle> {
    match (markers.is_empty(), pairs.is_empty()) {
        (false, false) => Arc::new(HybridComments::new(markers, pairs)),
        (true, false) => Arc::new(BlockComments::new(pairs)),
        _ => Arc::new(LineComments::new(markers)),
    }
}

/// Drop the `*` gutter used inside `/** ... */` blocks
fn strip_gutter(content: &str) -> String {
    let content = content.trim();
    content.strip_prefix('*').unwrap_or(content).trim().to_string()
}
