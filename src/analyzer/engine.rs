//! Rule evaluation over documentation units
//!
//! Architecture: Domain Service - Pure function from (rule, units) to violations
//! - One violation per missing tag, never aggregated
//! - A file without a header reports every required tag at line 1
//! - Declaration tags apply to declaration units only

use crate::config::ConventionRule;
use crate::domain::unit::DocumentationUnit;
use crate::domain::violations::Violation;
use crate::patterns::tag_present;
use std::path::Path;

/// Evaluate `units` (in file order) against `rule`. Stops pulling units once
/// nothing further can be checked.
pub fn evaluate_units<I>(rule: &ConventionRule, file_path: &Path, units: I) -> Vec<Violation>
where
    I: IntoIterator<Item = DocumentationUnit>,
{
    let mut units = units.into_iter().peekable();
    let mut violations = Vec::new();

    match units.next_if(DocumentationUnit::is_header) {
        Some(header) => check_header(rule, file_path, &header, &mut violations),
        None => {
            for tag in &rule.required_tags {
                violations.push(
                    violation(rule, file_path, 1, format!("missing required tag `{tag}`: file has no header comment"))
                        .with_suggestion(format!("start the file with a comment containing `{tag}:`")),
                );
            }
        }
    }

    if !rule.declaration_tags.is_empty() {
        for unit in units {
            check_declaration(rule, file_path, &unit, &mut violations);
        }
    }

    violations
}

fn check_header(
    rule: &ConventionRule,
    file_path: &Path,
    header: &DocumentationUnit,
    violations: &mut Vec<Violation>,
) {
    for tag in &rule.required_tags {
        if !tag_present(&header.content, tag, rule.tag_match) {
            violations.push(
                violation(rule, file_path, header.start_line, format!("missing required tag `{tag}` in file header"))
                    .with_suggestion(format!("add a `{tag}:` line to the header comment")),
            );
        }
    }

    if let Some(max) = rule.max_header_lines {
        let lines = header.line_count();
        if lines > max {
            violations.push(
                violation(
                    rule,
                    file_path,
                    header.start_line,
                    format!("file header is {lines} lines, exceeds limit of {max}"),
                )
                .with_suggestion("move detail into declaration comments or docs"),
            );
        }
    }
}

fn check_declaration(
    rule: &ConventionRule,
    file_path: &Path,
    unit: &DocumentationUnit,
    violations: &mut Vec<Violation>,
) {
    let name = unit.declaration.as_deref().unwrap_or("declaration");
    for tag in &rule.declaration_tags {
        if !tag_present(&unit.content, tag, rule.tag_match) {
            violations.push(violation(
                rule,
                file_path,
                unit.start_line,
                format!("doc comment for `{name}` is missing tag `{tag}`"),
            ));
        }
    }
}

fn violation(rule: &ConventionRule, file_path: &Path, line: u32, message: String) -> Violation {
    Violation::new(rule.rule_id(), rule.severity, file_path, message).at_line(line)
}
