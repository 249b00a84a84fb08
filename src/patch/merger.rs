//! Splice `after` into a located region and repair its indentation until
//! the file parses again.
//!
//! Strategies run in a fixed order and the first whose result passes the
//! syntax check wins:
//!
//! 1. the naive splice, accepted outright for files that cannot be checked
//! 2. the matched region's indentation added to every `after` line, then to
//!    the first line only
//! 3. `after` with its common indentation stripped
//! 4. step 2 applied to the stripped lines
//! 5. every indentation level of the stripped lines, from 0 upwards

use crate::config::MergeSettings;
use crate::patch::ranking::CodeMatch;
use crate::validate::{is_valid_python, SourceLanguage};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Which strategy produced the merged text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The file's language is not checked; the splice was taken as is.
    Unchecked,
    Naive,
    MatchedIndent { indent: usize },
    MatchedIndentFirstLine { indent: usize },
    Dedent,
    DedentMatchedIndent { indent: usize },
    DedentMatchedIndentFirstLine { indent: usize },
    BruteForce { unit: usize, level: usize },
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Unchecked => write!(f, "unchecked"),
            MergeStrategy::Naive => write!(f, "naive"),
            MergeStrategy::MatchedIndent { indent } => write!(f, "matched indent ({indent})"),
            MergeStrategy::MatchedIndentFirstLine { indent } => {
                write!(f, "matched indent on first line ({indent})")
            }
            MergeStrategy::Dedent => write!(f, "dedent"),
            MergeStrategy::DedentMatchedIndent { indent } => {
                write!(f, "dedent + matched indent ({indent})")
            }
            MergeStrategy::DedentMatchedIndentFirstLine { indent } => {
                write!(f, "dedent + matched indent on first line ({indent})")
            }
            MergeStrategy::BruteForce { unit, level } => {
                write!(f, "brute force ({level} x {unit} spaces)")
            }
        }
    }
}

/// Every strategy produced invalid syntax. Carries everything needed to
/// diagnose the failed patch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Linting failed.\n\nOriginal code:\n```\n{original}\n```\n\nBefore:\n```\n{before}\n```\n\nAfter:\n```\n{after}\n```")]
pub struct MergeError {
    pub original: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub content: String,
    pub strategy: MergeStrategy,
}

/// Replace the lines of `located` in `content` with `after`.
pub fn merge(
    content: &str,
    located: &CodeMatch,
    before: &str,
    after: &str,
    language: SourceLanguage,
    settings: &MergeSettings,
) -> Result<Merged, MergeError> {
    let file_lines: Vec<&str> = content.split('\n').collect();
    let start = located.start.saturating_sub(1).min(file_lines.len());
    let end = located.end.min(file_lines.len()).max(start);
    let splice = Splice {
        prefix: &file_lines[..start],
        suffix: &file_lines[end..],
    };
    let matched = &file_lines[start..end];

    let naive = splice.join(after);
    if !language.is_checked() {
        return Ok(Merged {
            content: naive,
            strategy: MergeStrategy::Unchecked,
        });
    }
    if is_valid_python(&naive) {
        return Ok(Merged {
            content: naive,
            strategy: MergeStrategy::Naive,
        });
    }
    debug!("naive merge does not parse, repairing indentation");

    let before_first = before.lines().next().unwrap_or_default();
    let matched_first = matched.first().copied().unwrap_or_default();
    let after_lines: Vec<&str> = after.lines().collect();

    if let Some(merged) = splice.with_matched_indent(before_first, matched_first, &after_lines, false) {
        return Ok(merged);
    }

    let dedented = dedent(&after_lines);
    let dedented_refs: Vec<&str> = dedented.iter().map(String::as_str).collect();
    let candidate = splice.join(&dedented.join("\n"));
    if is_valid_python(&candidate) {
        return Ok(Merged {
            content: candidate,
            strategy: MergeStrategy::Dedent,
        });
    }

    if let Some(merged) = splice.with_matched_indent(before_first, matched_first, &dedented_refs, true) {
        return Ok(merged);
    }

    if let Some(merged) = splice.brute_force(&dedented_refs, settings) {
        return Ok(merged);
    }

    warn!("no indentation repair produced valid syntax");
    Err(MergeError {
        original: content.to_string(),
        before: before.to_string(),
        after: after.to_string(),
    })
}

/// The untouched lines around the located region.
struct Splice<'a> {
    prefix: &'a [&'a str],
    suffix: &'a [&'a str],
}

impl Splice<'_> {
    fn join(&self, modification: &str) -> String {
        let mut result = String::new();
        if !self.prefix.is_empty() {
            result.push_str(&self.prefix.join("\n"));
            result.push('\n');
        }
        result.push_str(modification);
        if !self.suffix.is_empty() {
            result.push('\n');
            result.push_str(&self.suffix.join("\n"));
        }
        result
    }

    /// Indent `lines` by the column at which `before_first` sits inside the
    /// first matched line: every line first, then the first line only.
    fn with_matched_indent(
        &self,
        before_first: &str,
        matched_first: &str,
        lines: &[&str],
        dedented: bool,
    ) -> Option<Merged> {
        let indent = matched_first.find(before_first)?;

        let all = indent_lines(lines, indent, false);
        let candidate = self.join(&all.join("\n"));
        if is_valid_python(&candidate) {
            let strategy = if dedented {
                MergeStrategy::DedentMatchedIndent { indent }
            } else {
                MergeStrategy::MatchedIndent { indent }
            };
            return Some(Merged {
                content: candidate,
                strategy,
            });
        }

        let first_only = indent_lines(lines, indent, true);
        let candidate = self.join(&first_only.join("\n"));
        if is_valid_python(&candidate) {
            let strategy = if dedented {
                MergeStrategy::DedentMatchedIndentFirstLine { indent }
            } else {
                MergeStrategy::MatchedIndentFirstLine { indent }
            };
            return Some(Merged {
                content: candidate,
                strategy,
            });
        }

        None
    }

    fn brute_force(&self, lines: &[&str], settings: &MergeSettings) -> Option<Merged> {
        let (unit, levels) = match indent_unit(lines) {
            Some(unit) => (unit, settings.max_indent_levels),
            None => (1, settings.max_base_indent),
        };

        (0..levels).find_map(|level| {
            let indented = indent_lines(lines, unit * level, false);
            let candidate = self.join(&indented.join("\n"));
            is_valid_python(&candidate).then_some(Merged {
                content: candidate,
                strategy: MergeStrategy::BruteForce { unit, level },
            })
        })
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Prefix `width` spaces to non-blank lines (only the first line when
/// `first_only`).
fn indent_lines(lines: &[&str], width: usize, first_only: bool) -> Vec<String> {
    let pad = " ".repeat(width);
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            if is_blank(line) || (first_only && idx > 0) {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect()
}

/// Strip the smallest indentation among non-blank lines from every line.
fn dedent(lines: &[&str]) -> Vec<String> {
    let common = lines
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| leading_whitespace(line))
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|line| {
            if is_blank(line) {
                String::new()
            } else {
                line.get(common..).unwrap_or_else(|| line.trim_start()).to_string()
            }
        })
        .collect()
}

/// Difference between the two smallest distinct indentation levels of
/// non-blank lines, if there are two.
fn indent_unit(lines: &[&str]) -> Option<usize> {
    let levels: BTreeSet<usize> = lines
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| leading_whitespace(line))
        .collect();
    let mut levels = levels.into_iter();
    let lowest = levels.next()?;
    let next = levels.next()?;
    Some(next - lowest)
}
