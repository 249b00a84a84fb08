//! Parser for the tagged edit format.
//!
//! ```text
//! <modifications>
//! <file>pkg/model.py</file>
//! <original>
//! def greet(self):
//!     return "hi"
//! </original>
//! <patched>
//! def greet(self) -> str:
//!     return "hi"
//! </patched>
//! </modifications>
//! ```
//!
//! A text may hold any number of `<modifications>` blocks and each block any
//! number of file/original/patched groups.

use crate::config::EditSettings;
use crate::patch::CodePatch;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

const OPEN_TAG: &str = "<modifications>";
const CLOSE_TAG: &str = "</modifications>";

static FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<file>(.*?)</file>").expect("FILE_PATTERN regex should compile"));
static ORIGINAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<original>(.*?)</original>").expect("ORIGINAL_PATTERN regex should compile")
});
static PATCHED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<patched>(.*?)</patched>").expect("PATCHED_PATTERN regex should compile")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditParseError {
    #[error("text does not contain any <modifications> block")]
    MissingBlock,

    #[error("<modifications> block contains no complete file/original/patched edit")]
    NoEdits,
}

/// One edit as written by the producer: target file, text to replace and
/// its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub file: String,
    pub before: String,
    pub after: String,
}

/// Parse edits with the default placeholder list.
pub fn parse_edits(text: &str) -> Result<Vec<Edit>, EditParseError> {
    parse_edits_with(text, &EditSettings::default())
}

/// Parse every edit of every closed `<modifications>` block, in order.
pub fn parse_edits_with(text: &str, settings: &EditSettings) -> Result<Vec<Edit>, EditParseError> {
    let mut seen_block = false;
    let mut in_block = false;
    let mut block: Vec<&str> = Vec::new();
    let mut edits = Vec::new();

    for line in text.split('\n') {
        if in_block && line.starts_with(CLOSE_TAG) {
            edits.extend(parse_block(&block, settings));
            block.clear();
            in_block = false;
        } else if !in_block && line.starts_with(OPEN_TAG) {
            seen_block = true;
            in_block = true;
        } else if in_block {
            block.push(line);
        }
    }

    if in_block {
        warn!(lines = block.len(), "dropping unterminated <modifications> block");
    }
    if !seen_block {
        return Err(EditParseError::MissingBlock);
    }
    if edits.is_empty() {
        return Err(EditParseError::NoEdits);
    }

    debug!(edits = edits.len(), "parsed edits");
    Ok(edits)
}

fn parse_block(lines: &[&str], settings: &EditSettings) -> Vec<Edit> {
    let content = lines
        .iter()
        .filter(|line| !is_placeholder(line, settings))
        .copied()
        .collect::<Vec<_>>()
        .join("\n");

    let captures = |pattern: &Regex| -> Vec<String> {
        pattern
            .captures_iter(&content)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    };
    let files = captures(&FILE_PATTERN);
    let originals = captures(&ORIGINAL_PATTERN);
    let patched = captures(&PATCHED_PATTERN);

    if files.len() != originals.len() || files.len() != patched.len() {
        warn!(
            files = files.len(),
            originals = originals.len(),
            patched = patched.len(),
            "unbalanced edit tags, extra tags ignored"
        );
    }

    files
        .into_iter()
        .zip(originals)
        .zip(patched)
        .map(|((file, before), after)| Edit {
            file: file.trim().to_string(),
            before: before.trim_matches('\n').to_string(),
            after: after.trim_matches('\n').to_string(),
        })
        .collect()
}

fn is_placeholder(line: &str, settings: &EditSettings) -> bool {
    let trimmed = line.trim();
    settings
        .placeholder_lines
        .iter()
        .any(|placeholder| placeholder == trimmed)
}

/// Parse edits and turn each into a [`CodePatch`] carrying its unified diff.
pub fn parse_patches(text: &str) -> Result<Vec<CodePatch>, EditParseError> {
    parse_patches_with(text, &EditSettings::default())
}

pub fn parse_patches_with(
    text: &str,
    settings: &EditSettings,
) -> Result<Vec<CodePatch>, EditParseError> {
    Ok(parse_edits_with(text, settings)?
        .into_iter()
        .map(|edit| CodePatch::new(edit.file, edit.before, edit.after))
        .collect())
}
