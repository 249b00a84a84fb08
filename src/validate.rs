//! Syntax validation for merged file contents.
//!
//! # Hard Rules (Never Violate)
//!
//! 1. **Parse validation**: a merged Python file is only written when its
//!    tree-sitter parse has no ERROR or MISSING nodes.
//! 2. **Indentation**: statements of one block (and of the module) start at
//!    the same column, and `elif`/`else`/`except`/`finally` line up with
//!    their statement. Tree-sitter tolerates over-indented lines, so this is
//!    checked on top of the parse.
//! 3. **Python 3 statements**: the grammar also parses Python 2 `print` and
//!    `exec` statements and does not scope `return`/`yield`, so those are
//!    rejected here. Other compile-time checks (name binding, `nonlocal`,
//!    `break` outside a loop, `await` outside `async def`) are not made.
//! 4. **Unchecked languages**: files the crate cannot parse are accepted as
//!    merged; the merge loop never guesses at their syntax.

use crate::pool;
use crate::ts::{ParsedSource, TreeSitterError};
use std::path::Path;
use thiserror::Error;
use tree_sitter::{Node, Point};

/// Clauses that must start at the column of the statement owning them.
const ALIGNED_CLAUSES: &[&str] = &[
    "elif_clause",
    "else_clause",
    "except_clause",
    "except_group_clause",
    "finally_clause",
];

/// Statements the grammar accepts that Python 3 does not compile.
const PYTHON2_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Syntax check failed: found {count} errors")]
    SyntaxErrors {
        count: usize,
        errors: Vec<ErrorLocation>,
    },

    #[error("Tree-sitter error: {0}")]
    TreeSitter(#[from] TreeSitterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Location of an error node in the source.
#[derive(Debug, Clone)]
pub struct ErrorLocation {
    pub byte_start: usize,
    pub byte_end: usize,
    pub line: usize,
    pub column: usize,
    pub context: String,
}

/// Language of a file as far as syntax checking is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Python,
    /// No grammar available; content is never checked.
    Unchecked,
}

impl SourceLanguage {
    /// Detect the language from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") | Some("pyi") => SourceLanguage::Python,
            _ => SourceLanguage::Unchecked,
        }
    }

    pub fn is_checked(self) -> bool {
        self != SourceLanguage::Unchecked
    }
}

/// Validate that Python source has no parse errors, using the pooled parser.
pub fn validate(source: &str) -> Result<(), ValidationError> {
    pool::with_parser(|parser| {
        let parsed = parser.parse_with_source(source)?;
        let errors = if parsed.has_errors() {
            collect_errors(&parsed, source)
        } else {
            let mut errors = indentation_errors(&parsed, source);
            errors.extend(statement_errors(&parsed, source));
            errors.sort_by_key(|error| error.byte_start);
            errors
        };
        if errors.is_empty() {
            return Ok(());
        }

        Err(ValidationError::SyntaxErrors {
            count: errors.len(),
            errors,
        })
    })?
}

/// Boolean form of [`validate`] used by the merge loop.
pub fn is_valid_python(source: &str) -> bool {
    validate(source).is_ok()
}

/// Validate a file on disk.
pub fn validate_file(path: impl AsRef<Path>) -> Result<(), ValidationError> {
    let source = std::fs::read_to_string(path)?;
    validate(&source)
}

fn collect_errors(parsed: &ParsedSource<'_>, source: &str) -> Vec<ErrorLocation> {
    parsed
        .syntax_issues()
        .into_iter()
        .map(|issue| {
            error_location(source, issue.byte_range.start, issue.byte_range.end, issue.position)
        })
        .collect()
}

/// Statements whose start column disagrees with their siblings.
fn indentation_errors(parsed: &ParsedSource<'_>, source: &str) -> Vec<ErrorLocation> {
    let mut errors = Vec::new();
    let mut stack = vec![parsed.root_node()];

    while let Some(node) = stack.pop() {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .collect();

        match node.kind() {
            "module" | "block" => {
                let mut column = (node.kind() == "module").then_some(0);
                let mut last_row = None;
                for child in &children {
                    let start = child.start_position();
                    let same_row = last_row == Some(start.row);
                    last_row = Some(child.end_position().row);
                    // `a; b` puts several statements on the row the previous one ends on
                    if same_row {
                        continue;
                    }
                    match column {
                        None => column = Some(start.column),
                        Some(expected) if expected != start.column => {
                            errors.push(node_location(*child, source));
                        }
                        Some(_) => {}
                    }
                }
            }
            _ => {
                let start = node.start_position();
                for child in &children {
                    let clause = child.start_position();
                    if ALIGNED_CLAUSES.contains(&child.kind())
                        && clause.row != start.row
                        && clause.column != start.column
                    {
                        errors.push(node_location(*child, source));
                    }
                }
            }
        }

        stack.extend(children);
    }

    errors.sort_by_key(|error| error.byte_start);
    errors
}

/// Python 2 statements, and `return`/`yield` outside a function body.
fn statement_errors(parsed: &ParsedSource<'_>, source: &str) -> Vec<ErrorLocation> {
    let mut errors = Vec::new();
    let mut stack = vec![parsed.root_node()];

    while let Some(node) = stack.pop() {
        let misplaced = match node.kind() {
            kind if PYTHON2_STATEMENTS.contains(&kind) => true,
            "return_statement" | "yield" => !in_function(node),
            _ => false,
        };
        if misplaced {
            errors.push(node_location(node, source));
        }

        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    errors
}

/// Whether the nearest enclosing scope of `node` is a function. A class
/// body inside a function does not count.
fn in_function(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(scope) = current {
        match scope.kind() {
            "function_definition" | "lambda" => return true,
            "class_definition" => return false,
            _ => current = scope.parent(),
        }
    }
    false
}

fn node_location(node: Node<'_>, source: &str) -> ErrorLocation {
    error_location(source, node.start_byte(), node.end_byte(), node.start_position())
}

fn error_location(source: &str, byte_start: usize, byte_end: usize, point: Point) -> ErrorLocation {
    // Up to 20 bytes of context either side of the error
    let context_start = floor_char_boundary(source, byte_start.saturating_sub(20));
    let context_end = floor_char_boundary(source, (byte_end + 20).min(source.len()));
    let context = source
        .get(context_start..context_end)
        .unwrap_or("")
        .replace('\n', "\\n");

    ErrorLocation {
        byte_start,
        byte_end,
        line: point.row + 1,
        column: point.column + 1,
        context,
    }
}

fn floor_char_boundary(source: &str, mut index: usize) -> usize {
    while index > 0 && !source.is_char_boundary(index) {
        index -= 1;
    }
    index
}
