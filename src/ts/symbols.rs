//! Symbol extraction for Python sources.
//!
//! This is the only place that knows the shape of the Python grammar: the
//! index asks for [`FileSymbols`] and never touches tree-sitter nodes itself.

use crate::pool;
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ParsedSource;
use serde::Serialize;
use tree_sitter::Node;

/// Bases that carry no information about a class hierarchy.
const IGNORED_BASES: &[&str] = &["object", "type"];

/// A 1-based, inclusive line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    /// Number of lines covered by the range.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end + 1 - self.start
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSymbol {
    pub name: String,
    pub range: LineRange,
    pub superclasses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSymbol {
    pub class_name: String,
    pub name: String,
    pub range: LineRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    pub name: String,
    pub range: LineRange,
}

/// Everything the index needs from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSymbols {
    pub classes: Vec<ClassSymbol>,
    pub methods: Vec<MethodSymbol>,
    pub functions: Vec<FunctionSymbol>,
}

/// Parse `source` with the pooled parser and extract its symbols.
///
/// A file whose tree contains ERROR or MISSING nodes is rejected: the index
/// only records files that parse cleanly.
pub fn parse_symbols(source: &str) -> Result<FileSymbols, TreeSitterError> {
    pool::with_parser(|parser| {
        let parsed = parser.parse_with_source(source)?;
        if let Some(issue) = parsed.first_issue() {
            return Err(TreeSitterError::SyntaxError {
                line: issue.position.row + 1,
                column: issue.position.column + 1,
            });
        }
        Ok(extract_symbols(&parsed))
    })?
}

/// Walk a parsed tree and collect classes, methods and free functions.
pub fn extract_symbols(parsed: &ParsedSource<'_>) -> FileSymbols {
    let mut symbols = FileSymbols::default();
    visit(parsed.root_node(), parsed, None, &mut symbols);
    symbols
}

fn visit(node: Node<'_>, parsed: &ParsedSource<'_>, class: Option<&str>, out: &mut FileSymbols) {
    let mut scope = class.map(str::to_string);

    match node.kind() {
        "class_definition" => {
            if let Some(name) = field_text(node, "name", parsed) {
                out.classes.push(ClassSymbol {
                    name: name.to_string(),
                    range: node_range(node),
                    superclasses: superclasses(node, parsed),
                });
                scope = Some(name.to_string());
            }
        }
        "function_definition" => {
            if let Some(name) = field_text(node, "name", parsed) {
                let range = node_range(node);
                match class {
                    Some(class_name) => out.methods.push(MethodSymbol {
                        class_name: class_name.to_string(),
                        name: name.to_string(),
                        range,
                    }),
                    None => out.functions.push(FunctionSymbol {
                        name: name.to_string(),
                        range,
                    }),
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(child, parsed, scope.as_deref(), out);
    }
}

fn field_text<'a>(node: Node<'_>, field: &str, parsed: &ParsedSource<'a>) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|child| parsed.node_text(child))
}

/// 1-based inclusive line range of a node.
///
/// A node that ends at column 0 of a later row stops on the previous line.
pub fn node_range(node: Node<'_>) -> LineRange {
    let start = node.start_position().row + 1;
    let end_point = node.end_position();
    let end = if end_point.column == 0 && end_point.row + 1 > start {
        end_point.row
    } else {
        end_point.row + 1
    };
    LineRange::new(start, end.max(start))
}

fn superclasses(class: Node<'_>, parsed: &ParsedSource<'_>) -> Vec<String> {
    let Some(arguments) = class.child_by_field_name("superclasses") else {
        return Vec::new();
    };

    let mut bases = Vec::new();
    let mut cursor = arguments.walk();
    for base in arguments.named_children(&mut cursor) {
        match base.kind() {
            "identifier" | "attribute" => {
                let text = parsed.node_text(base);
                if !IGNORED_BASES.contains(&text) {
                    bases.push(text.to_string());
                }
            }
            // `class Foo(type(bar))` names the class of `bar`
            "call" => {
                let is_type_call = field_text(base, "function", parsed) == Some("type");
                let first_arg = base
                    .child_by_field_name("arguments")
                    .and_then(|args| args.named_child(0));
                if let (true, Some(arg)) = (is_type_call, first_arg) {
                    bases.push(parsed.node_text(arg).to_string());
                }
            }
            _ => {}
        }
    }
    bases
}

/// Render the signature-only view of the class `class_name` starting at
/// `start_line`: the class header, method signatures (with decorators) and
/// class-level assignments. Comment lines are dropped.
///
/// Returns `None` when no such class exists in `source`.
pub fn class_signature(
    source: &str,
    class_name: &str,
    start_line: usize,
) -> Result<Option<String>, TreeSitterError> {
    let lines = pool::with_parser(|parser| {
        let parsed = parser.parse_with_source(source)?;
        let class = find_class(parsed.root_node(), &parsed, class_name, start_line);
        Ok::<_, TreeSitterError>(class.map(|node| signature_lines(node, &parsed)))
    })??;

    let Some(lines) = lines else {
        return Ok(None);
    };

    let source_lines: Vec<&str> = source.split_inclusive('\n').collect();
    let mut rendered = String::new();
    for line_no in lines {
        let Some(line) = source_lines.get(line_no - 1) else {
            continue;
        };
        if line.trim_start().starts_with('#') {
            continue;
        }
        rendered.push_str(line);
    }
    Ok(Some(rendered))
}

fn find_class<'t>(
    node: Node<'t>,
    parsed: &ParsedSource<'_>,
    class_name: &str,
    start_line: usize,
) -> Option<Node<'t>> {
    if node.kind() == "class_definition"
        && node.start_position().row + 1 == start_line
        && field_text(node, "name", parsed) == Some(class_name)
    {
        return Some(node);
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| find_class(child, parsed, class_name, start_line))
}

fn signature_lines(class: Node<'_>, parsed: &ParsedSource<'_>) -> Vec<usize> {
    let mut lines = header_lines(class, class);

    let Some(body) = class.child_by_field_name("body") else {
        return lines;
    };

    let mut cursor = body.walk();
    for stmt in body.named_children(&mut cursor) {
        match stmt.kind() {
            "function_definition" => lines.extend(header_lines(stmt, stmt)),
            "decorated_definition" => {
                if let Some(definition) = stmt.child_by_field_name("definition") {
                    if definition.kind() == "function_definition" {
                        lines.extend(header_lines(stmt, definition));
                    }
                }
            }
            "expression_statement" => {
                let is_assignment = stmt
                    .named_child(0)
                    .is_some_and(|child| child.kind() == "assignment");
                if is_assignment && !parsed.node_text(stmt).contains("__doc__") {
                    let range = node_range(stmt);
                    lines.extend(range.start..=range.end);
                }
            }
            _ => {}
        }
    }

    lines
}

/// Lines from `outer`'s first line up to the line before `definition`'s body.
fn header_lines(outer: Node<'_>, definition: Node<'_>) -> Vec<usize> {
    let start = outer.start_position().row + 1;
    let end = match definition.child_by_field_name("body") {
        Some(body) => body.start_position().row,
        None => node_range(definition).end,
    };
    (start..=end.max(start)).collect()
}
