use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use std::ops::Range;
use tree_sitter::{Node, Parser, Point, Tree};

/// Tree-sitter parser for Python, built on the grammar bundled with
/// ast-grep-language.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        parser
            .set_language(&SupportLang::Python.get_ts_language())
            .map_err(|_| TreeSitterError::LanguageSet)?;
        Ok(Self { parser })
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or(TreeSitterError::ParseFailed)
    }

    /// Parse and keep the source alongside the tree for node text lookups.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Whether the tree contains any ERROR or MISSING node.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// ERROR and MISSING nodes in document order. Subtrees without errors
    /// are skipped.
    pub fn syntax_issues(&self) -> Vec<SyntaxIssue> {
        let mut issues = Vec::new();
        let mut stack = vec![self.tree.root_node()];

        while let Some(node) = stack.pop() {
            if node.is_error() || node.is_missing() {
                issues.push(SyntaxIssue {
                    byte_range: node.byte_range(),
                    position: node.start_position(),
                    missing: node.is_missing(),
                });
            }
            if node.has_error() {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
        issues
    }

    pub fn first_issue(&self) -> Option<SyntaxIssue> {
        self.syntax_issues().into_iter().next()
    }

    pub fn node_text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

/// An ERROR node (unparseable text) or MISSING node (token the parser
/// had to invent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub byte_range: Range<usize>,
    /// 0-based row and column
    pub position: Point,
    pub missing: bool,
}
