//! Tree-sitter integration for Python sources.
//!
//! Provides the parser wrapper used for syntax checks and the symbol
//! extraction the index is built from.

pub mod errors;
pub mod parser;
pub mod symbols;

pub use errors::TreeSitterError;
pub use parser::{ParsedSource, PythonParser, SyntaxIssue};
pub use symbols::{
    class_signature, parse_symbols, ClassSymbol, FileSymbols, FunctionSymbol, LineRange,
    MethodSymbol,
};
