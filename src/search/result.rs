//! Search results and their tagged text rendering.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Label used when a code match sits outside any function.
const NOT_IN_A_FUNCTION: &str = "Not in a function";

/// One located piece of code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Absolute path of the file
    pub file: PathBuf,
    /// 1-based first line
    pub start: Option<usize>,
    /// 1-based last line, inclusive
    pub end: Option<usize>,
    pub class_name: Option<String>,
    pub func_name: Option<String>,
    pub code: String,
}

impl SearchResult {
    /// `<file>..</file>` with the path shown relative to `root`.
    pub fn to_tagged_upto_file(&self, root: &Path) -> String {
        format!("<file>{}</file>", relative_display(&self.file, root))
    }

    pub fn to_tagged_upto_class(&self, root: &Path) -> String {
        let class_part = self
            .class_name
            .as_deref()
            .map(|name| format!("<class>{name}</class>"))
            .unwrap_or_default();
        format!("{}\n{class_part}", self.to_tagged_upto_file(root))
    }

    pub fn to_tagged_upto_func(&self, root: &Path) -> String {
        let func_part = self
            .func_name
            .as_deref()
            .map(|name| format!("<func>{name}</func>"))
            .unwrap_or_default();
        format!("{}{func_part}", self.to_tagged_upto_class(root))
    }

    /// Full tagged block: file, class, function and code.
    pub fn to_tagged_str(&self, root: &Path) -> String {
        format!(
            "{}\n<code>\n{}\n</code>",
            self.to_tagged_upto_func(root),
            self.code
        )
    }
}

/// One line per file: `- <file>path</file> (N matches)`.
pub fn collapse_to_file_level(results: &[SearchResult], root: &Path) -> String {
    let mut counts: Vec<(&Path, usize)> = Vec::new();
    for result in results {
        match counts.iter_mut().find(|(file, _)| *file == result.file) {
            Some((_, count)) => *count += 1,
            None => counts.push((&result.file, 1)),
        }
    }

    counts
        .into_iter()
        .map(|(file, count)| {
            format!(
                "- <file>{}</file> ({count} matches)\n",
                relative_display(file, root)
            )
        })
        .collect()
}

/// One line per (file, function) pair, in first-seen order.
pub fn collapse_to_method_level(results: &[SearchResult], root: &Path) -> String {
    let mut counts: Vec<(&Path, Vec<(&str, usize)>)> = Vec::new();
    for result in results {
        let func = result.func_name.as_deref().unwrap_or(NOT_IN_A_FUNCTION);
        let funcs = match counts.iter().position(|(file, _)| *file == result.file) {
            Some(pos) => &mut counts[pos].1,
            None => {
                counts.push((&result.file, Vec::new()));
                let last = counts.len() - 1;
                &mut counts[last].1
            }
        };
        match funcs.iter_mut().find(|(name, _)| *name == func) {
            Some((_, count)) => *count += 1,
            None => funcs.push((func, 1)),
        }
    }

    let mut rendered = String::new();
    for (file, funcs) in counts {
        let file_part = format!("<file>{}</file>", relative_display(file, root));
        for (func, count) in funcs {
            let func_part = if func == NOT_IN_A_FUNCTION {
                func.to_string()
            } else {
                format!("<func>{func}</func>")
            };
            rendered.push_str(&format!("- {file_part}{func_part} ({count} matches)\n"));
        }
    }
    rendered
}

fn relative_display(file: &Path, root: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .display()
        .to_string()
}

/// What every search returns. A miss is `success == false` with an
/// explanatory message, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub success: bool,
    pub message: String,
    pub matches: Vec<SearchResult>,
}

impl SearchOutcome {
    pub fn found(message: String, matches: Vec<SearchResult>) -> Self {
        Self {
            success: true,
            message,
            matches,
        }
    }

    pub fn miss(message: String) -> Self {
        Self {
            success: false,
            message,
            matches: Vec::new(),
        }
    }
}
