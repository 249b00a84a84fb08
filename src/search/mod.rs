//! Structured and code searches over a [`SourceIndex`].
//!
//! Every query returns a [`SearchOutcome`] whose `message` is the tagged
//! text shown to the caller. Large result sets are collapsed to one line
//! per file (or per method) instead of being rendered in full.

pub mod registry;
pub mod result;

pub use registry::BackendRegistry;
pub use result::{collapse_to_file_level, collapse_to_method_level, SearchOutcome, SearchResult};

use crate::config::{SearchSettings, Settings};
use crate::index::{IndexError, SourceIndex, SymbolLocation};
use crate::ts::{class_signature, TreeSitterError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("failed to read indexed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse indexed file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: TreeSitterError,
    },
}

/// Read-only query surface over one indexed root.
#[derive(Debug, Clone)]
pub struct SearchBackend {
    index: SourceIndex,
    settings: SearchSettings,
}

impl SearchBackend {
    /// Index `root` and wrap the result.
    pub fn new(root: impl AsRef<Path>, settings: &Settings) -> Result<Self, IndexError> {
        let index = SourceIndex::build(root, &settings.index)?;
        Ok(Self::from_index(index, settings.search.clone()))
    }

    pub fn from_index(index: SourceIndex, settings: SearchSettings) -> Self {
        Self { index, settings }
    }

    pub fn index(&self) -> &SourceIndex {
        &self.index
    }

    pub fn root(&self) -> &Path {
        self.index.root()
    }

    /// Signature-only view of every class named `class_name`.
    pub fn search_class(&self, class_name: &str) -> Result<SearchOutcome, SearchError> {
        let locations = self.index.class_locations(class_name);
        if locations.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find class `{class_name}` in the codebase."
            )));
        }

        let mut results = Vec::with_capacity(locations.len());
        for location in locations {
            let source = read_source(&location.file)?;
            let signature = class_signature(&source, class_name, location.range.start)
                .map_err(|source| SearchError::Parse {
                    path: location.file.clone(),
                    source,
                })?
                .unwrap_or_default();
            results.push(self.result_at(location, Some(class_name), None, signature));
        }

        let header = format!(
            "Found {} classes with name `{class_name}` in the codebase:\n\n",
            results.len()
        );
        Ok(self.summarize(header, results, Collapse::File))
    }

    /// Full numbered code of every class named `class_name`, capped at the
    /// full-class show limit. Classes beyond the cap are not listed.
    pub fn search_class_full(&self, class_name: &str) -> Result<SearchOutcome, SearchError> {
        let locations = self.index.class_locations(class_name);
        if locations.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find class `{class_name}` in the codebase."
            )));
        }

        let limit = self.settings.full_class_show_limit;
        let mut message = format!(
            "Found {} classes with name `{class_name}` in the codebase:\n\n",
            locations.len()
        );
        if locations.len() > limit {
            message.push_str(&format!(
                "Too many results, showing full code for {limit} of them:\n"
            ));
        }

        let mut results = Vec::with_capacity(limit.min(locations.len()));
        for location in locations.iter().take(limit) {
            let code = self.numbered_snippet(location)?;
            results.push(self.result_at(location, Some(class_name), None, code));
        }
        message.push_str(&self.render_full(&results));
        Ok(SearchOutcome::found(message, results))
    }

    /// Every top-level function, then every class method, named `method_name`.
    pub fn search_method(&self, method_name: &str) -> Result<SearchOutcome, SearchError> {
        let results = self.functions_named(method_name)?;
        if results.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find method `{method_name}` in the codebase."
            )));
        }

        let header = format!(
            "Found {} methods with name `{method_name}` in the codebase:\n\n",
            results.len()
        );
        Ok(self.summarize(header, results, Collapse::File))
    }

    /// Every literal occurrence of `code` in every indexed file.
    pub fn search_code(&self, code: &str) -> Result<SearchOutcome, SearchError> {
        let results = self.code_occurrences(code, self.index.parsed_files().iter())?;
        if results.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find code `{code}` in the codebase."
            )));
        }

        let header = format!(
            "Found {} snippets containing `{code}` in the codebase:\n\n",
            results.len()
        );
        Ok(self.summarize(header, results, Collapse::File))
    }

    /// Full code of every class `class_name` defined in a file matching `file_name`.
    pub fn search_class_in_file(
        &self,
        class_name: &str,
        file_name: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let candidates = self.candidate_files(file_name);
        if candidates.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find file `{file_name}` in the codebase."
            )));
        }

        let locations = self.index.class_locations(class_name);
        if locations.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find class `{class_name}` in the codebase."
            )));
        }

        let mut results = Vec::new();
        for location in locations
            .iter()
            .filter(|location| candidates.contains(&location.file))
        {
            let code = self.numbered_snippet(location)?;
            results.push(self.result_at(location, Some(class_name), None, code));
        }

        if results.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find class `{class_name}` in file `{file_name}`."
            )));
        }

        let mut message = format!(
            "Found {} classes with name `{class_name}` in file `{file_name}`:\n\n",
            results.len()
        );
        message.push_str(&self.render_full(&results));
        Ok(SearchOutcome::found(message, results))
    }

    /// Functions and methods named `method_name` defined in a file matching `file_name`.
    pub fn search_method_in_file(
        &self,
        method_name: &str,
        file_name: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let candidates = self.candidate_files(file_name);
        if candidates.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find file `{file_name}` in the codebase."
            )));
        }

        let results = self.functions_named(method_name)?;
        if results.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "The method `{method_name}` does not appear in the codebase."
            )));
        }

        let results: Vec<SearchResult> = results
            .into_iter()
            .filter(|result| candidates.contains(&result.file))
            .collect();
        if results.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "There is no method with name `{method_name}` in file `{file_name}`."
            )));
        }

        let mut message = format!(
            "Found {} methods with name `{method_name}` in file `{file_name}`:\n\n",
            results.len()
        );
        message.push_str(&self.render_full(&results));
        Ok(SearchOutcome::found(message, results))
    }

    /// Methods `method_name` of every class named `class_name`.
    pub fn search_method_in_class(
        &self,
        method_name: &str,
        class_name: &str,
    ) -> Result<SearchOutcome, SearchError> {
        if !self.index.classes().contains_key(class_name) {
            return Ok(SearchOutcome::miss(format!(
                "Could not find class `{class_name}` in the codebase."
            )));
        }

        let mut results = self.methods_in_class(method_name, class_name)?;
        if results.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find method `{method_name}` in class `{class_name}`."
            )));
        }

        let limit = self.settings.result_show_limit;
        let mut message = format!(
            "Found {} methods with name `{method_name}` in class `{class_name}`:\n\n",
            results.len()
        );
        if results.len() > limit {
            message.push_str(&format!(
                "Too many results, showing full code for {limit} of them, and the rest just file names:\n"
            ));
        }

        let rest = results.split_off(results.len().min(limit));
        message.push_str(&self.render_full(&results));
        if !rest.is_empty() {
            message.push_str("Other results are in these files:\n");
            message.push_str(&collapse_to_file_level(&rest, self.root()));
        }
        Ok(SearchOutcome::found(message, results))
    }

    /// Literal occurrences of `code` in files matching `file_name`.
    pub fn search_code_in_file(
        &self,
        code: &str,
        file_name: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let candidates = self.candidate_files(file_name);
        if candidates.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find file `{file_name}` in the codebase."
            )));
        }

        let results = self.code_occurrences(code, candidates.iter())?;
        if results.is_empty() {
            return Ok(SearchOutcome::miss(format!(
                "Could not find code `{code}` in file `{file_name}`."
            )));
        }

        let header = format!(
            "Found {} snippets with code `{code}` in file `{file_name}`:\n\n",
            results.len()
        );
        Ok(self.summarize(header, results, Collapse::Method))
    }

    fn functions_named(&self, name: &str) -> Result<Vec<SearchResult>, SearchError> {
        let mut results = Vec::new();
        for location in self.index.function_locations(name) {
            let code = self.numbered_snippet(location)?;
            results.push(self.result_at(location, None, Some(name), code));
        }
        for class_name in self.index.classes().keys() {
            results.extend(self.methods_in_class(name, class_name)?);
        }
        Ok(results)
    }

    fn methods_in_class(
        &self,
        method_name: &str,
        class_name: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.index
            .method_locations(class_name, method_name)
            .iter()
            .map(|location| {
                let code = self.numbered_snippet(location)?;
                Ok(self.result_at(location, Some(class_name), Some(method_name), code))
            })
            .collect()
    }

    fn code_occurrences<'a>(
        &self,
        code: &str,
        files: impl Iterator<Item = &'a PathBuf>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut results = Vec::new();
        if code.is_empty() {
            return Ok(results);
        }

        for file in files {
            let source = read_source(file)?;
            for (line, context) in code_regions(&source, code, self.settings.context_lines) {
                let (class_name, func_name) = self.index.locate(file, line);
                results.push(SearchResult {
                    file: file.clone(),
                    start: Some(line),
                    end: Some(line),
                    class_name,
                    func_name,
                    code: context,
                });
            }
        }
        Ok(results)
    }

    /// Indexed files whose path ends with `file_name` on a component
    /// boundary, compared case-insensitively.
    fn candidate_files(&self, file_name: &str) -> Vec<PathBuf> {
        let target = file_name.trim().replace('\\', "/").to_lowercase();
        let target = target.trim_start_matches("./");
        if target.is_empty() {
            return Vec::new();
        }

        self.index
            .parsed_files()
            .iter()
            .filter(|file| {
                let path = file.to_string_lossy().replace('\\', "/").to_lowercase();
                match path.strip_suffix(target) {
                    Some(head) => head.is_empty() || head.ends_with('/') || target.starts_with('/'),
                    None => false,
                }
            })
            .cloned()
            .collect()
    }

    fn numbered_snippet(&self, location: &SymbolLocation) -> Result<String, SearchError> {
        let source = read_source(&location.file)?;
        Ok(numbered_lines(&source, location.range.start, location.range.end))
    }

    fn result_at(
        &self,
        location: &SymbolLocation,
        class_name: Option<&str>,
        func_name: Option<&str>,
        code: String,
    ) -> SearchResult {
        SearchResult {
            file: location.file.clone(),
            start: Some(location.range.start),
            end: Some(location.range.end),
            class_name: class_name.map(str::to_string),
            func_name: func_name.map(str::to_string),
            code,
        }
    }

    fn render_full(&self, results: &[SearchResult]) -> String {
        results
            .iter()
            .enumerate()
            .map(|(idx, result)| {
                format!(
                    "- Search result {}:\n```\n{}\n```\n",
                    idx + 1,
                    result.to_tagged_str(self.root())
                )
            })
            .collect()
    }

    /// Render in full up to the show limit, collapse beyond it, and
    /// truncate the returned matches to the limit.
    fn summarize(
        &self,
        mut message: String,
        mut results: Vec<SearchResult>,
        collapse: Collapse,
    ) -> SearchOutcome {
        let limit = self.settings.result_show_limit;
        if results.len() > limit {
            debug!(matches = results.len(), limit, "collapsing search results");
            match collapse {
                Collapse::File => {
                    message.push_str("They appeared in the following files:\n");
                    message.push_str(&collapse_to_file_level(&results, self.root()));
                }
                Collapse::Method => {
                    message.push_str("They appeared in the following methods:\n");
                    message.push_str(&collapse_to_method_level(&results, self.root()));
                }
            }
            results.truncate(limit);
        } else {
            message.push_str(&self.render_full(&results));
        }
        SearchOutcome::found(message, results)
    }
}

#[derive(Debug, Clone, Copy)]
enum Collapse {
    File,
    Method,
}

fn read_source(path: &Path) -> Result<String, SearchError> {
    fs::read_to_string(path).map_err(|source| SearchError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Lines `start..=end` (1-based) prefixed with their line number.
fn numbered_lines(source: &str, start: usize, end: usize) -> String {
    source
        .split_inclusive('\n')
        .enumerate()
        .skip(start.saturating_sub(1))
        .take((end + 1).saturating_sub(start.max(1)))
        .map(|(idx, line)| format!("{} {line}", idx + 1))
        .collect()
}

/// Every non-overlapping occurrence of `code` in `source` as the 1-based
/// line it starts on, plus `context` numbered lines on either side.
fn code_regions(source: &str, code: &str, context: usize) -> Vec<(usize, String)> {
    let lines: Vec<&str> = source.lines().collect();
    source
        .match_indices(code)
        .map(|(offset, _)| {
            let line = source[..offset].matches('\n').count();
            let window_start = line.saturating_sub(context);
            let window_end = lines.len().min(line + context + 1);
            let rendered = (window_start..window_end)
                .map(|idx| format!("{} {}\n", idx + 1, lines[idx]))
                .collect();
            (line + 1, rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "a = 1\nb = 2\nc = 3\nd = 4\ne = 5\nf = 6\ng = 7\nh = 8\n";

    #[test]
    fn numbered_lines_are_one_based() {
        assert_eq!(numbered_lines(SOURCE, 2, 3), "2 b = 2\n3 c = 3\n");
        assert_eq!(numbered_lines(SOURCE, 8, 8), "8 h = 8\n");
        assert_eq!(numbered_lines(SOURCE, 8, 12), "8 h = 8\n");
    }

    #[test]
    fn code_regions_window_is_clamped() {
        let regions = code_regions(SOURCE, "b = 2", 3);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].0, 2);
        assert_eq!(regions[0].1, "1 a = 1\n2 b = 2\n3 c = 3\n4 d = 4\n5 e = 5\n");

        let regions = code_regions(SOURCE, "= ", 0);
        assert_eq!(regions.len(), 8);
        assert_eq!(regions[7], (8, "8 h = 8\n".to_string()));
    }

    #[test]
    fn multiline_snippet_starts_on_first_line() {
        let regions = code_regions(SOURCE, "2\nc = 3", 1);
        assert_eq!(regions, vec![(2, "1 a = 1\n2 b = 2\n3 c = 3\n".to_string())]);
    }
}
