//! In-memory index of symbol locations for a source tree.
//!
//! The index is built once per root by walking the tree and parsing every
//! source file. It stores locations only; code is read back from disk when
//! a search renders it. Entries are never mutated after the build:
//! rebuilding means running [`SourceIndex::build`] again.

pub mod walker;

use crate::config::IndexSettings;
use crate::ts::{parse_symbols, FileSymbols, LineRange};
use rayon::prelude::*;
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub use walker::{discover_source_files, is_test_file};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("root path {path} does not exist: {source}")]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("root path {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// Where a symbol is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolLocation {
    /// Absolute path of the defining file
    pub file: PathBuf,
    pub range: LineRange,
}

/// Multimap from a name to every location it is defined at.
///
/// Keys iterate in first-insertion order, which for a built index is the
/// directory-walk order.
#[derive(Debug, Clone)]
pub struct NameIndex<K> {
    order: Vec<K>,
    entries: HashMap<K, Vec<SymbolLocation>>,
}

impl<K> Default for NameIndex<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone> NameIndex<K> {
    fn push(&mut self, key: K, location: SymbolLocation) {
        match self.entries.get_mut(&key) {
            Some(locations) => locations.push(location),
            None => {
                self.order.push(key.clone());
                self.entries.insert(key, vec![location]);
            }
        }
    }

    /// All locations for `key`; empty when the name is unknown.
    pub fn get<Q>(&self, key: &Q) -> &[SymbolLocation]
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// `(key, locations)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[SymbolLocation])> {
        self.order
            .iter()
            .map(move |key| (key, self.entries[key].as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Symbol index over one source tree.
#[derive(Debug, Clone)]
pub struct SourceIndex {
    root: PathBuf,
    parsed_files: Vec<PathBuf>,
    classes: NameIndex<String>,
    methods: NameIndex<(String, String)>,
    functions: NameIndex<String>,
    superclasses: HashMap<String, Vec<String>>,
}

impl SourceIndex {
    /// Walk `root` and index every source file that parses.
    ///
    /// Files that cannot be read or parsed are logged and skipped; they
    /// never fail the build.
    pub fn build(root: impl AsRef<Path>, settings: &IndexSettings) -> Result<Self, IndexError> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|source| IndexError::RootNotFound {
            path: root.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(IndexError::NotADirectory(root));
        }

        let files = discover_source_files(&root, settings);
        debug!(root = %root.display(), files = files.len(), "indexing source tree");

        // Collecting an indexed parallel iterator keeps walk order.
        let parsed: Vec<Option<FileSymbols>> = if settings.parallel {
            files.par_iter().map(|path| parse_file(path)).collect()
        } else {
            files.iter().map(|path| parse_file(path)).collect()
        };

        let index = Self::from_files(
            root,
            files
                .into_iter()
                .zip(parsed)
                .filter_map(|(path, symbols)| symbols.map(|symbols| (path, symbols))),
        );

        debug!(
            parsed_files = index.parsed_files.len(),
            classes = index.classes.len(),
            functions = index.functions.len(),
            "index built"
        );
        Ok(index)
    }

    /// Assemble an index from already extracted per-file symbols.
    pub fn from_files(
        root: impl Into<PathBuf>,
        files: impl IntoIterator<Item = (PathBuf, FileSymbols)>,
    ) -> Self {
        let mut index = Self {
            root: root.into(),
            parsed_files: Vec::new(),
            classes: NameIndex::default(),
            methods: NameIndex::default(),
            functions: NameIndex::default(),
            superclasses: HashMap::new(),
        };

        for (path, symbols) in files {
            index.insert_file(path, symbols);
        }
        index
    }

    fn insert_file(&mut self, path: PathBuf, symbols: FileSymbols) {
        let located = |range| SymbolLocation {
            file: path.clone(),
            range,
        };

        for class in symbols.classes {
            self.classes.push(class.name.clone(), located(class.range));
            let bases = self.superclasses.entry(class.name).or_default();
            for base in class.superclasses {
                if !bases.contains(&base) {
                    bases.push(base);
                }
            }
        }

        for method in symbols.methods {
            self.methods
                .push((method.class_name, method.name), located(method.range));
        }

        for function in symbols.functions {
            self.functions.push(function.name, located(function.range));
        }

        self.parsed_files.push(path);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files that parsed successfully, in walk order.
    pub fn parsed_files(&self) -> &[PathBuf] {
        &self.parsed_files
    }

    pub fn classes(&self) -> &NameIndex<String> {
        &self.classes
    }

    pub fn methods(&self) -> &NameIndex<(String, String)> {
        &self.methods
    }

    pub fn functions(&self) -> &NameIndex<String> {
        &self.functions
    }

    pub fn class_locations(&self, class_name: &str) -> &[SymbolLocation] {
        self.classes.get(class_name)
    }

    pub fn method_locations(&self, class_name: &str, method_name: &str) -> &[SymbolLocation] {
        self.methods
            .get(&(class_name.to_string(), method_name.to_string()))
    }

    pub fn function_locations(&self, function_name: &str) -> &[SymbolLocation] {
        self.functions.get(function_name)
    }

    /// Superclass names recorded for `class_name` (best effort).
    pub fn superclasses(&self, class_name: &str) -> &[String] {
        self.superclasses
            .get(class_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Find the innermost class method, or failing that the innermost
    /// function, whose range contains `line` (1-based) in `file`.
    ///
    /// Linear in the size of the index.
    pub fn locate(&self, file: &Path, line: usize) -> (Option<String>, Option<String>) {
        let innermost_method = self
            .methods
            .iter()
            .flat_map(|(key, locations)| locations.iter().map(move |loc| (key, loc)))
            .filter(|(_, loc)| loc.file == file && loc.range.contains(line))
            .min_by_key(|(_, loc)| loc.range.len());

        if let Some(((class_name, method_name), _)) = innermost_method {
            return (Some(class_name.clone()), Some(method_name.clone()));
        }

        let innermost_function = self
            .functions
            .iter()
            .flat_map(|(name, locations)| locations.iter().map(move |loc| (name, loc)))
            .filter(|(_, loc)| loc.file == file && loc.range.contains(line))
            .min_by_key(|(_, loc)| loc.range.len());

        match innermost_function {
            Some((name, _)) => (None, Some(name.clone())),
            None => (None, None),
        }
    }
}

fn parse_file(path: &Path) -> Option<FileSymbols> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable source file");
            return None;
        }
    };

    match parse_symbols(&source) {
        Ok(symbols) => Some(symbols),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unparsable source file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::{ClassSymbol, FunctionSymbol, MethodSymbol};

    fn symbols() -> FileSymbols {
        FileSymbols {
            classes: vec![ClassSymbol {
                name: "Greeter".to_string(),
                range: LineRange::new(1, 10),
                superclasses: vec!["Base".to_string()],
            }],
            methods: vec![
                MethodSymbol {
                    class_name: "Greeter".to_string(),
                    name: "greet".to_string(),
                    range: LineRange::new(2, 8),
                },
                MethodSymbol {
                    class_name: "Greeter".to_string(),
                    name: "helper".to_string(),
                    range: LineRange::new(4, 5),
                },
            ],
            functions: vec![FunctionSymbol {
                name: "main".to_string(),
                range: LineRange::new(12, 14),
            }],
        }
    }

    #[test]
    fn duplicate_names_are_kept() {
        let index = SourceIndex::from_files(
            "/repo",
            vec![
                (PathBuf::from("/repo/a.py"), symbols()),
                (PathBuf::from("/repo/b.py"), symbols()),
            ],
        );

        let classes = index.class_locations("Greeter");
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].file, PathBuf::from("/repo/a.py"));
        assert_eq!(classes[1].file, PathBuf::from("/repo/b.py"));
        assert_eq!(index.method_locations("Greeter", "greet").len(), 2);
        assert_eq!(index.superclasses("Greeter"), ["Base".to_string()]);
        assert_eq!(index.parsed_files().len(), 2);
    }

    #[test]
    fn locate_prefers_innermost_method() {
        let index = SourceIndex::from_files("/repo", vec![(PathBuf::from("/repo/a.py"), symbols())]);
        let file = Path::new("/repo/a.py");

        assert_eq!(
            index.locate(file, 4),
            (Some("Greeter".to_string()), Some("helper".to_string()))
        );
        assert_eq!(
            index.locate(file, 7),
            (Some("Greeter".to_string()), Some("greet".to_string()))
        );
        assert_eq!(index.locate(file, 13), (None, Some("main".to_string())));
        assert_eq!(index.locate(file, 11), (None, None));
        assert_eq!(index.locate(Path::new("/repo/other.py"), 4), (None, None));
    }

    #[test]
    fn missing_root_is_an_error() {
        let result = SourceIndex::build("/no/such/root", &IndexSettings::default());
        assert!(matches!(result, Err(IndexError::RootNotFound { .. })));
    }
}
