//! Integration tests for the search backend over a small Python tree

use fuzzpatch::config::SearchSettings;
use fuzzpatch::{BackendRegistry, SearchBackend, Settings};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const ALPHA: &str = r#"class Foo:
    def run(self):
        return "alpha"
"#;

const BETA: &str = r#"import os


class Foo(Base):
    """Beta flavour."""

    def run(self):
        value = os.getcwd()
        return value


def helper():
    return Foo()
"#;

fn setup_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("pkg")).unwrap();
    fs::create_dir_all(dir.path().join("tests")).unwrap();
    fs::write(dir.path().join("pkg/alpha.py"), ALPHA).unwrap();
    fs::write(dir.path().join("pkg/beta.py"), BETA).unwrap();
    // Test files are not indexed
    fs::write(dir.path().join("tests/test_alpha.py"), "class Foo:\n    pass\n").unwrap();
    dir
}

fn backend(root: &Path) -> SearchBackend {
    SearchBackend::new(root, &Settings::default()).unwrap()
}

fn limited_backend(root: &Path, result_show_limit: usize) -> SearchBackend {
    let settings = Settings {
        search: SearchSettings {
            result_show_limit,
            full_class_show_limit: result_show_limit,
            ..SearchSettings::default()
        },
        ..Settings::default()
    };
    SearchBackend::new(root, &settings).unwrap()
}

fn file_name(path: &Path) -> &str {
    path.file_name().unwrap().to_str().unwrap()
}

#[test]
fn test_same_class_in_two_files() {
    let dir = setup_tree();
    let outcome = backend(dir.path()).search_class("Foo").unwrap();

    assert!(outcome.success);
    assert!(outcome
        .message
        .starts_with("Found 2 classes with name `Foo` in the codebase:\n\n"));
    assert!(outcome.message.contains("<file>pkg/alpha.py</file>\n<class>Foo</class>"));

    let found: Vec<_> = outcome
        .matches
        .iter()
        .map(|m| (file_name(&m.file), m.start))
        .collect();
    assert_eq!(found, vec![("alpha.py", Some(1)), ("beta.py", Some(4))]);
}

#[test]
fn test_missing_class() {
    let dir = setup_tree();
    let outcome = backend(dir.path()).search_class("Bar").unwrap();

    assert!(!outcome.success);
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.message, "Could not find class `Bar` in the codebase.");
}

#[test]
fn test_class_in_file_shows_numbered_code() {
    let dir = setup_tree();
    let outcome = backend(dir.path())
        .search_class_in_file("Foo", "beta.py")
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.matches.len(), 1);
    assert!(outcome.message.contains("4 class Foo(Base):"));
    assert!(outcome.message.contains("9         return value"));
}

#[test]
fn test_methods_and_functions() {
    let dir = setup_tree();
    let backend = backend(dir.path());

    let outcome = backend.search_method("run").unwrap();
    assert_eq!(outcome.matches.len(), 2);
    assert!(outcome
        .matches
        .iter()
        .all(|m| m.class_name.as_deref() == Some("Foo")));

    let outcome = backend.search_method("helper").unwrap();
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].class_name, None);
    assert_eq!(outcome.matches[0].func_name.as_deref(), Some("helper"));

    let outcome = backend.search_method_in_class("run", "Foo").unwrap();
    assert_eq!(outcome.matches.len(), 2);

    let outcome = backend.search_method_in_class("run", "Nope").unwrap();
    assert!(!outcome.success);
}

#[test]
fn test_method_in_file_misses() {
    let dir = setup_tree();
    let backend = backend(dir.path());

    let outcome = backend.search_method_in_file("run", "missing.py").unwrap();
    assert_eq!(outcome.message, "Could not find file `missing.py` in the codebase.");

    let outcome = backend.search_method_in_file("helper", "alpha.py").unwrap();
    assert_eq!(
        outcome.message,
        "There is no method with name `helper` in file `alpha.py`."
    );

    let outcome = backend.search_method_in_file("helper", "PKG/Beta.py").unwrap();
    assert!(outcome.success);
}

#[test]
fn test_code_search_reports_enclosing_symbols() {
    let dir = setup_tree();
    let backend = backend(dir.path());

    let outcome = backend.search_code("os.getcwd()").unwrap();
    assert_eq!(outcome.matches.len(), 1);
    let hit = &outcome.matches[0];
    assert_eq!(hit.start, Some(8));
    assert_eq!(hit.class_name.as_deref(), Some("Foo"));
    assert_eq!(hit.func_name.as_deref(), Some("run"));

    let outcome = backend.search_code_in_file("return", "alpha.py").unwrap();
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].start, Some(3));

    let outcome = backend.search_code("does_not_exist").unwrap();
    assert!(!outcome.success);
}

#[test]
fn test_large_result_sets_are_collapsed() {
    let dir = setup_tree();
    let backend = limited_backend(dir.path(), 1);

    let outcome = backend.search_code("return").unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.matches.len(), 1);
    assert!(outcome.message.starts_with("Found 3 snippets"));
    assert!(outcome.message.contains("They appeared in the following files:\n"));
    assert!(outcome.message.contains("- <file>pkg/beta.py</file> (2 matches)\n"));
}

#[test]
fn test_method_in_class_overflow_lists_other_files() {
    let dir = setup_tree();
    let outcome = limited_backend(dir.path(), 1)
        .search_method_in_class("run", "Foo")
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(file_name(&outcome.matches[0].file), "alpha.py");
    assert!(outcome.message.starts_with(
        "Found 2 methods with name `run` in class `Foo`:\n\n\
         Too many results, showing full code for 1 of them, and the rest just file names:\n\
         - Search result 1:"
    ));
    assert!(outcome
        .message
        .ends_with("Other results are in these files:\n- <file>pkg/beta.py</file> (1 matches)\n"));
}

#[test]
fn test_code_in_file_overflow_lists_methods() {
    let dir = setup_tree();
    let outcome = limited_backend(dir.path(), 1)
        .search_code_in_file("return", "beta.py")
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(
        outcome.message,
        "Found 2 snippets with code `return` in file `beta.py`:\n\n\
         They appeared in the following methods:\n\
         - <file>pkg/beta.py</file><func>run</func> (1 matches)\n\
         - <file>pkg/beta.py</file><func>helper</func> (1 matches)\n"
    );
}

#[test]
fn test_full_class_search_shows_bodies() {
    let dir = setup_tree();
    let outcome = backend(dir.path()).search_class_full("Foo").unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.matches.len(), 2);
    assert!(outcome
        .message
        .starts_with("Found 2 classes with name `Foo` in the codebase:\n\n- Search result 1:"));
    assert!(outcome.message.contains("1 class Foo:\n2     def run(self):\n"));
    assert!(outcome.message.contains("4 class Foo(Base):\n"));
    assert!(outcome.message.contains("9         return value\n"));
    assert!(!outcome.message.contains("Too many results"));

    let limited = limited_backend(dir.path(), 1).search_class_full("Foo").unwrap();
    assert_eq!(limited.matches.len(), 1);
    assert!(limited
        .message
        .contains("Too many results, showing full code for 1 of them:\n- Search result 1:"));
    assert!(!limited.message.contains("class Foo(Base)"));

    let missing = backend(dir.path()).search_class_full("Bar").unwrap();
    assert!(!missing.success);
    assert_eq!(missing.message, "Could not find class `Bar` in the codebase.");
}

#[test]
fn test_index_records_superclasses() {
    let dir = setup_tree();
    let backend = backend(dir.path());

    assert_eq!(backend.index().superclasses("Foo"), ["Base".to_string()]);
    assert_eq!(backend.index().parsed_files().len(), 2);
}

#[test]
fn test_registry_shares_backends_per_root() {
    let dir = setup_tree();
    let registry = BackendRegistry::new(Settings::default());

    let first = registry.init(dir.path()).unwrap();
    let second = registry.init(dir.path()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(registry.get(dir.path()).is_some());

    assert!(registry.dispose(dir.path()));
    assert!(registry.get(dir.path()).is_none());
    assert!(!registry.dispose(dir.path()));
}
