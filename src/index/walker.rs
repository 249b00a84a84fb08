//! Source file discovery.

use crate::config::IndexSettings;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Collect every indexable source file under `root`, in walk order.
///
/// The walk is sorted by file name so the same tree always yields the same
/// order. Directories matching an ignore prefix are pruned, never entered.
pub fn discover_source_files(root: &Path, settings: &IndexSettings) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry, settings));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() || !has_source_extension(entry.path(), settings) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if is_test_file(relative, settings) {
            debug!(path = %relative.display(), "skipping test file");
            continue;
        }

        files.push(entry.into_path());
    }

    files
}

fn is_ignored_dir(entry: &DirEntry, settings: &IndexSettings) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    settings
        .ignore_dir_prefixes
        .iter()
        .any(|prefix| name.starts_with(prefix.as_str()))
}

fn has_source_extension(path: &Path, settings: &IndexSettings) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| settings.extensions.iter().any(|wanted| wanted == ext))
}

/// Heuristic test-file detection on a root-relative path.
pub fn is_test_file(relative: &Path, settings: &IndexSettings) -> bool {
    let in_test_dir = relative.components().any(|component| {
        let part = component.as_os_str().to_string_lossy();
        settings.test_dir_names.iter().any(|name| *name == part)
    });
    if in_test_dir {
        return true;
    }

    let file_name = relative
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    settings
        .test_file_suffixes
        .iter()
        .any(|suffix| file_name.ends_with(suffix.as_str()))
}
