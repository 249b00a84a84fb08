//! Integration tests for TOML settings files

use fuzzpatch::config::LevenshteinWeights;
use fuzzpatch::{load_from_path, ConfigError, PatchApplier, CodePatch, LocateError, PatchError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_settings_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzzpatch.toml");
    fs::write(
        &path,
        "[locate]\nweights = { insertion = 1, deletion = 1, substitution = 1 }\n\n[index]\nparallel = false\n",
    )
    .unwrap();

    let settings = load_from_path(&path).unwrap();
    assert_eq!(settings.locate.weights, LevenshteinWeights::UNIT);
    assert!(!settings.index.parallel);
    assert_eq!(settings.search.result_show_limit, 3);
}

#[test]
fn test_threshold_from_settings_file_is_used() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("fuzzpatch.toml");
    fs::write(&config, "[locate]\nmax_score = 0.0\n").unwrap();
    fs::write(dir.path().join("a.py"), "value = compute(1, 2)\n").unwrap();

    let settings = load_from_path(&config).unwrap();
    let applier = PatchApplier::new(dir.path(), &settings).unwrap();
    let err = applier
        .apply(&CodePatch::new("a.py", "value = compute(1, 3)", "value = 3"))
        .unwrap_err();

    assert!(matches!(
        err,
        PatchError::Locate {
            source: LocateError::ScoreTooHigh { max, .. },
            ..
        } if max == 0.0
    ));
}

#[test]
fn test_errors_name_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzzpatch.toml");
    fs::write(&path, "[merge]\nmax_indent_levels = \"many\"\n").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Toml { path: Some(_), .. }));
    assert!(err.to_string().contains("fuzzpatch.toml"));

    let missing = load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fuzzpatch.toml");
    fs::write(&path, "[search]\nresult_show_limit = 0\n").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(
        &err,
        ConfigError::Validation { source, .. } if source.issues[0].field == "search.result_show_limit"
    ));
}
