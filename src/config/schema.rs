use serde::Deserialize;
use std::fmt;

/// Maximum number of full results a search renders before collapsing.
pub const RESULT_SHOW_LIMIT: usize = 3;

/// Maximum number of classes a full-class search renders.
pub const FULL_CLASS_SHOW_LIMIT: usize = 2;

/// Score above which the best fuzzy frame is considered unrelated code.
pub const DEFAULT_MAX_FRAME_SCORE: f64 = 20.0;

/// Top-level settings. Every field has a default, so an empty TOML document
/// is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub index: IndexSettings,
    pub search: SearchSettings,
    pub locate: LocateSettings,
    pub merge: MergeSettings,
    pub edits: EditSettings,
}

/// Which files the index walks and how test files are recognised.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexSettings {
    /// Directories whose name starts with any of these are pruned.
    pub ignore_dir_prefixes: Vec<String>,
    /// File extensions (without the dot) that are indexed.
    pub extensions: Vec<String>,
    /// A path component equal to one of these marks a test file.
    pub test_dir_names: Vec<String>,
    /// A file name ending with one of these marks a test file.
    pub test_file_suffixes: Vec<String>,
    /// Parse files on the rayon pool.
    pub parallel: bool,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            ignore_dir_prefixes: [
                ".venv",
                ".git",
                ".mypy_cache",
                ".pytest_cache",
                "___",
                "__pycache__",
            ]
            .map(String::from)
            .to_vec(),
            extensions: vec!["py".to_string()],
            test_dir_names: vec!["test".to_string(), "tests".to_string()],
            test_file_suffixes: vec!["_test.py".to_string()],
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSettings {
    pub result_show_limit: usize,
    /// Classes shown with their full code; the rest are dropped.
    pub full_class_show_limit: usize,
    /// Lines of context shown on each side of a code match.
    pub context_lines: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            result_show_limit: RESULT_SHOW_LIMIT,
            full_class_show_limit: FULL_CLASS_SHOW_LIMIT,
            context_lines: 3,
        }
    }
}

/// Costs of the weighted Levenshtein distance used for line similarity.
///
/// The defaults (1, 1, 3) make a substitution never cheaper than a
/// deletion plus an insertion. They are empirical and worth re-tuning per
/// target codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevenshteinWeights {
    pub insertion: usize,
    pub deletion: usize,
    pub substitution: usize,
}

impl LevenshteinWeights {
    pub const UNIT: LevenshteinWeights = LevenshteinWeights {
        insertion: 1,
        deletion: 1,
        substitution: 1,
    };
}

impl Default for LevenshteinWeights {
    fn default() -> Self {
        Self {
            insertion: 1,
            deletion: 1,
            substitution: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocateSettings {
    pub weights: LevenshteinWeights,
    /// Best frame scores above this reject the patch.
    pub max_score: f64,
    /// Candidate start lines kept for the first `before` line.
    pub start_candidates: usize,
    /// Candidate end lines kept per start line.
    pub end_candidates: usize,
    /// Closest lines kept for every `before` line when filling frames.
    pub line_candidates: usize,
    /// End lines are searched within `factor * before_lines` lines of the start.
    pub end_window_factor: usize,
}

impl Default for LocateSettings {
    fn default() -> Self {
        Self {
            weights: LevenshteinWeights::default(),
            max_score: DEFAULT_MAX_FRAME_SCORE,
            start_candidates: 7,
            end_candidates: 3,
            line_candidates: 3,
            end_window_factor: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSettings {
    /// Indentation levels tried when the indent unit is known.
    pub max_indent_levels: usize,
    /// Single-space levels tried when the indent unit cannot be inferred.
    pub max_base_indent: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            max_indent_levels: 7,
            max_base_indent: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditSettings {
    /// Lines (compared trimmed) dropped from edit text before parsing.
    pub placeholder_lines: Vec<String>,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            placeholder_lines: [
                "# Rest of the code...",
                "# ... rest of the code ...",
                "# rest of the code",
                "# Rest of the code remains unchanged",
                "# ...",
                "// Rest of the code...",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// A single problem found while validating settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .issues
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationError {}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let mut require = |ok: bool, field: &'static str, message: &str| {
            if !ok {
                issues.push(ValidationIssue {
                    field,
                    message: message.to_string(),
                });
            }
        };

        require(
            !self.index.extensions.is_empty(),
            "index.extensions",
            "at least one extension is required",
        );
        require(
            self.search.result_show_limit > 0,
            "search.result_show_limit",
            "must be greater than 0",
        );
        require(
            self.search.full_class_show_limit > 0,
            "search.full_class_show_limit",
            "must be greater than 0",
        );

        let weights = self.locate.weights;
        require(
            weights.insertion > 0 && weights.deletion > 0 && weights.substitution > 0,
            "locate.weights",
            "all weights must be greater than 0",
        );
        require(
            self.locate.max_score.is_finite() && self.locate.max_score >= 0.0,
            "locate.max_score",
            "must be a finite, non-negative number",
        );
        require(
            self.locate.start_candidates > 0
                && self.locate.end_candidates > 0
                && self.locate.line_candidates > 0,
            "locate",
            "candidate limits must be greater than 0",
        );
        require(
            self.locate.end_window_factor > 0,
            "locate.end_window_factor",
            "must be greater than 0",
        );

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_documented_constants() {
        let settings = Settings::default();
        assert_eq!(settings.search.result_show_limit, 3);
        assert_eq!(settings.search.full_class_show_limit, 2);
        assert_eq!(settings.locate.weights, LevenshteinWeights { insertion: 1, deletion: 1, substitution: 3 });
        assert_eq!(settings.locate.max_score, 20.0);
        assert_eq!(settings.locate.start_candidates, 7);
        assert_eq!(settings.locate.end_candidates, 3);
        assert_eq!(settings.merge.max_indent_levels, 7);
        assert_eq!(settings.merge.max_base_indent, 24);
        assert!(settings.index.ignore_dir_prefixes.contains(&".git".to_string()));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validation_collects_every_issue() {
        let mut settings = Settings::default();
        settings.search.result_show_limit = 0;
        settings.locate.max_score = -1.0;

        let err = settings.validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(err.to_string().contains("search.result_show_limit"));
    }
}
