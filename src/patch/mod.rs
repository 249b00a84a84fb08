//! Locate a `before` snippet in a file and merge `after` in its place.
//!
//! # Safety
//!
//! - Paths are checked against the workspace before anything is read
//! - The file is hashed when read and re-checked right before writing
//! - Writes are atomic (tempfile + fsync + rename)
//! - A merged Python file is only written when it parses

pub mod distance;
pub mod frame;
pub mod locator;
pub mod merger;
pub mod ranking;
pub mod writer;

pub use locator::{locate, locate_exact, locate_fuzzy, LocateError, Located, MatchKind};
pub use merger::{merge, MergeError, MergeStrategy, Merged};
pub use ranking::{CodeMatch, LineMatch, Order, RankingList, Scored, TiePolicy};
pub use writer::{atomic_write, FileSnapshot, WriteError};

use crate::config::Settings;
use crate::safety::{SafetyError, WorkspaceGuard};
use crate::validate::SourceLanguage;
use serde::Serialize;
use similar::TextDiff;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("patch for {file} does not change anything")]
    EmptyPatch { file: PathBuf },

    #[error("failed to locate patch in {file}: {source}")]
    Locate {
        file: PathBuf,
        #[source]
        source: LocateError,
    },

    #[error(transparent)]
    Merge(#[from] Box<MergeError>),

    #[error("{path} changed on disk while the patch was being applied")]
    ConcurrentModification { path: PathBuf },

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<WriteError> for PatchError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Changed { path } => PatchError::ConcurrentModification { path },
            WriteError::Io { path, source } => PatchError::Io { path, source },
        }
    }
}

/// One replacement of `before` by `after` in `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodePatch {
    pub file: PathBuf,
    pub before: String,
    pub after: String,
    /// Unified diff of `before` against `after`
    pub diff: String,
}

impl CodePatch {
    pub fn new(file: impl Into<PathBuf>, before: impl Into<String>, after: impl Into<String>) -> Self {
        let file = file.into();
        let before = before.into();
        let after = after.into();
        let label = file.display().to_string();
        let diff = TextDiff::from_lines(&before, &after)
            .unified_diff()
            .header(&label, &label)
            .to_string();
        Self {
            file,
            before,
            after,
            diff,
        }
    }

    /// Whether applying the patch would leave the file as it is.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// What applying a patch did.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub file: PathBuf,
    /// 1-based range the patch replaced
    pub range: CodeMatch,
    pub kind: MatchKind,
    pub strategy: MergeStrategy,
    pub original: String,
    pub patched: String,
    /// False for dry runs
    pub written: bool,
}

/// Applies patches to files inside one workspace.
#[derive(Debug, Clone)]
pub struct PatchApplier {
    guard: WorkspaceGuard,
    settings: Settings,
    dry_run: bool,
}

impl PatchApplier {
    pub fn new(root: impl AsRef<Path>, settings: &Settings) -> Result<Self, PatchError> {
        let guard = WorkspaceGuard::new(root, &settings.index.ignore_dir_prefixes)?;
        Ok(Self {
            guard,
            settings: settings.clone(),
            dry_run: false,
        })
    }

    /// Compute merges without writing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        self.guard.workspace_root()
    }

    /// Locate, merge and write one patch. Relative patch paths are resolved
    /// against the workspace root.
    pub fn apply(&self, patch: &CodePatch) -> Result<ApplyOutcome, PatchError> {
        if patch.is_noop() {
            return Err(PatchError::EmptyPatch {
                file: patch.file.clone(),
            });
        }

        let path = self.guard.validate_path(&patch.file)?;
        let (snapshot, outcome) = prepare(&path, patch, &self.settings)?;

        if self.dry_run {
            debug!(file = %path.display(), "dry run, not writing");
            return Ok(outcome);
        }

        self.guard.revalidate(&path)?;
        snapshot.replace(&outcome.patched)?;
        info!(
            file = %path.display(),
            start = outcome.range.start,
            end = outcome.range.end,
            strategy = %outcome.strategy,
            "patch applied"
        );
        Ok(ApplyOutcome {
            written: true,
            ..outcome
        })
    }
}

/// Apply `patch` to its file directly, without a workspace boundary.
pub fn apply_patch(patch: &CodePatch, settings: &Settings) -> Result<ApplyOutcome, PatchError> {
    if patch.is_noop() {
        return Err(PatchError::EmptyPatch {
            file: patch.file.clone(),
        });
    }

    let (snapshot, outcome) = prepare(&patch.file, patch, settings)?;
    snapshot.replace(&outcome.patched)?;
    info!(file = %snapshot.path().display(), strategy = %outcome.strategy, "patch applied");
    Ok(ApplyOutcome {
        written: true,
        ..outcome
    })
}

fn prepare(
    path: &Path,
    patch: &CodePatch,
    settings: &Settings,
) -> Result<(FileSnapshot, ApplyOutcome), PatchError> {
    let snapshot = FileSnapshot::read(path)?;

    let located = locate(snapshot.content(), &patch.before, &settings.locate).map_err(|source| {
        PatchError::Locate {
            file: path.to_path_buf(),
            source,
        }
    })?;

    let merged = merge(
        snapshot.content(),
        &located.code_match,
        &patch.before,
        &patch.after,
        SourceLanguage::from_path(path),
        &settings.merge,
    )
    .map_err(Box::new)?;
    debug!(file = %path.display(), strategy = %merged.strategy, "merged");

    let outcome = ApplyOutcome {
        file: path.to_path_buf(),
        range: located.code_match,
        kind: located.kind,
        strategy: merged.strategy,
        original: snapshot.content().to_string(),
        patched: merged.content,
        written: false,
    };
    Ok((snapshot, outcome))
}
