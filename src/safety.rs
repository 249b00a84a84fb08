use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Workspace safety checks that keep patches inside the indexed tree.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Absolute path to workspace root
    workspace_root: PathBuf,
    /// Directory name prefixes that are never patched (`.git`, `.venv`, ...)
    forbidden_prefixes: Vec<String>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: String },

    #[error("Failed to canonicalize path {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceGuard {
    /// Create a guard rooted at `workspace_root`.
    ///
    /// The root is canonicalized to handle symlinks correctly. Any directory
    /// below it whose name starts with one of `forbidden_prefixes` is off
    /// limits.
    pub fn new(
        workspace_root: impl AsRef<Path>,
        forbidden_prefixes: &[String],
    ) -> Result<Self, SafetyError> {
        let workspace_root = canonicalize(workspace_root.as_ref())?;
        Ok(Self {
            workspace_root,
            forbidden_prefixes: forbidden_prefixes.to_vec(),
        })
    }

    /// Check if a path is safe to patch.
    ///
    /// Relative paths are resolved against the workspace root. Returns the
    /// canonicalized absolute path if safe.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        // Resolves symlinks and .. components
        let canonical = canonicalize(&absolute)?;

        self.check_canonical(&canonical)?;

        Ok(canonical)
    }

    /// Re-validate a previously validated path immediately before writing.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let canonical = canonicalize(path)?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        let Ok(relative) = canonical.strip_prefix(&self.workspace_root) else {
            return Err(SafetyError::OutsideWorkspace {
                path: canonical.to_path_buf(),
                workspace: self.workspace_root.clone(),
            });
        };

        // Every directory between the root and the file
        let parents = relative.parent().map(Path::components).into_iter().flatten();
        for component in parents {
            let Component::Normal(name) = component else {
                continue;
            };
            let name = name.to_string_lossy();
            if let Some(prefix) = self
                .forbidden_prefixes
                .iter()
                .find(|prefix| name.starts_with(prefix.as_str()))
            {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: prefix.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the workspace root.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}
