//! Explicit, caller-owned registry of search backends keyed by root.

use crate::config::Settings;
use crate::index::IndexError;
use crate::search::SearchBackend;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

type Slot = Arc<Mutex<Option<Arc<SearchBackend>>>>;

/// Lazily builds one [`SearchBackend`] per root and hands out shared handles.
///
/// Different roots build concurrently. Concurrent `init` calls for the same
/// root wait on that root's slot, so its index is built exactly once.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    settings: Settings,
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl BackendRegistry {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the backend for `root`, building its index on first use.
    pub fn init(&self, root: impl AsRef<Path>) -> Result<Arc<SearchBackend>, IndexError> {
        let key = canonical_key(root.as_ref())?;

        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut backend = lock(&slot);
        if let Some(existing) = backend.as_ref() {
            debug!(root = %key.display(), "reusing search backend");
            return Ok(Arc::clone(existing));
        }

        let built = Arc::new(SearchBackend::new(&key, &self.settings)?);
        info!(
            root = %key.display(),
            files = built.index().parsed_files().len(),
            "search backend ready"
        );
        *backend = Some(Arc::clone(&built));
        Ok(built)
    }

    /// The backend for `root` if it has been initialised.
    pub fn get(&self, root: impl AsRef<Path>) -> Option<Arc<SearchBackend>> {
        let key = canonical_key(root.as_ref()).ok()?;
        let slot = lock(&self.slots).get(&key).cloned()?;
        let backend = lock(&slot);
        backend.clone()
    }

    /// Drop the registry's handle for `root`. Returns whether one existed.
    ///
    /// Handles already given out stay valid until their holders drop them.
    pub fn dispose(&self, root: impl AsRef<Path>) -> bool {
        let Ok(key) = canonical_key(root.as_ref()) else {
            return false;
        };
        let removed = lock(&self.slots).remove(&key);
        match removed {
            Some(slot) => {
                let had_backend = lock(&slot).is_some();
                debug!(root = %key.display(), "search backend disposed");
                had_backend
            }
            None => false,
        }
    }

    /// Roots with a built backend.
    pub fn roots(&self) -> Vec<PathBuf> {
        let slots = lock(&self.slots);
        let mut roots: Vec<PathBuf> = slots
            .iter()
            .filter(|(_, slot)| lock(slot).is_some())
            .map(|(root, _)| root.clone())
            .collect();
        roots.sort();
        roots
    }
}

fn canonical_key(root: &Path) -> Result<PathBuf, IndexError> {
    root.canonicalize().map_err(|source| IndexError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })
}

// A panic while building leaves the slot empty, so the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("model.py"), "class Foo:\n    pass\n").unwrap();
        dir
    }

    #[test]
    fn init_get_dispose_lifecycle() {
        let dir = tree();
        let registry = BackendRegistry::default();

        assert!(registry.get(dir.path()).is_none());

        let first = registry.init(dir.path()).unwrap();
        let second = registry.init(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.get(dir.path()).is_some());
        assert_eq!(registry.roots().len(), 1);

        assert!(registry.dispose(dir.path()));
        assert!(registry.get(dir.path()).is_none());
        assert!(!registry.dispose(dir.path()));

        // Handles given out earlier survive disposal.
        assert!(first.search_class("Foo").unwrap().success);
    }

    #[test]
    fn concurrent_init_builds_once() {
        let dir = tree();
        let registry = BackendRegistry::default();

        let handles: Vec<Arc<SearchBackend>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| registry.init(dir.path()).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(handles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn init_missing_root_fails() {
        let registry = BackendRegistry::default();
        assert!(matches!(
            registry.init("/definitely/not/here"),
            Err(IndexError::RootNotFound { .. })
        ));
    }
}
