//! Fuzzpatch: symbol search and fuzzy patch application for Python trees
//!
//! Two subsystems share one parser layer:
//!
//! - **Search**: [`SourceIndex`] records where every class, method and
//!   function of a source tree is defined; [`SearchBackend`] answers
//!   class/method/code queries over it and renders the tagged text format.
//! - **Patching**: [`parse_edits`] reads `<modifications>` blocks into
//!   `(file, before, after)` edits; [`PatchApplier`] finds `before` in the
//!   file (exactly, or by scoring candidate frames with a weighted edit
//!   distance) and merges `after` in, repairing indentation until the file
//!   parses again.
//!
//! # Safety
//!
//! - Patched paths must stay inside the workspace and out of ignored dirs
//! - Atomic file writes (tempfile + fsync + rename)
//! - Files are hashed on read and re-checked before write
//! - A Python file is never written with a syntax error introduced by a merge
//!
//! # Example
//!
//! ```no_run
//! use fuzzpatch::{parse_patches, PatchApplier, Settings};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let text = std::fs::read_to_string("edits.txt")?;
//! let applier = PatchApplier::new(".", &Settings::default())?;
//!
//! for patch in parse_patches(&text)? {
//!     let outcome = applier.apply(&patch)?;
//!     println!("{}: {}", outcome.file.display(), outcome.strategy);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod edits;
pub mod index;
pub mod patch;
pub mod pool;
pub mod safety;
pub mod search;
pub mod ts;
pub mod validate;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, Settings};
pub use edits::{parse_edits, parse_edits_with, parse_patches, parse_patches_with, Edit, EditParseError};
pub use index::{IndexError, SourceIndex, SymbolLocation};
pub use patch::{
    apply_patch, ApplyOutcome, CodePatch, LocateError, MatchKind, MergeError, MergeStrategy,
    PatchApplier, PatchError,
};
pub use safety::{SafetyError, WorkspaceGuard};
pub use search::{BackendRegistry, SearchBackend, SearchError, SearchOutcome, SearchResult};
pub use ts::{LineRange, TreeSitterError};
pub use validate::{is_valid_python, validate, validate_file, ErrorLocation, SourceLanguage};
