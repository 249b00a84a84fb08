pub mod loader;
pub mod schema;

pub use loader::{discover, load_from_path, load_from_str, ConfigError, SETTINGS_FILE_NAME};
pub use schema::{
    EditSettings, IndexSettings, LevenshteinWeights, LocateSettings, MergeSettings,
    SearchSettings, Settings, ValidationError, ValidationIssue, DEFAULT_MAX_FRAME_SCORE,
    FULL_CLASS_SHOW_LIMIT, RESULT_SHOW_LIMIT,
};
