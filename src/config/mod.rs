pub mod loader;
pub mod schema;

pub use loader::{load_for_workspace, load_from_path, load_from_str, ConfigError, DEFAULT_CONFIG_FILE};
pub use schema::{
    DuplicatePathPolicy, EngineConfig, LineEndingPolicy, StatisticsMode, ValidationError,
    ValidationIssue, DEFAULT_MAX_FILE_SIZE,
};
