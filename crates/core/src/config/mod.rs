pub mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, DEFAULT_INDEX_NAME, default_config_path};
pub use types::{LoggingConfig, QueueConfig, ResolvedConfig, SearchConfig};
