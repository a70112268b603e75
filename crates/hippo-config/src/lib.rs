//! Configuration system for Hippo.
//!
//! Provides TOML-based configuration with:
//! - `[memory]`, `[embedding]` and `[chunking]` sections
//! - Config file layering (user config + project-local overrides)
//! - API key resolution (config file, then `OPENAI_API_KEY`)
//! - Conversion into a [`MemoryManagerConfig`](hippo_agent::MemoryManagerConfig)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, default_data_dir, load_config, load_config_file,
    load_config_with_options, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
