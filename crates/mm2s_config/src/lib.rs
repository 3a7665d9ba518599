//! Parsing and validation of `mm2s.toml` harness configuration files.
//!
//! Every table is optional; an empty file (or no file at all) yields the
//! built-in defaults, which reproduce the fixed suite setup of the harness.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_or_default, CONFIG_FILE_NAME};
pub use types::*;
