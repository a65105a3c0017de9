//! Configuration loading and management.
//!
//! This module resolves the supervisor configuration from an optional
//! `streampilot.toml` file and `STREAMPILOT_*` environment overrides.

pub mod error;
pub mod loader;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
