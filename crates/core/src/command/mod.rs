//! Launch command execution.

pub mod executor;

pub use executor::{supervisor_dir, CommandError, CommandRunner, ScriptRunner};
