//! Configuration loader for `streampilot.toml` and environment overrides.
//!
//! Resolution order, later layers winning:
//! 1. Built-in defaults (every field of [`SupervisorConfig`] has one)
//! 2. The TOML file, when present
//! 3. `STREAMPILOT_*` process environment variables

use crate::config::error::{ConfigError, ConfigResult};
use sp_protocol::config_models::SupervisorConfig;
use std::path::{Path, PathBuf};

/// Prefix of every recognized environment override.
pub const ENV_PREFIX: &str = "STREAMPILOT_";

/// Default location probed when no `--config` path was given.
pub const DEFAULT_CONFIG_FILE: &str = "streampilot.toml";

/// Loads the supervisor configuration.
///
/// With an explicit `path` the file must exist; without one, a missing
/// `streampilot.toml` in the working directory is fine and the defaults
/// apply. Environment overrides are applied on top either way.
///
/// # Errors
///
/// Returns `ConfigError` if an explicitly named file is missing, a file
/// exists but cannot be read or parsed, or an environment variable holds
/// a value its field cannot accept.
pub fn load_config(path: Option<&Path>) -> ConfigResult<SupervisorConfig> {
    let mut config = match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(ConfigError::FileMissing {
                    path: explicit.to_path_buf(),
                });
            }
            load_file(explicit)?
        }
        None => {
            let implicit = Path::new(DEFAULT_CONFIG_FILE);
            if implicit.exists() {
                load_file(implicit)?
            } else {
                SupervisorConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Parses one TOML file into a configuration.
fn load_file(path: &Path) -> ConfigResult<SupervisorConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Applies `STREAMPILOT_*` overrides from `lookup` onto `config`.
///
/// `lookup` receives the full variable name (prefix included) and returns
/// the raw value when set. Split out from [`load_config`] so tests can
/// drive it with a plain map instead of the process environment.
pub fn apply_env_overrides(
    config: &mut SupervisorConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ConfigResult<()> {
    override_path(&lookup, "LOG_FILE", &mut config.log_file);
    override_path(&lookup, "RECORD_FILE", &mut config.record_file);
    override_path(&lookup, "COMMAND_PATH", &mut config.command_path);
    override_string(&lookup, "PROCESS_NAME", &mut config.process_name);
    override_string(&lookup, "PEER_HOST", &mut config.peer_host);

    override_parsed(&lookup, "TRIGGER_CHANNEL", &mut config.trigger_channel)?;
    override_parsed(&lookup, "INDICATOR_CHANNEL", &mut config.indicator_channel)?;
    override_parsed(&lookup, "PEER_PORT", &mut config.peer_port)?;
    override_parsed(
        &lookup,
        "HEALTH_INTERVAL_SECS",
        &mut config.health_interval_secs,
    )?;
    override_parsed(
        &lookup,
        "CONNECT_TIMEOUT_SECS",
        &mut config.connect_timeout_secs,
    )?;
    override_parsed(&lookup, "MAX_START_ATTEMPTS", &mut config.max_start_attempts)?;
    override_parsed(&lookup, "START_TIMEOUT_SECS", &mut config.start_timeout_secs)?;
    override_parsed(
        &lookup,
        "START_POLL_INTERVAL_SECS",
        &mut config.start_poll_interval_secs,
    )?;
    override_parsed(
        &lookup,
        "START_POLL_TIMEOUT_SECS",
        &mut config.start_poll_timeout_secs,
    )?;
    override_parsed(&lookup, "STOP_TIMEOUT_SECS", &mut config.stop_timeout_secs)?;
    override_parsed(
        &lookup,
        "STOP_POLL_INTERVAL_SECS",
        &mut config.stop_poll_interval_secs,
    )?;
    override_parsed(
        &lookup,
        "STOP_POLL_TIMEOUT_SECS",
        &mut config.stop_poll_timeout_secs,
    )?;
    override_parsed(&lookup, "STUCK_INTERVAL_SECS", &mut config.stuck_interval_secs)?;
    override_parsed(&lookup, "STUCK_TIMEOUT_SECS", &mut config.stuck_timeout_secs)?;
    override_parsed(
        &lookup,
        "DEBOUNCE_WINDOW_MS",
        &mut config.debounce_window_ms,
    )?;
    override_parsed(
        &lookup,
        "RESOURCE_THRESHOLD_PCT",
        &mut config.resource_threshold_pct,
    )?;
    override_parsed(
        &lookup,
        "SHUTDOWN_GRACE_SECS",
        &mut config.shutdown_grace_secs,
    )?;

    Ok(())
}

fn override_string(lookup: impl Fn(&str) -> Option<String>, name: &str, field: &mut String) {
    if let Some(raw) = lookup(&format!("{ENV_PREFIX}{name}")) {
        *field = raw;
    }
}

fn override_path(lookup: impl Fn(&str) -> Option<String>, name: &str, field: &mut PathBuf) {
    if let Some(raw) = lookup(&format!("{ENV_PREFIX}{name}")) {
        *field = PathBuf::from(raw);
    }
}

fn override_parsed<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    field: &mut T,
) -> ConfigResult<()>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let key = format!("{ENV_PREFIX}{name}");
    if let Some(raw) = lookup(&key) {
        *field = raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
