//! Configuration resolution for handmux.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/handmux/settings.json`)
//! 3. Explicit config file passed by the host application
//! 4. Environment variables (highest priority)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Complete handmux configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Write this configuration as a pretty-printed settings file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Shared hand tracking session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Update broadcast channel capacity. Subscribers lagging further than
    /// this lose the oldest updates.
    pub broadcast_capacity: usize,
    /// Skipped-update count above which a lagging subscriber is logged at
    /// `warn` instead of `debug`.
    pub lag_warn_threshold: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            lag_warn_threshold: 64,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    resolve_config(global_config_path().as_deref(), explicit, |key| {
        std::env::var(key).ok()
    })
}

/// Resolve configuration from the given sources.
///
/// The global file is optional and skipped when missing; an explicit file
/// must exist. Files are layered key by key, so a file only overrides the
/// settings it names.
pub fn resolve_config(
    global: Option<&Path>,
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    if let Some(global_path) = global
        && global_path.exists()
    {
        merge_json(&mut merged, load_config_file(global_path)?);
    }

    if let Some(path) = explicit {
        merge_json(&mut merged, load_config_file(path)?);
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;
    apply_env_overrides(&mut config, env);
    validate(&config)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("handmux").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !value.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )));
    }
    debug!(path = %path.display(), "Loaded config file");
    Ok(value)
}

/// Overlay `overlay` onto `base`, recursing into objects.
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(val) = env("HANDMUX_BROADCAST_CAPACITY")
        && let Ok(n) = val.parse()
    {
        config.session.broadcast_capacity = n;
    }
    if let Some(val) = env("HANDMUX_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = env("HANDMUX_LOG_JSON")
        && let Ok(json) = val.parse()
    {
        config.logging.json = json;
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.session.broadcast_capacity == 0 {
        return Err(Error::Config(
            "session.broadcast_capacity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_has_256_capacity() {
        let config = Config::default();
        assert_eq!(config.session.broadcast_capacity, 256);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn missing_global_file_is_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = resolve_config(Some(&dir.path().join("nope.json")), None, no_env).unwrap();
        assert_eq!(config.session.broadcast_capacity, 256);
    }

    #[test]
    fn explicit_file_overrides_global() {
        let dir = tempfile::TempDir::new().unwrap();
        let global = dir.path().join("global.json");
        let explicit = dir.path().join("app.json");
        std::fs::write(&global, r#"{"session":{"broadcast_capacity":32}}"#).unwrap();
        std::fs::write(&explicit, r#"{"session":{"broadcast_capacity":8},"logging":{"json":true}}"#)
            .unwrap();

        let config = resolve_config(Some(&global), Some(&explicit), no_env).unwrap();
        assert_eq!(config.session.broadcast_capacity, 8);
        assert_eq!(config.session.lag_warn_threshold, 64);
        assert!(config.logging.json);
    }

    #[test]
    fn explicit_file_keeps_unnamed_global_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let global = dir.path().join("global.json");
        let explicit = dir.path().join("app.json");
        std::fs::write(
            &global,
            r#"{"session":{"lag_warn_threshold":10},"logging":{"level":"debug"}}"#,
        )
        .unwrap();
        std::fs::write(&explicit, r#"{"session":{"broadcast_capacity":8}}"#).unwrap();

        let config = resolve_config(Some(&global), Some(&explicit), no_env).unwrap();
        assert_eq!(config.session.broadcast_capacity, 8);
        assert_eq!(config.session.lag_warn_threshold, 10);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
    }

    #[test]
    fn wrongly_typed_setting_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("typed.json");
        std::fs::write(&path, r#"{"session":{"broadcast_capacity":"lots"}}"#).unwrap();
        let result = resolve_config(None, Some(&path), no_env);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = resolve_config(None, Some(&dir.path().join("missing.json")), no_env);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = resolve_config(None, Some(&path), no_env);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_win() {
        let env = |key: &str| match key {
            "HANDMUX_BROADCAST_CAPACITY" => Some("1024".to_string()),
            "HANDMUX_LOG_LEVEL" => Some("debug".to_string()),
            "HANDMUX_LOG_JSON" => Some("yes".to_string()),
            _ => None,
        };
        let config = resolve_config(None, None, env).unwrap();
        assert_eq!(config.session.broadcast_capacity, 1024);
        assert_eq!(config.logging.level, "debug");
        // "yes" is not a bool; ignored
        assert!(!config.logging.json);
    }

    #[test]
    fn saved_config_is_loaded_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("handmux").join("settings.json");
        let mut config = Config::default();
        config.session.broadcast_capacity = 16;
        config.logging.level = "trace".to_string();
        config.save(&path).unwrap();

        let loaded = resolve_config(None, Some(&path), no_env).unwrap();
        assert_eq!(loaded.session.broadcast_capacity, 16);
        assert_eq!(loaded.logging.level, "trace");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let env = |key: &str| (key == "HANDMUX_BROADCAST_CAPACITY").then(|| "0".to_string());
        let result = resolve_config(None, None, env);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
