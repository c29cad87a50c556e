//! Configuration for kefctl.
//!
//! TOML profiles naming speakers by address, merged with `KEF_`-prefixed
//! environment variables, and translation to `kefctl_core::ControllerConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kefctl_core::{ControllerConfig, Endpoint};

pub const ENV_PREFIX: &str = "KEF_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("no speaker configured; pass --address or add a profile")]
    NoProfile,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named speaker profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Output format used when `-o` is not given.
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Event-queue poll wait in seconds.
    #[serde(default = "default_poll_wait")]
    pub poll_wait: u64,

    /// Volume debounce window in milliseconds.
    #[serde(default = "default_volume_debounce_ms")]
    pub volume_debounce_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            poll_wait: default_poll_wait(),
            volume_debounce_ms: default_volume_debounce_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    5
}
fn default_poll_wait() -> u64 {
    10
}
fn default_volume_debounce_ms() -> u64 {
    1000
}

/// A named speaker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// IP, `host:port`, or full URL of the speaker.
    pub address: String,

    /// Override request timeout.
    pub timeout: Option<u64>,

    /// Override poll wait.
    pub poll_wait: Option<u64>,
}

impl Profile {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: None,
            poll_wait: None,
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = match name.or(self.default_profile.as_deref()) {
            Some(name) => name,
            None => return Err(ConfigError::NoProfile),
        };
        self.profiles
            .get(name)
            .map(|p| (name.to_owned(), p))
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "kefctl", "kefctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("kefctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is not
/// an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to core types ───────────────────────────────────────

/// Parse a profile's address into an endpoint.
pub fn profile_endpoint(profile: &Profile) -> Result<Endpoint, ConfigError> {
    Endpoint::parse(&profile.address).map_err(|e| ConfigError::Validation {
        field: "address".into(),
        reason: format!("{}: {e}", profile.address),
    })
}

/// Build a `ControllerConfig` from global defaults and optional profile
/// overrides.
pub fn controller_config(defaults: &Defaults, profile: Option<&Profile>) -> ControllerConfig {
    let timeout = profile.and_then(|p| p.timeout).unwrap_or(defaults.timeout);
    let poll_wait = profile
        .and_then(|p| p.poll_wait)
        .unwrap_or(defaults.poll_wait);

    ControllerConfig {
        timeout: Duration::from_secs(timeout.max(1)),
        poll_wait: Duration::from_secs(poll_wait.max(1)),
        volume_debounce: Duration::from_millis(defaults.volume_debounce_ms),
        ..ControllerConfig::default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.defaults, Defaults::default());
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        let mut office = Profile::new("192.168.1.20");
        office.timeout = Some(3);
        config.profiles.insert("default".into(), office);
        config
            .profiles
            .insert("den".into(), Profile::new("http://den.local:8080"));

        save_config_to(&path, &config).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn reads_handwritten_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "desk"

[defaults]
output = "json"
poll_wait = 20

[profiles.desk]
address = "10.0.0.7"
"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        let (name, profile) = config.profile(None).unwrap();
        assert_eq!(name, "desk");
        assert_eq!(profile.address, "10.0.0.7");
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.timeout, 5);

        let controller = controller_config(&config.defaults, Some(profile));
        assert_eq!(controller.poll_wait, Duration::from_secs(20));
        assert_eq!(controller.timeout, Duration::from_secs(5));
        assert_eq!(controller.volume_debounce, Duration::from_secs(1));
    }

    #[test]
    fn unknown_profile_is_reported() {
        let config = Config::default();
        let err = config.profile(Some("attic")).unwrap_err();
        assert!(matches!(err, ConfigError::ProfileNotFound { ref name } if name == "attic"));
    }

    #[test]
    fn profile_address_must_parse() {
        assert!(profile_endpoint(&Profile::new("192.168.1.20")).is_ok());
        let err = profile_endpoint(&Profile::new("http://")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
