use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{ClientOverrides, Credentials, Mode};

pub const ENV_TOKEN: &str = "ROAM_API_TOKEN";
pub const ENV_GRAPH: &str = "ROAM_GRAPH_NAME";
pub const ENV_MODE: &str = "ROAM_MODE";

pub const KEYS: [&str; 6] = [
    "base_url",
    "graph_name",
    "token",
    "mode",
    "timeout_secs",
    "output_format",
];

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    HomeDir,
    UnknownKey(String),
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config I/O error: {}", err),
            ConfigError::Parse(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::Serialize(err) => write!(f, "failed to write config: {}", err),
            ConfigError::HomeDir => write!(f, "failed to get home directory"),
            ConfigError::UnknownKey(key) => write!(
                f,
                "unknown config key '{}' (expected one of: {})",
                key,
                KEYS.join(", ")
            ),
            ConfigError::InvalidValue { key, message } => {
                write!(f, "invalid value for '{}': {}", key, message)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Parse(value)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(value: toml::ser::Error) -> Self {
        ConfigError::Serialize(value)
    }
}

/// Persistent settings. Every key is optional; flags and environment win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

impl Config {
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(match key {
            "base_url" => self.base_url.clone(),
            "graph_name" => self.graph_name.clone(),
            "token" => self.token.clone(),
            "mode" => self.mode.clone(),
            "timeout_secs" => self.timeout_secs.map(|secs| secs.to_string()),
            "output_format" => self.output_format.clone(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        })
    }

    /// Sets `key` after validating `value`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        match key {
            "base_url" => self.base_url = Some(value.to_string()),
            "graph_name" => self.graph_name = Some(value.to_string()),
            "token" => self.token = Some(value.to_string()),
            "mode" => {
                let mode = value
                    .parse::<Mode>()
                    .map_err(|err| invalid(err.to_string()))?;
                self.mode = Some(mode.as_str().to_string());
            }
            "timeout_secs" => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| invalid("expected a positive number of seconds".to_string()))?;
                self.timeout_secs = Some(secs);
            }
            "output_format" => match value {
                "text" | "json" => self.output_format = Some(value.to_string()),
                _ => return Err(invalid("expected 'text' or 'json'".to_string())),
            },
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "base_url" => self.base_url = None,
            "graph_name" => self.graph_name = None,
            "token" => self.token = None,
            "mode" => self.mode = None,
            "timeout_secs" => self.timeout_secs = None,
            "output_format" => self.output_format = None,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn prefers_json(&self) -> bool {
        self.output_format.as_deref() == Some("json")
    }

    /// A copy safe to print: the token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(token) = copy.token.as_mut() {
            *token = mask(token);
        }
        copy
    }
}

fn mask(token: &str) -> String {
    let count = token.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    format!("****{}", token.chars().skip(count - 4).collect::<String>())
}

/// `$HOME/.config/roam/config.toml`.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("roam").join("config.toml"))
        .ok_or(ConfigError::HomeDir)
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `path` when given, the default location otherwise.
    pub fn open(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Ok(Self::new(path)),
            None => default_path().map(Self::new),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as the default config.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(config)?)?;
        Ok(())
    }
}

/// Connection settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFlags {
    pub graph: Option<String>,
    pub token: Option<String>,
    pub local: bool,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub port_file: Option<PathBuf>,
}

/// Picks each credential from flags, then `env`, then the config file.
/// `--local` forces encrypted mode.
pub fn resolve_credentials(
    flags: &ConnectionFlags,
    env: impl Fn(&str) -> Option<String>,
    config: &Config,
) -> Result<Credentials, ConfigError> {
    let pick = |flag: &Option<String>, var: &str, stored: &Option<String>| {
        first_non_empty([flag.clone(), env(var), stored.clone()])
    };
    let token = pick(&flags.token, ENV_TOKEN, &config.token).unwrap_or_default();
    let graph_name = pick(&flags.graph, ENV_GRAPH, &config.graph_name).unwrap_or_default();
    let mode = if flags.local {
        Mode::Encrypted
    } else {
        let raw = pick(&None, ENV_MODE, &config.mode).unwrap_or_default();
        raw.parse::<Mode>().map_err(|err| ConfigError::InvalidValue {
            key: "mode".to_string(),
            message: err.to_string(),
        })?
    };
    Ok(Credentials {
        token,
        graph_name,
        mode,
    })
}

pub fn resolve_overrides(flags: &ConnectionFlags, config: &Config) -> ClientOverrides {
    ClientOverrides {
        base_url: first_non_empty([flags.base_url.clone(), config.base_url.clone()]),
        timeout: flags
            .timeout_secs
            .or(config.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs),
        port_file: flags.port_file.clone(),
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
