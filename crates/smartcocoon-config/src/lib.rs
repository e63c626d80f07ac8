//! Shared configuration for SmartCocoon tools.
//!
//! TOML profiles, option bounds, credential resolution (env + keyring +
//! plaintext), token persistence, and translation to
//! `smartcocoon_api::ClientConfig` / `smartcocoon_core::CoordinatorConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use smartcocoon_api::{API_ENDPOINT, ClientConfig, TokenSet, TransportConfig};
use smartcocoon_core::{CoordinatorConfig, Selection};

const KEYRING_SERVICE: &str = "smartcocoon";

/// Environment variable consulted for the password of any profile.
pub const PASSWORD_ENV: &str = "SMARTCOCOON_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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

// ── Option bounds ───────────────────────────────────────────────────

/// Inclusive range and step for a numeric option, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionBounds {
    pub field: &'static str,
    pub min: u64,
    pub max: u64,
    pub step: u64,
    pub default: u64,
}

pub const SCAN_INTERVAL: OptionBounds = OptionBounds {
    field: "scan_interval",
    min: 30,
    max: 600,
    step: 30,
    default: 120,
};

pub const TIMEOUT: OptionBounds = OptionBounds {
    field: "timeout",
    min: 10,
    max: 60,
    step: 5,
    default: 30,
};

impl OptionBounds {
    /// Accept `value` only inside the range and on a step boundary.
    pub fn validate(&self, value: u64) -> Result<u64, ConfigError> {
        if !(self.min..=self.max).contains(&value) {
            return Err(ConfigError::Validation {
                field: self.field.into(),
                reason: format!("{value} is outside {}..={}", self.min, self.max),
            });
        }
        if (value - self.min) % self.step != 0 {
            return Err(ConfigError::Validation {
                field: self.field.into(),
                reason: format!("{value} is not a multiple of {} from {}", self.step, self.min),
            });
        }
        Ok(value)
    }

    /// Every accepted value, smallest first.
    pub fn choices(&self) -> Vec<u64> {
        (self.min..=self.max).step_by(usize::try_from(self.step).unwrap_or(1)).collect()
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
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

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub save_responses: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
            save_responses: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_scan_interval() -> u64 {
    SCAN_INTERVAL.default
}
fn default_timeout() -> u64 {
    TIMEOUT.default
}

/// A named account profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Account email; also the `uid` the service expects.
    pub email: String,

    /// Plaintext password. Prefer the keyring or `password_env`.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Token triple from the last login, reused across restarts.
    pub access_token: Option<String>,
    pub client: Option<String>,
    pub uid: Option<String>,

    /// Selected system ids. Empty means every system.
    #[serde(default)]
    pub systems: Vec<i64>,

    /// Selected fan ids.
    #[serde(default)]
    pub fans: Vec<i64>,

    /// Override scan interval (seconds).
    pub scan_interval: Option<u64>,

    /// Override update timeout (seconds).
    pub timeout: Option<u64>,

    /// Override response persistence.
    pub save_responses: Option<bool>,

    /// Where persisted responses go (default: `<data dir>/responses`).
    pub save_location: Option<PathBuf>,

    /// API root override.
    pub base_url: Option<String>,
}

impl Profile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Stored token triple, when all three parts are present.
    pub fn tokens(&self) -> Option<TokenSet> {
        match (&self.access_token, &self.client, &self.uid) {
            (Some(token), Some(client), Some(uid)) => Some(TokenSet::new(token, client, uid)),
            _ => None,
        }
    }

    /// Remember `tokens` so the next run can skip the login.
    pub fn set_tokens(&mut self, tokens: &TokenSet) {
        self.access_token = Some(tokens.access_token.expose_secret().to_owned());
        self.client = Some(tokens.client.clone());
        self.uid = Some(tokens.uid.clone());
    }

    pub fn clear_tokens(&mut self) {
        self.access_token = None;
        self.client = None;
        self.uid = None;
    }

    pub fn scan_interval(&self, defaults: &Defaults) -> Result<Duration, ConfigError> {
        let secs = SCAN_INTERVAL.validate(self.scan_interval.unwrap_or(defaults.scan_interval))?;
        Ok(Duration::from_secs(secs))
    }

    pub fn timeout(&self, defaults: &Defaults) -> Result<Duration, ConfigError> {
        let secs = TIMEOUT.validate(self.timeout.unwrap_or(defaults.timeout))?;
        Ok(Duration::from_secs(secs))
    }

    /// Persistence directory, or `None` when responses are not saved.
    pub fn save_location(&self, defaults: &Defaults) -> Option<PathBuf> {
        if !self.save_responses.unwrap_or(defaults.save_responses) {
            return None;
        }
        Some(
            self.save_location
                .clone()
                .unwrap_or_else(default_save_location),
        )
    }

    pub fn selection(&self) -> Selection {
        Selection {
            systems: self.systems.clone(),
            fans: self.fans.clone(),
        }
    }
}

impl Config {
    /// Name of the profile to use: the override, else the default.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    pub fn profile_mut(&mut self, name: &str) -> Result<&mut Profile, ConfigError> {
        self.profiles
            .get_mut(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "smartcocoon", "smartcocoon")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// `<data dir>/responses`.
pub fn default_save_location() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("responses"),
        |dirs| dirs.data_dir().join("responses"),
    )
}

/// Create the parent of a persistence directory. The directory itself is
/// left to the response store, which creates it on first write.
pub fn prepare_save_location(dir: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("smartcocoon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Environment variables use the `SMARTCOCOON_` prefix with `__` between
/// nesting levels, e.g. `SMARTCOCOON_DEFAULTS__TIMEOUT=45`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SMARTCOCOON_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Resolve the account password.
///
/// Order: the profile's `password_env`, then `SMARTCOCOON_PASSWORD`, then
/// the system keyring, then the plaintext `password`.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store the password in the system keyring under the profile name.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `ClientConfig` from a profile.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let raw = profile.base_url.as_deref().unwrap_or(API_ENDPOINT);
    let base_url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "base_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;

    let save_location = profile.save_location(defaults);
    if let Some(ref dir) = save_location {
        prepare_save_location(dir)?;
    }

    Ok(ClientConfig {
        base_url,
        tokens: profile.tokens(),
        save_location,
        transport: TransportConfig::default().with_timeout(profile.timeout(defaults)?),
    })
}

/// Build a `CoordinatorConfig` from a profile.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    Ok(CoordinatorConfig {
        name: format!("SmartCocoon ({})", profile.email),
        systems: (!profile.systems.is_empty()).then(|| profile.systems.clone()),
        scan_interval: profile.scan_interval(defaults)?,
        timeout: profile.timeout(defaults)?,
    })
}
