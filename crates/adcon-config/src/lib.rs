//! Configuration for the AD console CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `adcon_core::ConsoleConfig`. The CLI layers flag
//! overrides on top of what this crate resolves.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adcon_core::{ConsoleConfig, TlsVerification};

/// Keyring service name under which passwords are stored.
pub const KEYRING_SERVICE: &str = "adcon";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' not found in config")]
    UnknownProfile { profile: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named console profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named console profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Console base URL (e.g., "https://adconsole.corp.example").
    pub url: String,

    /// Directory account used to log in.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override REST timeout (seconds).
    pub timeout: Option<u64>,

    /// Override the stream idle watchdog (seconds).
    pub idle_timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "adcon", "adcon").map_or_else(
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
    p.push("adcon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("ADCON_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a profile's password from the credential chain.
///
/// Order: the profile's `password_env` variable, then the system keyring,
/// then plaintext in the config file.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(profile_name))?;
    entry.set_password(password)?;
    Ok(())
}

fn keyring_account(profile_name: &str) -> String {
    format!("{profile_name}/password")
}

// ── Translation to ConsoleConfig ────────────────────────────────────

/// Build a `ConsoleConfig` from a profile, without CLI flag overrides.
pub fn profile_to_console_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ConsoleConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var("ADCON_USERNAME").ok())
        .ok_or_else(|| ConfigError::Validation {
            field: "username".into(),
            reason: format!("profile '{profile_name}' has no username"),
        })?;

    let password = match std::env::var("ADCON_PASSWORD") {
        Ok(pw) => SecretString::from(pw),
        Err(_) => resolve_password(profile, profile_name)?,
    };

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    let idle_timeout = profile.idle_timeout.map_or(
        ConsoleConfig::DEFAULT_IDLE_TIMEOUT,
        Duration::from_secs,
    );

    Ok(ConsoleConfig {
        url,
        username,
        password,
        tls,
        timeout,
        idle_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn profile() -> Profile {
        Profile {
            url: "https://adconsole.example".into(),
            username: Some("admin".into()),
            password: Some("hunter2".into()),
            password_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
            idle_timeout: None,
        }
    }

    #[test]
    fn plaintext_password_resolves() {
        let secret = resolve_password(&profile(), "lab").expect("resolve");
        assert_eq!(secret.expose_secret(), "hunter2");
    }

    #[test]
    fn missing_password_is_an_error() {
        let mut p = profile();
        p.password = None;
        assert!(matches!(
            resolve_password(&p, "lab"),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn profile_translates_with_defaults() {
        let cfg = profile_to_console_config(&profile(), "lab", &Defaults::default())
            .expect("translate");
        assert_eq!(cfg.url.as_str(), "https://adconsole.example/");
        assert_eq!(cfg.username, "admin");
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.idle_timeout, ConsoleConfig::DEFAULT_IDLE_TIMEOUT);
    }

    #[test]
    fn insecure_profile_disables_verification() {
        let mut p = profile();
        p.insecure = Some(true);
        let cfg =
            profile_to_console_config(&p, "lab", &Defaults::default()).expect("translate");
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let mut p = profile();
        p.url = "not a url".into();
        assert!(matches!(
            profile_to_console_config(&p, "lab", &Defaults::default()),
            Err(ConfigError::Validation { .. })
        ));
    }
}
