//! CLI configuration -- thin wrapper around `adcon_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--url, --username, --insecure, ...).

use std::time::Duration;

use secrecy::SecretString;

use adcon_core::{ConsoleConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use adcon_config::{
    Config, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Translate a `Profile` + global flags into a `ConsoleConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<ConsoleConfig, CliError> {
    // 1. Console URL (flag > env > profile)
    let url_str = global.url.as_deref().unwrap_or(&profile.url);
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    // 2. Username (flag > env > profile)
    let username = global
        .username
        .clone()
        .or_else(|| profile.username.clone())
        .ok_or_else(|| CliError::Validation {
            field: "username".into(),
            reason: format!("profile '{profile_name}' has no username"),
        })?;

    // 3. Password (env > password_env > keyring > plaintext)
    let password = match std::env::var("ADCON_PASSWORD") {
        Ok(pw) => SecretString::from(pw),
        Err(_) => adcon_config::resolve_password(profile, profile_name)?,
    };

    // 4. TLS verification
    let tls = if global.insecure || profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // 5. Timeouts (profile overrides the flag default, explicit flags win
    //    through clap's env/default machinery)
    let timeout = Duration::from_secs(profile.timeout.unwrap_or(global.timeout));
    let idle_timeout = Duration::from_secs(profile.idle_timeout.unwrap_or(global.idle_timeout));

    Ok(ConsoleConfig {
        url,
        username,
        password,
        tls,
        timeout,
        idle_timeout,
    })
}

/// Build a `ConsoleConfig` from flags and env vars alone, with no profile.
pub fn resolve_from_flags(global: &GlobalOpts, profile_name: &str) -> Result<ConsoleConfig, CliError> {
    let url_str = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;

    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    let username = global.username.clone().ok_or_else(|| CliError::Validation {
        field: "username".into(),
        reason: "no username given (use --username or ADCON_USERNAME)".into(),
    })?;

    let password = std::env::var("ADCON_PASSWORD")
        .map(SecretString::from)
        .map_err(|_| CliError::NoCredentials {
            profile: profile_name.to_owned(),
        })?;

    let tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ConsoleConfig {
        url,
        username,
        password,
        tls,
        timeout: Duration::from_secs(global.timeout),
        idle_timeout: Duration::from_secs(global.idle_timeout),
    })
}
