// ── Runtime connection configuration ──
//
// These types describe *how* to connect to the console backend. They carry
// credential data and connection tuning, but never touch disk -- the CLI
// constructs a `ConsoleConfig` from profiles/flags and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default -- the console sits behind a
    /// corporate CA that should be in the trust store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (lab/self-signed deployments).
    DangerAcceptInvalid,
}

/// Configuration for connecting to one console backend.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Console base URL (e.g., `https://adconsole.corp.example`).
    pub url: Url,
    /// Directory account used to log in.
    pub username: String,
    /// Its password.
    pub password: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout for REST calls.
    pub timeout: Duration,
    /// Watchdog for the computer stream: a session that receives no
    /// message for this long fails with a timeout error. The protocol
    /// itself has no idle limit; this is purely client-side.
    pub idle_timeout: Duration,
}

impl ConsoleConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(45);
}
