use thiserror::Error;

/// User-facing error type for `adcon-core`.
///
/// The CLI maps these into miette diagnostics with help text.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Could not connect to console at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- log in again")]
    SessionExpired,

    /// The computer stream ended abnormally (server error message,
    /// transport drop, or idle timeout). Recovery is a manual restart.
    #[error("Computer stream failed: {message}")]
    StreamFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("{entity_type} '{identifier}' not found")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Console API error (HTTP {status}): {message}")]
    Api { message: String, status: u16 },

    #[error("Unexpected response data: {message}")]
    InvalidData { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl From<adcon_api::Error> for CoreError {
    fn from(err: adcon_api::Error) -> Self {
        use adcon_api::Error as Api;
        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::SessionExpired => Self::SessionExpired,
            Api::Transport(e) => Self::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "(unknown)".to_owned(), ToString::to_string),
                reason: e.to_string(),
            },
            Api::InvalidUrl(e) => Self::Config {
                message: e.to_string(),
            },
            Api::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            Api::Tls(message) => Self::ConnectionFailed {
                url: "(tls)".to_owned(),
                reason: message,
            },
            Api::Api { message, status } => Self::Api { message, status },
            Api::StreamConnect(message) | Api::StreamLost(message) => {
                Self::StreamFailed { message }
            }
            Api::Deserialization { message, .. } => Self::InvalidData { message },
        }
    }
}
