// Shared transport configuration for building reqwest::Client instances.
//
// The REST client and the SSE stream share TLS, timeout, and cookie
// settings through this module. The console authenticates with a session
// cookie, so a shared jar is mandatory for both surfaces.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for consoles behind internal CAs).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The request timeout applies to plain REST calls only. The SSE
    /// stream is a deliberately long-lived request, so [`sse`](crate::sse)
    /// builds its own client via [`build_streaming_client`](Self::build_streaming_client).
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        self.builder_with_tls()?
            .timeout(self.timeout)
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build a client without a total-request timeout, for the SSE stream.
    ///
    /// Only the connect timeout is bounded; once established, the stream
    /// stays open until the server closes it or the consumer cancels.
    /// Idle detection is the consumer's responsibility.
    pub fn build_streaming_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        self.builder_with_tls()?
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    fn builder_with_tls(&self) -> Result<reqwest::ClientBuilder, crate::error::Error> {
        let mut builder = reqwest::Client::builder().user_agent("adcon/0.1.0");

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path).map_err(|e| {
                    crate::error::Error::Tls(format!("failed to read CA cert: {e}"))
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| crate::error::Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        Ok(builder)
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}
