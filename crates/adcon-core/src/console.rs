//! High-level console facade.
//!
//! `Console` ties the pieces together: it builds the REST and streaming
//! HTTP clients from one [`ConsoleConfig`] (shared cookie jar, so the
//! stream reuses the REST session), owns the [`ComputerListLoader`], and
//! maps API errors into [`CoreError`] at the operation boundary.

use tracing::info;

use adcon_api::transport::{TlsMode, TransportConfig};
use adcon_api::RestClient;

use crate::config::{ConsoleConfig, TlsVerification};
use crate::error::CoreError;
use crate::loader::ComputerListLoader;
use crate::model::{DirectoryUser, LapsPassword};

/// Connected console session.
///
/// Construct with [`connect`](Self::connect), which authenticates and
/// verifies the session before returning. All methods are `&self`; the
/// facade is cheap to share behind an `Arc` if a consumer needs to.
pub struct Console {
    rest: RestClient,
    loader: ComputerListLoader,
}

impl Console {
    /// Connect and authenticate against the console backend.
    pub async fn connect(config: &ConsoleConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: config.timeout,
            cookie_jar: None,
        }
        .with_cookie_jar();

        let rest = RestClient::new(config.url.clone(), &transport)?;
        rest.login(&config.username, &config.password).await?;
        info!(url = %config.url, username = %config.username, "Authenticated");

        // The streaming client shares the jar, so the stream request
        // carries the session cookie from the login above.
        let streaming = transport.build_streaming_client()?;
        let loader = ComputerListLoader::new(
            streaming,
            rest.computers_stream_url()?,
            config.idle_timeout,
        );

        Ok(Self { rest, loader })
    }

    /// The streaming computer-list loader.
    pub fn computer_loader(&self) -> &ComputerListLoader {
        &self.loader
    }

    /// End the backend session. Best effort; the session cookie expires
    /// server-side regardless.
    pub async fn logout(&self) -> Result<(), CoreError> {
        self.loader.cancel();
        self.rest.logout().await?;
        Ok(())
    }

    /// Search directory users by name fragment or account name.
    pub async fn search_users(&self, query: &str) -> Result<Vec<DirectoryUser>, CoreError> {
        let records = self.rest.search_users(query).await?;
        Ok(records.into_iter().map(DirectoryUser::from).collect())
    }

    /// Look up one user by account name.
    pub async fn get_user(&self, identifier: &str) -> Result<DirectoryUser, CoreError> {
        match self.rest.get_user(identifier).await {
            Ok(record) => Ok(DirectoryUser::from(record)),
            Err(e) if e.is_not_found() => Err(CoreError::NotFound {
                entity_type: "User".to_owned(),
                identifier: identifier.to_owned(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Retrieve the LAPS local-administrator password for one computer.
    pub async fn laps_password(&self, computer: &str) -> Result<LapsPassword, CoreError> {
        match self.rest.laps_password(computer).await {
            Ok(resp) => Ok(LapsPassword::from_response(computer, resp)),
            Err(e) if e.is_not_found() => Err(CoreError::NotFound {
                entity_type: "Computer".to_owned(),
                identifier: computer.to_owned(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Label for login prompts and status lines: `user@host`.
pub fn session_label(config: &ConsoleConfig) -> String {
    let host = config.url.host_str().unwrap_or("console");
    format!("{}@{}", config.username, host)
}
