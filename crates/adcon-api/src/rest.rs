// REST client for the console's request/response endpoints.
//
// Wraps `reqwest::Client` with console-specific URL construction, session
// cookie authentication, and error-body mapping. The SSE computer stream
// lives in `sse` -- this module covers everything request/response shaped:
// login, user lookup, and LAPS password retrieval.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── Response types ───────────────────────────────────────────────────

/// A directory user as returned by the lookup endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    /// sAMAccountName.
    pub account_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub distinguished_name: String,
    /// objectGUID, when the backend exposes it.
    #[serde(default)]
    pub guid: Option<Uuid>,
    pub enabled: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub mail: Option<String>,
}

/// A retrieved LAPS password for one computer.
#[derive(Debug, Clone, Deserialize)]
pub struct LapsResponse {
    pub password: SecretString,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Error body the backend sends on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(serde::Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

// ── RestClient ───────────────────────────────────────────────────────

/// HTTP client for the console REST API.
///
/// Authentication is session-cookie based: [`login`](Self::login) stores the
/// cookie in the shared jar, after which every request (including the SSE
/// stream, which shares the jar) is authenticated.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl RestClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (session auth requires cookies).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    /// The console base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path: `{base}/api/{path}`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("api/{path}"))?)
    }

    /// The SSE endpoint delivering the computer inventory.
    pub fn computers_stream_url(&self) -> Result<Url, Error> {
        self.api_url("computers/stream")
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Authenticate and store the session cookie in the shared jar.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.api_url("login")?;
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&LoginRequest {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let message = error_message(resp).await;
            return Err(Error::Authentication { message });
        }
        Err(Error::Api {
            message: error_message(resp).await,
            status: status.as_u16(),
        })
    }

    /// End the session.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.api_url("logout")?;
        debug!("POST {}", url);
        self.http
            .post(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(())
    }

    // ── Directory lookups ────────────────────────────────────────────

    /// Search directory users by name fragment or account name.
    pub async fn search_users(&self, query: &str) -> Result<Vec<UserRecord>, Error> {
        let mut url = self.api_url("users")?;
        url.query_pairs_mut().append_pair("q", query);
        self.get_json(url).await
    }

    /// Fetch a single user by account name or distinguished name.
    pub async fn get_user(&self, identifier: &str) -> Result<UserRecord, Error> {
        let url = self.api_url(&format!("users/{identifier}"))?;
        self.get_json(url).await
    }

    // ── LAPS ─────────────────────────────────────────────────────────

    /// Retrieve the local-administrator password for one computer.
    pub async fn laps_password(&self, computer: &str) -> Result<LapsResponse, Error> {
        let url = self.api_url(&format!("computers/{computer}/laps"))?;
        self.get_json(url).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body, mapping error statuses.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::SessionExpired);
        }
        if !status.is_success() {
            return Err(Error::Api {
                message: error_message(resp).await,
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Distinguish a tripped request timeout from other transport failures.
    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(e)
        }
    }
}

/// Extract the backend's `{"message": ...}` error body, falling back to the
/// raw text when it isn't JSON.
async fn error_message(resp: reqwest::Response) -> String {
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.is_empty() => "no error detail provided".to_owned(),
        Err(_) => body,
    }
}
