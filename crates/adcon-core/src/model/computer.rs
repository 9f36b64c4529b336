use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use adcon_api::rest::LapsResponse;
use adcon_api::sse::ComputerPayload;

/// A directory-joined computer as delivered by the stream.
#[derive(Debug, Clone)]
pub struct Computer {
    pub name: String,
    /// Account-enabled flag in the directory.
    pub enabled: bool,
    /// Local-administrator credential, when the backend has resolved one.
    pub password: Option<SecretString>,
}

impl Computer {
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl From<ComputerPayload> for Computer {
    fn from(payload: ComputerPayload) -> Self {
        Self {
            name: payload.name,
            enabled: payload.enabled,
            password: payload.password,
        }
    }
}

// Structured output (`-o json`/`yaml`) must never leak the credential, so
// serialization emits only its presence.
impl Serialize for Computer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Computer", 3)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("enabled", &self.enabled)?;
        s.serialize_field("has_password", &self.password.is_some())?;
        s.end()
    }
}

/// A retrieved LAPS password, paired with the computer it belongs to.
#[derive(Debug, Clone)]
pub struct LapsPassword {
    pub computer: String,
    pub password: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LapsPassword {
    pub fn from_response(computer: impl Into<String>, resp: LapsResponse) -> Self {
        Self {
            computer: computer.into(),
            password: resp.password,
            expires_at: resp.expires_at,
        }
    }
}
