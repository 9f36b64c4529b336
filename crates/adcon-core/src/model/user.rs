use serde::Serialize;
use uuid::Uuid;

use adcon_api::rest::UserRecord;

/// A directory user from the lookup endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryUser {
    /// sAMAccountName.
    pub account_name: String,
    pub display_name: Option<String>,
    pub distinguished_name: String,
    /// objectGUID, when the backend exposes it.
    pub guid: Option<Uuid>,
    pub enabled: bool,
    pub locked: bool,
    pub mail: Option<String>,
}

impl From<UserRecord> for DirectoryUser {
    fn from(record: UserRecord) -> Self {
        Self {
            account_name: record.account_name,
            display_name: record.display_name,
            distinguished_name: record.distinguished_name,
            guid: record.guid,
            enabled: record.enabled,
            locked: record.locked,
            mail: record.mail,
        }
    }
}
