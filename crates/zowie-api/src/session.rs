// Per-client session state
//
// Credentials and whatever the device handed back on login. A session
// belongs to exactly one `ProtocolClient`; nothing here is global.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// Login credentials for one device.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Authentication state owned by a single client.
#[derive(Debug, Clone)]
pub struct Session {
    credentials: Credentials,
    token: Option<String>,
    last_authenticated: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: None,
            last_authenticated: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Opaque token returned by the last login, if the firmware issues one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn last_authenticated(&self) -> Option<DateTime<Utc>> {
        self.last_authenticated
    }

    pub(crate) fn record_login(&mut self, token: Option<String>) {
        self.token = token;
        self.last_authenticated = Some(Utc::now());
    }
}
