//! Application credentials and their well-formedness rules.

use std::fmt;

use crate::error::Error;

/// Application identifier plus master key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: String,
    secret: String,
}

impl Credentials {
    /// Validates and wraps a credential pair. No network call is made.
    pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Result<Self, Error> {
        let app_id = app_id.into();
        let secret = secret.into();

        if !is_valid_app_id(&app_id) {
            return Err(Error::InvalidCredentials(format!(
                "malformed application ID {app_id:?}"
            )));
        }
        if !is_valid_master_key(&secret) {
            return Err(Error::InvalidCredentials("malformed master key".into()));
        }

        Ok(Self { app_id, secret })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Application IDs are hex strings or UUIDs: letters, digits and `-`.
pub fn is_valid_app_id(app_id: &str) -> bool {
    !app_id.is_empty() && app_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Master keys are plain ASCII alphanumerics.
pub fn is_valid_master_key(secret: &str) -> bool {
    !secret.is_empty() && secret.chars().all(|c| c.is_ascii_alphanumeric())
}
