//! Account credentials for the amoCRM API.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::error::AuthError;

/// An amoCRM login (an email address) and the API key from the user profile.
///
/// The format is checked on construction, so a `Credentials` value is always
/// usable for the login exchange.
#[derive(Debug, Clone)]
pub struct Credentials {
    login: String,
    api_key: SecretString,
}

impl Credentials {
    pub fn new(login: &str, api_key: &str) -> Result<Self, AuthError> {
        if login.is_empty() {
            return Err(AuthError::InvalidCredentialsFormat {
                reason: "login is empty",
            });
        }
        if api_key.is_empty() {
            return Err(AuthError::InvalidCredentialsFormat {
                reason: "API key is empty",
            });
        }
        if !login.contains('@') {
            return Err(AuthError::InvalidCredentialsFormat {
                reason: "login is not an email address",
            });
        }
        Ok(Self {
            login: login.to_string(),
            api_key: SecretString::from(api_key.to_string()),
        })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Account subdomain: the part of the login before `'@'`.
    pub fn subdomain(&self) -> &str {
        self.login.split('@').next().unwrap_or_default()
    }

    /// Body of the login request.
    pub(crate) fn auth_payload(&self) -> Value {
        json!({
            "USER_LOGIN": self.login,
            "USER_HASH": self.api_key.expose_secret(),
        })
    }
}
