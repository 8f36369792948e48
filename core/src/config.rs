//! Client configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config
//! pointing at `https://<subdomain>.amocrm.ru`.
//!
//! ```toml
//! base_url = "http://127.0.0.1:3000"   # optional override
//!
//! [endpoints]
//! leads = "/api/v2/leads"
//!
//! [transport]
//! timeout_secs = 30
//! session_file = "cookie.json"
//!
//! [[rules]]
//! path = "contacts/id"
//! type = "integer"
//! allowed = "any"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::rules::{RuleTable, ValidationRule};

const DEFAULT_DOMAIN: &str = "amocrm.ru";
const DEFAULT_USER_AGENT: &str = "amoCRM-API-client/1.0";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Full base URL; when unset it is derived from the login's subdomain.
    pub base_url: Option<String>,
    pub domain: String,
    pub endpoints: Endpoints,
    pub transport: TransportConfig,
    /// Extra rules layered over the built-in table.
    pub rules: Vec<ValidationRule>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            domain: DEFAULT_DOMAIN.to_string(),
            endpoints: Endpoints::default(),
            transport: TransportConfig::default(),
            rules: Vec::new(),
        }
    }
}

/// Paths of the API methods, relative to the account base URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Endpoints {
    pub auth: String,
    pub leads: String,
    pub tasks: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth: "/private/api/auth.php?type=json".to_string(),
            leads: "/api/v2/leads".to_string(),
            tasks: "/api/v2/tasks".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub user_agent: String,
    /// Whole-request timeout; no timeout when unset.
    pub timeout_secs: Option<u64>,
    /// Where the session cookies are kept between runs.
    pub session_file: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
            session_file: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, path) in [
            ("auth", &self.endpoints.auth),
            ("leads", &self.endpoints.leads),
            ("tasks", &self.endpoints.tasks),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "endpoint `{name}` must start with '/', got `{path}`"
                )));
            }
        }
        if self.domain.is_empty() && self.base_url.is_none() {
            return Err(ConfigError::Validation(
                "either `domain` or `base_url` must be set".to_string(),
            ));
        }
        if self.transport.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "`transport.timeout_secs` must be positive".to_string(),
            ));
        }
        if let Some(rule) = self.rules.iter().find(|r| r.path.is_empty()) {
            return Err(ConfigError::Validation(format!("rule with empty path: {rule:?}")));
        }
        Ok(())
    }

    /// Base URL for the account `subdomain`.
    pub fn base_url_for(&self, subdomain: &str) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{subdomain}.{}", self.domain),
        }
    }

    /// The built-in rule table with the configured rules layered over it.
    pub fn rule_table(&self) -> RuleTable {
        RuleTable::amocrm().extended(self.rules.iter().cloned())
    }
}
