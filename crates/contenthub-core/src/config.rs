use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Connection credentials for the hosted document-store project.
///
/// All six values must be present; a partially configured project behaves
/// the same as an unconfigured one.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub sender_id: String,
    pub app_id: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StoreConfig")
            .field("api_key", &"[REDACTED]")
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("sender_id", &self.sender_id)
            .field("app_id", &self.app_id)
            .finish()
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: required_trimmed(&lookup, "CONTENTHUB_API_KEY")?,
            auth_domain: required_trimmed(&lookup, "CONTENTHUB_AUTH_DOMAIN")?,
            project_id: required_trimmed(&lookup, "CONTENTHUB_PROJECT_ID")?,
            storage_bucket: required_trimmed(&lookup, "CONTENTHUB_STORAGE_BUCKET")?,
            sender_id: required_trimmed(&lookup, "CONTENTHUB_SENDER_ID")?,
            app_id: required_trimmed(&lookup, "CONTENTHUB_APP_ID")?,
        })
    }
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
