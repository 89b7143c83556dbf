//! Realtime Database rules client.
//!
//! Reads and writes the single rules document of one database instance at
//! `{databaseURL}/.settings/rules.json`. The document is passed through as
//! raw text; this layer does not parse rule syntax.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use tracing::info;

use crate::config::{validate_database_url, DatabaseUrl, RulesConfig};
use crate::credential::{Credential, ServiceAccount};
use crate::error::{RulesError, RulesResult};
use crate::status::{ErrorCodes, DATABASE_RULES_ERRORS};
use crate::transport::{execute_request, HttpTransport, RequestBody};

pub const DATABASE_RULES_PATH: &str = "/.settings/rules.json";

/// Operation label used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesOperation {
    Get,
    Set,
}

impl RulesOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RulesOperation::Get => "Get",
            RulesOperation::Set => "Set",
        }
    }
}

impl fmt::Display for RulesOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for one database's rules endpoint.
#[derive(Clone)]
pub struct DatabaseRulesClient {
    transport: HttpTransport,
    namespace: Option<String>,
    errors: ErrorCodes,
}

impl DatabaseRulesClient {
    /// Create a client. Fails with a configuration error when the database
    /// URL is missing or invalid.
    pub fn new(config: &RulesConfig, credential: Arc<dyn Credential>) -> RulesResult<Self> {
        let db_url = Self::resolve_database_url(config)?;
        let transport = HttpTransport::new(db_url.origin, credential, config)?;

        Ok(Self {
            transport,
            namespace: db_url.namespace,
            errors: DATABASE_RULES_ERRORS,
        })
    }

    /// Create from environment variables and service account credentials.
    pub fn from_env() -> RulesResult<Self> {
        let config = RulesConfig::from_env();
        Self::resolve_database_url(&config)?;
        let account = ServiceAccount::from_env()?;
        Self::new(&config, account.credential())
    }

    fn resolve_database_url(config: &RulesConfig) -> RulesResult<DatabaseUrl> {
        let db_url = config
            .database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                RulesError::config_error(
                    "Database URL is required to access the Database Rules Service. \
                     Make sure to set the database_url option.",
                )
            })?;
        validate_database_url(db_url)
    }

    /// Replace the status-code table used for error messages.
    pub fn with_error_codes(mut self, errors: ErrorCodes) -> Self {
        self.errors = errors;
        self
    }

    /// Normalized database URL (`scheme://host[:port]`).
    pub fn database_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Emulator namespace sent as the `ns` query parameter, if configured.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Fetch the rules document as raw text.
    pub async fn get_rules(&self) -> RulesResult<String> {
        self.make_request(Method::GET, RulesOperation::Get, RequestBody::Empty)
            .await
    }

    /// Replace the rules document with `content`, sent verbatim.
    pub async fn set_rules(&self, content: impl Into<String>) -> RulesResult<()> {
        self.make_request(
            Method::PUT,
            RulesOperation::Set,
            RequestBody::Text(content.into()),
        )
        .await?;
        info!(database = %self.database_url(), "Updated database rules");
        Ok(())
    }

    async fn make_request(
        &self,
        method: Method,
        operation: RulesOperation,
        body: RequestBody,
    ) -> RulesResult<String> {
        let resource = self.database_url().to_string();
        let query: Vec<(&str, String)> = self
            .namespace
            .iter()
            .map(|ns| ("ns", ns.clone()))
            .collect();
        execute_request(
            match operation {
                RulesOperation::Get => "get_database_rules",
                RulesOperation::Set => "set_database_rules",
            },
            &resource,
            async {
                self.transport
                    .send(method, DATABASE_RULES_PATH, &query, body)
                    .await
                    .map_err(|source| RulesError::ApiCall {
                        message: format!(
                            "{} Database rules: {}",
                            operation,
                            self.errors.describe(&source)
                        ),
                        source,
                    })
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticToken;

    fn credential() -> Arc<dyn Credential> {
        Arc::new(StaticToken::new("owner"))
    }

    #[test]
    fn test_requires_database_url() {
        let err = DatabaseRulesClient::new(&RulesConfig::default(), credential())
            .err()
            .unwrap();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("Database URL is required"));
    }

    #[test]
    fn test_rejects_blank_database_url() {
        let config = RulesConfig::default().with_database_url("  ");
        assert!(DatabaseRulesClient::new(&config, credential()).is_err());
    }

    #[test]
    fn test_rejects_invalid_database_url() {
        let config = RulesConfig::default().with_database_url("https://example.com");
        let err = DatabaseRulesClient::new(&config, credential()).err().unwrap();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_normalizes_database_url() {
        let config = RulesConfig::default().with_database_url("https://my-db.firebaseio.com/");
        let client = DatabaseRulesClient::new(&config, credential()).unwrap();
        assert_eq!(client.database_url(), "https://my-db.firebaseio.com");
        assert!(client.namespace().is_none());
    }

    #[test]
    fn test_keeps_emulator_namespace() {
        let config = RulesConfig::default().with_database_url("http://localhost:9000/?ns=my-db");
        let client = DatabaseRulesClient::new(&config, credential()).unwrap();
        assert_eq!(client.database_url(), "http://localhost:9000");
        assert_eq!(client.namespace(), Some("my-db"));
    }

    #[test]
    fn test_operation_labels() {
        assert_eq!(RulesOperation::Get.to_string(), "Get");
        assert_eq!(RulesOperation::Set.as_str(), "Set");
    }
}
