//! Credentials attached to every rules request.

use std::sync::Arc;

use async_trait::async_trait;
use gcp_auth::CustomServiceAccount;

use crate::error::{RulesError, RulesResult, TransportError};
use crate::token_cache::TokenCache;

/// Source of bearer tokens for outgoing requests.
#[async_trait]
pub trait Credential: Send + Sync {
    async fn access_token(&self) -> Result<String, TransportError>;
}

/// A fixed bearer token (emulators, tests, externally managed tokens).
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl Credential for StaticToken {
    async fn access_token(&self) -> Result<String, TransportError> {
        Ok(self.0.clone())
    }
}

/// Service account credentials loaded from `GOOGLE_APPLICATION_CREDENTIALS`.
pub struct ServiceAccount {
    project_id: Option<String>,
    tokens: Arc<TokenCache>,
}

impl ServiceAccount {
    pub fn from_env() -> RulesResult<Self> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            RulesError::config_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => {
                let project_id = sa.project_id().map(str::to_string);
                Ok(Self {
                    project_id,
                    tokens: Arc::new(TokenCache::for_provider(Arc::new(sa))),
                })
            }
            None => Err(RulesError::config_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Project the service account belongs to, used when no project id is
    /// configured explicitly.
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn credential(&self) -> Arc<dyn Credential> {
        self.tokens.clone()
    }
}
