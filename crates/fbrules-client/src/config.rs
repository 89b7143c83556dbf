//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{RulesError, RulesResult};

/// Default Firebase Rules API endpoint.
pub const DEFAULT_RULES_ENDPOINT: &str = "https://firebaserules.googleapis.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Environment variables consulted for the project id, in order.
const PROJECT_ID_VARS: [&str; 3] = ["GCP_PROJECT_ID", "FIREBASE_PROJECT_ID", "GOOGLE_CLOUD_PROJECT"];

/// Options shared by the rules clients.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    /// Realtime Database URL (required by the Database Rules client)
    pub database_url: Option<String>,
    /// Firebase project ID (falls back to the service account's project)
    pub project_id: Option<String>,
    /// Default storage bucket (required for storage releases)
    pub storage_bucket: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Firebase Rules API endpoint
    pub rules_endpoint: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            project_id: None,
            storage_bucket: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            rules_endpoint: DEFAULT_RULES_ENDPOINT.to_string(),
        }
    }
}

impl RulesConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let project_id = PROJECT_ID_VARS.iter().find_map(|var| non_empty_var(var));

        let timeout_secs: u64 = std::env::var("FIREBASE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let connect_timeout_secs: u64 = std::env::var("FIREBASE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);

        Self {
            database_url: non_empty_var("FIREBASE_DATABASE_URL"),
            project_id,
            storage_bucket: non_empty_var("FIREBASE_STORAGE_BUCKET"),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            rules_endpoint: non_empty_var("FIREBASE_RULES_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_RULES_ENDPOINT.to_string()),
        }
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = Some(bucket.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rules_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rules_endpoint = endpoint.into();
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// A validated Realtime Database location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUrl {
    /// `scheme://host[:port]`
    pub origin: String,
    /// The `ns` query parameter, which selects the database on an emulator.
    pub namespace: Option<String>,
}

/// Validate a Realtime Database URL.
///
/// Production URLs must be HTTPS on `*.firebaseio.com` or
/// `*.firebasedatabase.app`. Plain HTTP is accepted only for a local emulator.
/// The path and all query parameters other than `ns` are dropped.
pub fn validate_database_url(raw: &str) -> RulesResult<DatabaseUrl> {
    let parsed = Url::parse(raw).map_err(|e| {
        RulesError::config_error(format!("Invalid database URL: \"{}\": {}", raw, e))
    })?;

    let host = parsed.host_str().unwrap_or_default();
    let valid = match parsed.scheme() {
        "https" => host.ends_with(".firebaseio.com") || host.ends_with(".firebasedatabase.app"),
        "http" => host == "localhost" || host == "127.0.0.1",
        _ => false,
    };
    if !valid {
        return Err(RulesError::config_error(format!(
            "Invalid database URL: \"{}\". Database URL must be a valid URL to a \
             Firebase Realtime Database instance.",
            raw
        )));
    }

    let origin = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };
    let namespace = parsed
        .query_pairs()
        .find(|(key, _)| key == "ns")
        .map(|(_, value)| value.into_owned())
        .filter(|ns| !ns.is_empty());

    Ok(DatabaseUrl { origin, namespace })
}
