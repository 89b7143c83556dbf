//! Firebase Rules API client.
//!
//! Manages rulesets and releases for one Firebase project across the
//! rules-consuming services (Cloud Firestore, Cloud Storage). All paths are
//! relative to `{endpoint}/v1/projects/{project_id}/`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use fbrules_models::resource_name::{
    release_name_from_resource, release_resource, ruleset_id_from_resource, ruleset_resource,
};
use fbrules_models::{
    ReleaseFilter, ReleasePage, RulesRelease, Ruleset, RulesetFile, RulesetLoader, RulesetPage,
};

use crate::config::RulesConfig;
use crate::credential::{Credential, ServiceAccount};
use crate::error::{RulesError, RulesResult};
use crate::status::{ErrorCodes, FIREBASE_RULES_ERRORS};
use crate::transport::{decode_json, execute_request, HttpTransport, RequestBody};
use crate::types::{
    CreateRulesetRequest, ListReleasesResponse, ListRulesetsResponse, ReleaseBody,
    ReleaseRequest, ReleaseResource, RulesetResource, RulesetSummary, Source,
};

pub const RULES_API_VERSION: &str = "v1";

/// Largest page size accepted by the list endpoints.
pub const MAX_PAGE_SIZE: u32 = 100;

const RELEASE_LABEL: &str = "Release";
const RULESET_LABEL: &str = "Ruleset ID";

/// A rules-consuming service whose release is managed by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulesService {
    Firestore,
    Storage,
}

impl RulesService {
    /// Logical service key (`firestore`, `storage`).
    pub fn key(&self) -> &'static str {
        match self {
            RulesService::Firestore => "firestore",
            RulesService::Storage => "storage",
        }
    }

    /// Release-name prefix used by the backend.
    pub fn release_prefix(&self) -> &'static str {
        match self {
            RulesService::Firestore => "cloud.firestore",
            RulesService::Storage => "firebase.storage",
        }
    }
}

impl FromStr for RulesService {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firestore" => Ok(RulesService::Firestore),
            "storage" => Ok(RulesService::Storage),
            other => Err(RulesError::config_error(format!(
                "Unsupported rules service: \"{}\". Expected \"firestore\" or \"storage\".",
                other
            ))),
        }
    }
}

impl fmt::Display for RulesService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Client for the Firebase Rules API of one project.
#[derive(Clone)]
pub struct FirebaseRulesClient {
    transport: HttpTransport,
    project_id: String,
    storage_bucket: Option<String>,
    errors: ErrorCodes,
}

impl FirebaseRulesClient {
    /// Create a client. Fails with a configuration error when no project id
    /// is configured.
    pub fn new(config: &RulesConfig, credential: Arc<dyn Credential>) -> RulesResult<Self> {
        let project_id = config
            .project_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                RulesError::config_error(
                    "Project ID is required to access the Firebase Rules Service. Either \
                     set the project_id option, or use service account credentials. \
                     Alternatively, set the GOOGLE_CLOUD_PROJECT environment variable.",
                )
            })?
            .to_string();

        let base_url = format!(
            "{}/{}/projects/{}/",
            config.rules_endpoint.trim_end_matches('/'),
            RULES_API_VERSION,
            project_id
        );
        let transport = HttpTransport::new(base_url, credential, config)?;

        Ok(Self {
            transport,
            project_id,
            storage_bucket: config.storage_bucket.clone(),
            errors: FIREBASE_RULES_ERRORS,
        })
    }

    /// Create a client authenticated as `account`, inferring the project id
    /// from the account when the config does not set one.
    pub fn with_service_account(config: &RulesConfig, account: &ServiceAccount) -> RulesResult<Self> {
        let mut config = config.clone();
        if config.project_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            config.project_id = account.project_id().map(str::to_string);
        }
        Self::new(&config, account.credential())
    }

    /// Create from environment variables and service account credentials.
    pub fn from_env() -> RulesResult<Self> {
        let config = RulesConfig::from_env();
        let account = ServiceAccount::from_env()?;
        Self::with_service_account(&config, &account)
    }

    /// Replace the status-code table used for error messages.
    pub fn with_error_codes(mut self, errors: ErrorCodes) -> Self {
        self.errors = errors;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    // =========================================================================
    // Rulesets
    // =========================================================================

    /// Get a ruleset with its files.
    pub async fn get_ruleset(&self, ruleset_id: &str) -> RulesResult<Ruleset> {
        require_non_empty(ruleset_id, RULESET_LABEL)?;
        let path = format!("rulesets/{}", ruleset_id);
        let resource: RulesetResource = self
            .make_request(
                "get_ruleset",
                Method::GET,
                &path,
                &[],
                ruleset_id,
                RULESET_LABEL,
                RequestBody::Empty,
            )
            .await?;
        ruleset_from_resource(resource)
    }

    /// Create a ruleset from `files`. The backend assigns the id and
    /// creation time.
    pub async fn create_ruleset(&self, files: Vec<RulesetFile>) -> RulesResult<Ruleset> {
        if files.is_empty() {
            return Err(RulesError::config_error(
                "A ruleset must contain at least one file.",
            ));
        }

        let body = RequestBody::json(&CreateRulesetRequest {
            source: Source { files },
        })
        .map_err(|e| RulesError::config_error(format!("Failed to encode ruleset: {}", e)))?;

        let resource: RulesetResource = self
            .make_request(
                "create_ruleset",
                Method::POST,
                "rulesets",
                &[],
                "create",
                RULESET_LABEL,
                body,
            )
            .await?;
        let ruleset = ruleset_from_resource(resource)?;
        info!(ruleset_id = %ruleset.ruleset_id(), "Created ruleset");
        Ok(ruleset)
    }

    pub async fn delete_ruleset(&self, ruleset_id: &str) -> RulesResult<()> {
        require_non_empty(ruleset_id, RULESET_LABEL)?;
        let path = format!("rulesets/{}", ruleset_id);
        let _: serde_json::Value = self
            .make_request(
                "delete_ruleset",
                Method::DELETE,
                &path,
                &[],
                ruleset_id,
                RULESET_LABEL,
                RequestBody::Empty,
            )
            .await?;
        info!(ruleset_id = %ruleset_id, "Deleted ruleset");
        Ok(())
    }

    /// List ruleset metadata. Returned rulesets have unloaded files; use
    /// `Ruleset::files` with this client to fetch them.
    pub async fn list_rulesets(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> RulesResult<RulesetPage> {
        let query = page_query(page_size, page_token)?;
        let list: ListRulesetsResponse = self
            .make_request(
                "list_rulesets",
                Method::GET,
                "rulesets",
                &query,
                "list",
                RULESET_LABEL,
                RequestBody::Empty,
            )
            .await?;

        let rulesets = list
            .rulesets
            .into_iter()
            .map(ruleset_from_summary)
            .collect::<RulesResult<Vec<_>>>()?;

        debug!(count = rulesets.len(), "Listed rulesets");
        Ok(RulesetPage {
            rulesets,
            next_page_token: non_empty(list.next_page_token),
        })
    }

    // =========================================================================
    // Releases
    // =========================================================================

    pub async fn get_rules_release(&self, name: &str) -> RulesResult<RulesRelease> {
        require_non_empty(name, RELEASE_LABEL)?;
        let path = format!("releases/{}", name);
        let resource: ReleaseResource = self
            .make_request(
                "get_rules_release",
                Method::GET,
                &path,
                &[],
                name,
                RELEASE_LABEL,
                RequestBody::Empty,
            )
            .await?;
        release_from_resource(resource)
    }

    /// Create release `name` pointing at `ruleset_id`.
    pub async fn create_rules_release(
        &self,
        name: &str,
        ruleset_id: &str,
    ) -> RulesResult<RulesRelease> {
        let body = self.release_body(name, ruleset_id)?;
        let resource: ReleaseResource = self
            .make_request(
                "create_rules_release",
                Method::POST,
                "releases",
                &[],
                name,
                RELEASE_LABEL,
                body,
            )
            .await?;
        let release = release_from_resource(resource)?;
        info!(release = %release.name(), ruleset_id = %release.ruleset_id(), "Created release");
        Ok(release)
    }

    /// Point existing release `name` at `ruleset_id`.
    pub async fn update_rules_release(
        &self,
        name: &str,
        ruleset_id: &str,
    ) -> RulesResult<RulesRelease> {
        let path = format!("releases/{}", name);
        let body = self.release_body(name, ruleset_id)?;
        let resource: ReleaseResource = self
            .make_request(
                "update_rules_release",
                Method::PATCH,
                &path,
                &[],
                name,
                RELEASE_LABEL,
                body,
            )
            .await?;
        let release = release_from_resource(resource)?;
        info!(release = %release.name(), ruleset_id = %release.ruleset_id(), "Updated release");
        Ok(release)
    }

    pub async fn delete_rules_release(&self, name: &str) -> RulesResult<()> {
        require_non_empty(name, RELEASE_LABEL)?;
        let path = format!("releases/{}", name);
        let _: serde_json::Value = self
            .make_request(
                "delete_rules_release",
                Method::DELETE,
                &path,
                &[],
                name,
                RELEASE_LABEL,
                RequestBody::Empty,
            )
            .await?;
        info!(release = %name, "Deleted release");
        Ok(())
    }

    pub async fn list_rules_releases(
        &self,
        filter: &ReleaseFilter,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> RulesResult<ReleasePage> {
        let mut query = page_query(page_size, page_token)?;
        if let Some(expression) = filter.to_expression(&self.project_id) {
            query.push(("filter", expression));
        }

        let list: ListReleasesResponse = self
            .make_request(
                "list_rules_releases",
                Method::GET,
                "releases",
                &query,
                "list",
                RELEASE_LABEL,
                RequestBody::Empty,
            )
            .await?;

        let releases = list
            .releases
            .into_iter()
            .map(release_from_resource)
            .collect::<RulesResult<Vec<_>>>()?;

        debug!(count = releases.len(), "Listed releases");
        Ok(ReleasePage {
            releases,
            next_page_token: non_empty(list.next_page_token),
        })
    }

    // =========================================================================
    // Service-level rules
    // =========================================================================

    /// Release name for `service`. Storage releases are per bucket and
    /// require a configured storage bucket.
    pub fn release_name_for_service(&self, service: RulesService) -> RulesResult<String> {
        let base_name = service.release_prefix();
        match service {
            RulesService::Storage => {
                let bucket = self
                    .storage_bucket
                    .as_deref()
                    .filter(|b| !b.trim().is_empty())
                    .ok_or_else(|| {
                        RulesError::config_error(
                            "Unable to determine the storage bucket to use. \
                             Make sure to set the storage_bucket option.",
                        )
                    })?;
                Ok(format!("{}/{}", base_name, bucket))
            }
            RulesService::Firestore => Ok(base_name.to_string()),
        }
    }

    /// Ruleset currently released for `service`, with files loaded.
    pub async fn get_rules(&self, service: RulesService) -> RulesResult<Ruleset> {
        let release_name = self.release_name_for_service(service)?;
        let release = self.get_rules_release(&release_name).await?;
        self.get_ruleset(release.ruleset_id()).await
    }

    /// Create a ruleset from `files` and release it for `service`.
    ///
    /// The existing release is updated; when the service has no release yet
    /// it is created.
    pub async fn set_rules(
        &self,
        service: RulesService,
        files: Vec<RulesetFile>,
    ) -> RulesResult<RulesRelease> {
        let release_name = self.release_name_for_service(service)?;
        let ruleset = self.create_ruleset(files).await?;

        match self
            .update_rules_release(&release_name, ruleset.ruleset_id())
            .await
        {
            Err(e) if e.http_status() == Some(404) => {
                debug!(release = %release_name, "Release not found, creating it");
                self.create_rules_release(&release_name, ruleset.ruleset_id())
                    .await
            }
            result => result,
        }
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn release_body(&self, name: &str, ruleset_id: &str) -> RulesResult<RequestBody> {
        require_non_empty(name, RELEASE_LABEL)?;
        require_non_empty(ruleset_id, RULESET_LABEL)?;
        RequestBody::json(&ReleaseRequest {
            release: ReleaseBody {
                name: release_resource(&self.project_id, name),
                ruleset_name: ruleset_resource(&self.project_id, ruleset_id),
            },
        })
        .map_err(|e| RulesError::config_error(format!("Failed to encode release: {}", e)))
    }

    #[allow(clippy::too_many_arguments)]
    async fn make_request<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        identifier: &str,
        label: &str,
        body: RequestBody,
    ) -> RulesResult<T> {
        execute_request(operation, identifier, async {
            let text = self
                .transport
                .send(method, path, query, body)
                .await
                .map_err(|source| RulesError::ApiCall {
                    message: format!(
                        "{} \"{}\": {}",
                        label,
                        identifier,
                        self.errors.describe(&source)
                    ),
                    source,
                })?;
            decode_json(&text).map_err(|e| {
                RulesError::invalid_response(format!("{} \"{}\": {}", label, identifier, e))
            })
        })
        .await
    }
}

#[async_trait]
impl RulesetLoader for FirebaseRulesClient {
    type Error = RulesError;

    async fn fetch_ruleset_files(&self, ruleset_id: &str) -> RulesResult<Vec<RulesetFile>> {
        let ruleset = self.get_ruleset(ruleset_id).await?;
        ruleset
            .loaded_files()
            .map(|files| files.to_vec())
            .ok_or_else(|| {
                RulesError::invalid_response(format!(
                    "{} \"{}\": response has no source files",
                    RULESET_LABEL, ruleset_id
                ))
            })
    }
}

fn ruleset_from_resource(resource: RulesetResource) -> RulesResult<Ruleset> {
    let id = ruleset_id_from_resource(&resource.name)
        .map_err(|e| RulesError::invalid_response(e.to_string()))?;
    Ok(Ruleset::new(
        id,
        resource.create_time,
        Some(resource.source.files),
    ))
}

fn ruleset_from_summary(summary: RulesetSummary) -> RulesResult<Ruleset> {
    let id = ruleset_id_from_resource(&summary.name)
        .map_err(|e| RulesError::invalid_response(e.to_string()))?;
    Ok(Ruleset::new(id, summary.create_time, None))
}

fn release_from_resource(resource: ReleaseResource) -> RulesResult<RulesRelease> {
    let name = release_name_from_resource(&resource.name)
        .map_err(|e| RulesError::invalid_response(e.to_string()))?;
    let ruleset_id = ruleset_id_from_resource(&resource.ruleset_name)
        .map_err(|e| RulesError::invalid_response(e.to_string()))?;
    Ok(RulesRelease::new(
        name,
        ruleset_id,
        resource.create_time,
        resource.update_time,
    ))
}

/// Reject an empty id or name before it turns `rulesets/{id}` into the
/// collection path.
fn require_non_empty(value: &str, label: &str) -> RulesResult<()> {
    if value.trim().is_empty() {
        return Err(RulesError::config_error(format!(
            "{} must be a non-empty string.",
            label
        )));
    }
    Ok(())
}

fn page_query(
    page_size: Option<u32>,
    page_token: Option<&str>,
) -> RulesResult<Vec<(&'static str, String)>> {
    let mut query = Vec::new();
    if let Some(size) = page_size {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(RulesError::config_error(format!(
                "Page size must be between 1 and {}, got {}.",
                MAX_PAGE_SIZE, size
            )));
        }
        query.push(("pageSize", size.to_string()));
    }
    if let Some(token) = page_token.filter(|t| !t.is_empty()) {
        query.push(("pageToken", token.to_string()));
    }
    Ok(query)
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}
