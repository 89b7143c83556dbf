//! Firebase Rules API request/response types.

use serde::{Deserialize, Serialize};

use fbrules_models::RulesetFile;

/// `Source` message: the files of a ruleset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub files: Vec<RulesetFile>,
}

/// Ruleset resource as returned by `get` and `create`. The source is
/// required; a response without it is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetResource {
    /// `projects/{p}/rulesets/{id}`
    pub name: String,
    pub create_time: String,
    pub source: Source,
}

/// Ruleset entry of a list response (metadata only).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesetSummary {
    pub name: String,
    pub create_time: String,
}

/// Release resource as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResource {
    /// `projects/{p}/releases/{name}`
    pub name: String,
    /// `projects/{p}/rulesets/{id}`
    pub ruleset_name: String,
    pub create_time: String,
    pub update_time: String,
}

/// Body of `POST rulesets`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRulesetRequest {
    pub source: Source,
}

/// Body of `POST releases` and `PATCH releases/{name}`.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRequest {
    pub release: ReleaseBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseBody {
    pub name: String,
    pub ruleset_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRulesetsResponse {
    #[serde(default)]
    pub rulesets: Vec<RulesetSummary>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReleasesResponse {
    #[serde(default)]
    pub releases: Vec<ReleaseResource>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}
