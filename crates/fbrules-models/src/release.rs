//! Release models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource_name::{release_resource, ruleset_resource};
use crate::ruleset::parse_timestamp;

/// Point-in-time snapshot of a release: a named pointer to a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesRelease {
    name: String,
    ruleset_id: String,
    create_time: String,
    update_time: String,
}

impl RulesRelease {
    pub fn new(
        name: impl Into<String>,
        ruleset_id: impl Into<String>,
        create_time: impl Into<String>,
        update_time: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ruleset_id: ruleset_id.into(),
            create_time: create_time.into(),
            update_time: update_time.into(),
        }
    }

    /// Short release name (e.g. `cloud.firestore`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short id of the ruleset this release points at.
    pub fn ruleset_id(&self) -> &str {
        &self.ruleset_id
    }

    pub fn create_time(&self) -> &str {
        &self.create_time
    }

    pub fn update_time(&self) -> &str {
        &self.update_time
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.create_time)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.update_time)
    }
}

/// Filter for release listings.
///
/// Each set field becomes one `key=value` term of the API filter
/// expression; terms are joined with spaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFilter {
    /// Short release name, or a prefix ending in `*`.
    pub name: Option<String>,
    /// Short ruleset id.
    pub ruleset_id: Option<String>,
    pub test_suite_name: Option<String>,
}

impl ReleaseFilter {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ruleset_id(mut self, ruleset_id: impl Into<String>) -> Self {
        self.ruleset_id = Some(ruleset_id.into());
        self
    }

    pub fn with_test_suite_name(mut self, test_suite_name: impl Into<String>) -> Self {
        self.test_suite_name = Some(test_suite_name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.ruleset_id.is_none() && self.test_suite_name.is_none()
    }

    /// Render as the API filter expression for `project_id`, or `None` when
    /// no field is set.
    pub fn to_expression(&self, project_id: &str) -> Option<String> {
        let mut terms = Vec::new();
        if let Some(name) = &self.name {
            terms.push(format!("name={}", release_resource(project_id, name)));
        }
        if let Some(id) = &self.ruleset_id {
            terms.push(format!("rulesetName={}", ruleset_resource(project_id, id)));
        }
        if let Some(suite) = &self.test_suite_name {
            terms.push(format!("testSuiteName={}", suite));
        }
        (!terms.is_empty()).then(|| terms.join(" "))
    }
}

/// One page of a release listing.
#[derive(Debug, Clone, Default)]
pub struct ReleasePage {
    pub releases: Vec<RulesRelease>,
    /// Token for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_renders_nothing() {
        let filter = ReleaseFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.to_expression("p1"), None);
    }

    #[test]
    fn test_filter_expression_uses_full_names() {
        let filter = ReleaseFilter::default()
            .with_name("cloud.firestore")
            .with_ruleset_id("abc");
        assert_eq!(
            filter.to_expression("p1").unwrap(),
            "name=projects/p1/releases/cloud.firestore rulesetName=projects/p1/rulesets/abc"
        );
    }

    #[test]
    fn test_filter_expression_test_suite_only() {
        let filter = ReleaseFilter::default().with_test_suite_name("suite-1");
        assert_eq!(filter.to_expression("p1").unwrap(), "testSuiteName=suite-1");
    }

    #[test]
    fn test_release_timestamps() {
        let release = RulesRelease::new(
            "live",
            "abc",
            "2024-01-01T00:00:00Z",
            "2024-01-02T00:00:00Z",
        );
        assert!(release.updated_at().unwrap() > release.created_at().unwrap());
    }

    #[test]
    fn test_release_serializes_camel_case() {
        let release = RulesRelease::new("live", "abc", "t1", "t2");
        let json = serde_json::to_value(&release).unwrap();
        assert_eq!(json["rulesetId"], "abc");
        assert_eq!(json["updateTime"], "t2");
    }
}
