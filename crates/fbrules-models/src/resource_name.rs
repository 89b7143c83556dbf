//! Fully-qualified resource names used by the Firebase Rules API.
//!
//! The API addresses resources as `projects/{project}/rulesets/{id}` and
//! `projects/{project}/releases/{name}`. Release names may themselves contain
//! slashes (e.g. `firebase.storage/my-bucket`).

use thiserror::Error;

const PROJECTS: &str = "projects";
const RULESETS: &str = "rulesets";
const RELEASES: &str = "releases";

/// Error returned when a resource name does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} resource name: \"{name}\"")]
pub struct ResourceNameError {
    kind: &'static str,
    name: String,
}

impl ResourceNameError {
    fn new(kind: &'static str, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }

    /// The offending resource name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// `projects/{project_id}/rulesets/{ruleset_id}`
pub fn ruleset_resource(project_id: &str, ruleset_id: &str) -> String {
    format!("{}/{}/{}/{}", PROJECTS, project_id, RULESETS, ruleset_id)
}

/// `projects/{project_id}/releases/{release_name}`
pub fn release_resource(project_id: &str, release_name: &str) -> String {
    format!("{}/{}/{}/{}", PROJECTS, project_id, RELEASES, release_name)
}

/// Extract the short ruleset id from `projects/{p}/rulesets/{id}`.
pub fn ruleset_id_from_resource(name: &str) -> Result<&str, ResourceNameError> {
    short_name(name, RULESETS).ok_or_else(|| ResourceNameError::new("ruleset", name))
}

/// Extract the short release name from `projects/{p}/releases/{name}`.
pub fn release_name_from_resource(name: &str) -> Result<&str, ResourceNameError> {
    short_name(name, RELEASES).ok_or_else(|| ResourceNameError::new("release", name))
}

fn short_name<'a>(name: &'a str, collection: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(PROJECTS)?.strip_prefix('/')?;
    let (project, rest) = rest.split_once('/')?;
    if project.is_empty() {
        return None;
    }
    let id = rest.strip_prefix(collection)?.strip_prefix('/')?;
    (!id.is_empty()).then_some(id)
}
