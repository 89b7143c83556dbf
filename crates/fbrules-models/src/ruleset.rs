//! Ruleset models.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named source file of a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetFile {
    name: String,
    content: String,
}

impl RulesetFile {
    /// Create a ruleset file, e.g. to pass to `create_ruleset`.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Name of this file (e.g. `firestore.rules`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rules-language source of this file.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Load state of a ruleset's files.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RulesetFiles {
    /// Files have not been fetched (e.g. the ruleset came from a listing).
    #[default]
    Unloaded,
    /// Files are present and never change for this instance.
    Loaded(Vec<RulesetFile>),
}

impl RulesetFiles {
    pub fn as_slice(&self) -> Option<&[RulesetFile]> {
        match self {
            RulesetFiles::Unloaded => None,
            RulesetFiles::Loaded(files) => Some(files),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, RulesetFiles::Loaded(_))
    }
}

impl From<Option<Vec<RulesetFile>>> for RulesetFiles {
    fn from(files: Option<Vec<RulesetFile>>) -> Self {
        files.map(RulesetFiles::Loaded).unwrap_or_default()
    }
}

/// Capability to fetch the files of a ruleset by id.
///
/// Implemented by the Firebase Rules client; a `Ruleset` never holds a
/// reference to it, the caller passes it to [`Ruleset::files`].
#[async_trait]
pub trait RulesetLoader: Send + Sync {
    type Error: Send;

    async fn fetch_ruleset_files(&self, ruleset_id: &str) -> Result<Vec<RulesetFile>, Self::Error>;
}

/// A ruleset stored by the Firebase Rules service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    ruleset_id: String,
    create_time: String,
    files: RulesetFiles,
}

impl Ruleset {
    /// Create a ruleset. `files` is `None` when the backend response did not
    /// include the source.
    pub fn new(
        ruleset_id: impl Into<String>,
        create_time: impl Into<String>,
        files: Option<Vec<RulesetFile>>,
    ) -> Self {
        Self {
            ruleset_id: ruleset_id.into(),
            create_time: create_time.into(),
            files: files.into(),
        }
    }

    /// Short ruleset id (the last segment of `projects/{p}/rulesets/{id}`).
    pub fn ruleset_id(&self) -> &str {
        &self.ruleset_id
    }

    /// Creation timestamp as returned by the backend (RFC 3339).
    pub fn create_time(&self) -> &str {
        &self.create_time
    }

    /// Creation timestamp parsed as UTC, if well-formed.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.create_time)
    }

    /// Current file load state.
    pub fn file_state(&self) -> &RulesetFiles {
        &self.files
    }

    /// Files if already loaded, without touching the network.
    pub fn loaded_files(&self) -> Option<&[RulesetFile]> {
        self.files.as_slice()
    }

    /// Files of this ruleset, fetched through `loader` on first access.
    ///
    /// Once loaded, later calls return the cached files and never call the
    /// loader again.
    pub async fn files<L>(&mut self, loader: &L) -> Result<&[RulesetFile], L::Error>
    where
        L: RulesetLoader + ?Sized,
    {
        if !self.files.is_loaded() {
            let files = loader.fetch_ruleset_files(&self.ruleset_id).await?;
            self.files = RulesetFiles::Loaded(files);
        }
        Ok(self.files.as_slice().unwrap_or(&[]))
    }
}

/// One page of a ruleset listing.
#[derive(Debug, Clone, Default)]
pub struct RulesetPage {
    pub rulesets: Vec<Ruleset>,
    /// Token for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
