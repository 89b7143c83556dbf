//! Resource models for the Firebase Rules and Database Rules services.
//!
//! This crate provides:
//! - Ruleset and ruleset file types with explicit file load state
//! - Release snapshots and release listing filters
//! - Fully-qualified resource name helpers
//! - The `RulesetLoader` capability used to load ruleset files on demand

pub mod release;
pub mod resource_name;
pub mod ruleset;

// Re-export common types
pub use release::{ReleaseFilter, ReleasePage, RulesRelease};
pub use resource_name::ResourceNameError;
pub use ruleset::{Ruleset, RulesetFile, RulesetFiles, RulesetLoader, RulesetPage};
