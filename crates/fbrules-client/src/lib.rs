//! REST clients for the Firebase Rules and Realtime Database Rules services.
//!
//! This crate provides:
//! - `DatabaseRulesClient` for reading/writing a database's rules document
//! - `FirebaseRulesClient` for ruleset and release management
//! - Service account authentication via gcp_auth with token caching
//! - Per-service status-code tables for error messages
//! - Tracing spans and metrics for every API call

pub mod config;
pub mod credential;
pub mod database_rules;
pub mod error;
pub mod firebase_rules;
pub mod metrics;
pub mod status;
pub mod token_cache;
pub mod transport;
pub mod types;

pub use config::{DatabaseUrl, RulesConfig};
pub use credential::{Credential, ServiceAccount, StaticToken};
pub use database_rules::DatabaseRulesClient;
pub use error::{RulesError, RulesResult, TransportError};
pub use firebase_rules::{FirebaseRulesClient, RulesService};
pub use status::{ErrorCodes, DATABASE_RULES_ERRORS, FIREBASE_RULES_ERRORS};

pub use fbrules_models::{
    ReleaseFilter, ReleasePage, RulesRelease, Ruleset, RulesetFile, RulesetFiles, RulesetLoader,
    RulesetPage,
};
