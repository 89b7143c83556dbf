//! `fbrules` - manage Firebase security rules from the command line.
//!
//! ## Commands
//!
//! - `db`: get/set the Realtime Database rules document
//! - `ruleset`: get, create, delete and list rulesets
//! - `release`: get, create, update, delete and list releases
//! - `rules`: get/set the released rules of Firestore or Storage

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fbrules_client::{
    Credential, DatabaseRulesClient, FirebaseRulesClient, ReleaseFilter, RulesConfig,
    RulesRelease, RulesService, Ruleset, RulesetFile, ServiceAccount, StaticToken,
};

#[derive(Parser)]
#[command(name = "fbrules")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage Firebase security rules", long_about = None)]
struct Cli {
    /// Firebase project ID (defaults to the service account's project)
    #[arg(long, global = true, env = "FIREBASE_PROJECT_ID")]
    project: Option<String>,

    /// Realtime Database URL
    #[arg(long, global = true, env = "FIREBASE_DATABASE_URL")]
    database_url: Option<String>,

    /// Default storage bucket
    #[arg(long, global = true, env = "FIREBASE_STORAGE_BUCKET")]
    bucket: Option<String>,

    /// Use a fixed access token instead of service account credentials
    #[arg(long, global = true, env = "FIREBASE_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Realtime Database rules
    #[command(subcommand)]
    Db(DbCommand),

    /// Rulesets
    #[command(subcommand)]
    Ruleset(RulesetCommand),

    /// Releases
    #[command(subcommand)]
    Release(ReleaseCommand),

    /// Released rules of a service (firestore, storage)
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Subcommand)]
enum DbCommand {
    /// Print the rules document
    Get,
    /// Replace the rules document with the contents of a file
    Set { file: PathBuf },
}

#[derive(Args)]
struct PageArgs {
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long)]
    page_token: Option<String>,
}

#[derive(Subcommand)]
enum RulesetCommand {
    Get { ruleset_id: String },
    /// Create a ruleset from rules files (file names become ruleset file names)
    Create {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    Delete { ruleset_id: String },
    List {
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand)]
enum ReleaseCommand {
    Get { name: String },
    Create { name: String, ruleset_id: String },
    Update { name: String, ruleset_id: String },
    Delete { name: String },
    List {
        /// Release name or prefix ending in `*`
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        ruleset_id: Option<String>,
        #[arg(long)]
        test_suite: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Print the released ruleset of a service
    Get { service: String },
    /// Create a ruleset from files and release it for a service
    Set {
        service: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // JSON log lines with LOG_FORMAT=json, human-readable otherwise
    init_tracing(json_logs(std::env::var("LOG_FORMAT").ok().as_deref()));

    let cli = Cli::parse();

    let config = build_config(&cli);
    debug!(
        project = ?config.project_id,
        database_url = ?config.database_url,
        "Loaded configuration"
    );

    let output = match &cli.command {
        Commands::Db(command) => run_db(&cli, &config, command).await?,
        Commands::Ruleset(command) => run_ruleset(&firebase_client(&cli, &config)?, command).await?,
        Commands::Release(command) => run_release(&firebase_client(&cli, &config)?, command).await?,
        Commands::Rules(command) => run_rules(&firebase_client(&cli, &config)?, command).await?,
    };

    match output {
        Value::Null => {}
        Value::String(text) => println!("{}", text),
        other => println!("{}", serde_json::to_string_pretty(&other)?),
    }
    Ok(())
}

fn json_logs(log_format: Option<&str>) -> bool {
    log_format.map_or(false, |v| v.eq_ignore_ascii_case("json"))
}

fn init_tracing(use_json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fbrules=info,fbrules_client=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn build_config(cli: &Cli) -> RulesConfig {
    let mut config = RulesConfig::from_env();
    if let Some(project) = &cli.project {
        config = config.with_project_id(project);
    }
    if let Some(url) = &cli.database_url {
        config = config.with_database_url(url);
    }
    if let Some(bucket) = &cli.bucket {
        config = config.with_storage_bucket(bucket);
    }
    config
}

fn firebase_client(cli: &Cli, config: &RulesConfig) -> Result<FirebaseRulesClient> {
    let client = match &cli.token {
        Some(token) => FirebaseRulesClient::new(config, static_credential(token))?,
        None => {
            let account = ServiceAccount::from_env()?;
            FirebaseRulesClient::with_service_account(config, &account)?
        }
    };
    Ok(client)
}

fn database_client(cli: &Cli, config: &RulesConfig) -> Result<DatabaseRulesClient> {
    let credential = match &cli.token {
        Some(token) => static_credential(token),
        None => ServiceAccount::from_env()?.credential(),
    };
    Ok(DatabaseRulesClient::new(config, credential)?)
}

fn static_credential(token: &str) -> Arc<dyn Credential> {
    Arc::new(StaticToken::new(token))
}

async fn run_db(cli: &Cli, config: &RulesConfig, command: &DbCommand) -> Result<Value> {
    let client = database_client(cli, config)?;
    match command {
        DbCommand::Get => Ok(Value::String(client.get_rules().await?)),
        DbCommand::Set { file } => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            client.set_rules(content).await?;
            info!("Database rules updated");
            Ok(Value::Null)
        }
    }
}

async fn run_ruleset(client: &FirebaseRulesClient, command: &RulesetCommand) -> Result<Value> {
    match command {
        RulesetCommand::Get { ruleset_id } => {
            Ok(ruleset_json(&client.get_ruleset(ruleset_id).await?))
        }
        RulesetCommand::Create { files } => {
            let files = read_ruleset_files(files)?;
            Ok(ruleset_json(&client.create_ruleset(files).await?))
        }
        RulesetCommand::Delete { ruleset_id } => {
            client.delete_ruleset(ruleset_id).await?;
            Ok(Value::Null)
        }
        RulesetCommand::List { page } => {
            let result = client
                .list_rulesets(page.page_size, page.page_token.as_deref())
                .await?;
            Ok(json!({
                "rulesets": result.rulesets.iter().map(ruleset_json).collect::<Vec<_>>(),
                "nextPageToken": result.next_page_token,
            }))
        }
    }
}

async fn run_release(client: &FirebaseRulesClient, command: &ReleaseCommand) -> Result<Value> {
    let release = match command {
        ReleaseCommand::Get { name } => client.get_rules_release(name).await?,
        ReleaseCommand::Create { name, ruleset_id } => {
            client.create_rules_release(name, ruleset_id).await?
        }
        ReleaseCommand::Update { name, ruleset_id } => {
            client.update_rules_release(name, ruleset_id).await?
        }
        ReleaseCommand::Delete { name } => {
            client.delete_rules_release(name).await?;
            return Ok(Value::Null);
        }
        ReleaseCommand::List {
            name,
            ruleset_id,
            test_suite,
            page,
        } => {
            let filter = ReleaseFilter {
                name: name.clone(),
                ruleset_id: ruleset_id.clone(),
                test_suite_name: test_suite.clone(),
            };
            let result = client
                .list_rules_releases(&filter, page.page_size, page.page_token.as_deref())
                .await?;
            return Ok(json!({
                "releases": result.releases.iter().map(release_json).collect::<Vec<_>>(),
                "nextPageToken": result.next_page_token,
            }));
        }
    };
    Ok(release_json(&release))
}

async fn run_rules(client: &FirebaseRulesClient, command: &RulesCommand) -> Result<Value> {
    match command {
        RulesCommand::Get { service } => {
            let service: RulesService = service.parse()?;
            Ok(ruleset_json(&client.get_rules(service).await?))
        }
        RulesCommand::Set { service, files } => {
            let service: RulesService = service.parse()?;
            let files = read_ruleset_files(files)?;
            let release = client.set_rules(service, files).await?;
            info!(release = %release.name(), ruleset_id = %release.ruleset_id(), "Rules released");
            Ok(release_json(&release))
        }
    }
}

/// Read rules files from disk, naming each ruleset file after its file name.
fn read_ruleset_files(paths: &[PathBuf]) -> Result<Vec<RulesetFile>> {
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(RulesetFile::new(file_name(path), content))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn ruleset_json(ruleset: &Ruleset) -> Value {
    json!({
        "rulesetId": ruleset.ruleset_id(),
        "createTime": ruleset.create_time(),
        "files": ruleset.loaded_files(),
    })
}

fn release_json(release: &RulesRelease) -> Value {
    json!({
        "name": release.name(),
        "rulesetId": release.ruleset_id(),
        "createTime": release.create_time(),
        "updateTime": release.update_time(),
    })
}
