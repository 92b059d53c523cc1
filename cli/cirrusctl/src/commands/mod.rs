//! CLI commands, one module per server collection.

mod automation_requests;
mod instances;
mod providers;
mod provision_requests;
mod request_tasks;
mod tasks;
mod vms;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cirrus_client::query::basic_query;
use cirrus_client::resolver::AmbiguityPolicy;
use cirrus_client::resource::Resource;
use cirrus_client::{
    Condition, FilterOp, Outcome, RequestCollection, RestClient, Settings, Tracker,
};

use crate::output::{print_success, OutputFormat};

/// Cirrus CLI - Manage cloud resources through the Cirrus server.
#[derive(Debug, Parser)]
#[command(name = "cirrus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Server base URL.
    #[arg(long, global = true, env = "CIRRUS_URL")]
    url: Option<String>,

    /// Username for the token exchange.
    #[arg(long, global = true, env = "CIRRUS_USERNAME")]
    username: Option<String>,

    /// Password for the token exchange.
    #[arg(long, global = true, env = "CIRRUS_PASSWORD")]
    password: Option<String>,

    /// Explicit auth token. Validated against the server, never replaced.
    #[arg(long, global = true, env = "CIRRUS_TOKEN")]
    token: Option<String>,

    /// Verify the server TLS certificate.
    #[arg(long, global = true, overrides_with = "disable_ssl_verify")]
    enable_ssl_verify: bool,

    /// Skip TLS certificate verification.
    #[arg(long, global = true)]
    disable_ssl_verify: bool,

    /// Abort when a name lookup matches multiple resources instead of
    /// taking the first match.
    #[arg(long, global = true)]
    strict_resolve: bool,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage cloud providers.
    Providers(providers::ProvidersCommand),

    /// Query and terminate cloud instances.
    Instances(instances::InstancesCommand),

    /// Query and delete VM references.
    Vms(vms::VmsCommand),

    /// Create and inspect provision requests.
    #[command(name = "provision_requests")]
    ProvisionRequests(provision_requests::ProvisionRequestsCommand),

    /// Create and inspect automation requests.
    #[command(name = "automation_requests")]
    AutomationRequests(automation_requests::AutomationRequestsCommand),

    /// Inspect server tasks.
    Tasks(tasks::TasksCommand),

    /// Inspect request tasks.
    #[command(name = "request_tasks")]
    RequestTasks(request_tasks::RequestTasksCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let filter = if self.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();

        let format = match self.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        };

        // Flags override the merged file/environment settings.
        let mut settings = Settings::load()?;
        if let Some(url) = self.url {
            settings.url = url;
        }
        if let Some(username) = self.username {
            settings.username = username;
        }
        if let Some(password) = self.password {
            settings.password = password;
        }
        if let Some(token) = self.token {
            settings.token = Some(token);
        }
        if self.enable_ssl_verify {
            settings.enable_ssl_verify = true;
        }
        if self.disable_ssl_verify {
            settings.enable_ssl_verify = false;
        }

        let ctx = CommandContext {
            settings,
            format,
            ambiguity: if self.strict_resolve {
                AmbiguityPolicy::Abort
            } else {
                AmbiguityPolicy::FirstMatch
            },
        };

        match self.command {
            Commands::Providers(cmd) => cmd.run(ctx).await,
            Commands::Instances(cmd) => cmd.run(ctx).await,
            Commands::Vms(cmd) => cmd.run(ctx).await,
            Commands::ProvisionRequests(cmd) => cmd.run(ctx).await,
            Commands::AutomationRequests(cmd) => cmd.run(ctx).await,
            Commands::Tasks(cmd) => cmd.run(ctx).await,
            Commands::RequestTasks(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("cirrus {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub settings: Settings,
    pub format: OutputFormat,
    pub ambiguity: AmbiguityPolicy,
}

impl CommandContext {
    /// Get an authenticated API client.
    pub async fn client(&self) -> Result<RestClient> {
        let mut client = RestClient::new(&self.settings)?;
        client.ensure_token().await?;
        Ok(client)
    }
}

/// Load JSON payload data from an inline string or a file.
pub(crate) fn load_payload(
    inline: Option<&str>,
    file: Option<&Path>,
) -> Result<serde_json::Value> {
    match (inline, file) {
        (Some(data), _) => Ok(serde_json::from_str(data)?),
        (None, Some(path)) => {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        }
        (None, None) => anyhow::bail!("payload data required: pass --payload or --payload-file"),
    }
}

/// Find exactly one resource by name; zero or many is an error here since
/// the caller needs a single identifier to act on.
pub(crate) async fn lookup_single(
    client: &RestClient,
    collection: &str,
    name: &str,
) -> Result<Resource> {
    let mut matches = basic_query(
        client,
        collection,
        Condition::new("name", FilterOp::Eq, name),
        &[],
    )
    .await?;

    match matches.len() {
        0 => anyhow::bail!("no {collection} resource named '{name}'"),
        1 => Ok(matches.remove(0)),
        n => anyhow::bail!(
            "{n} {collection} resources named '{name}'; narrow the selection or pass an id"
        ),
    }
}

/// Block on a task until it finishes, turning a business failure into a
/// non-zero exit.
pub(crate) async fn track_task(client: &RestClient, task_id: &str) -> Result<()> {
    let tracker = Tracker::new(client);
    match tracker.wait_for_task(task_id).await? {
        Outcome::Completed { message, .. } => {
            let detail = message.map(|m| format!(": {m}")).unwrap_or_default();
            print_success(&format!("task {task_id} finished{detail}"));
            Ok(())
        }
        Outcome::Failed { message } => anyhow::bail!("task {task_id} failed: {message}"),
    }
}

/// Block on a two-phase request until it finishes, returning the re-fetched
/// request resource for result extraction.
pub(crate) async fn track_request(
    client: &RestClient,
    collection: RequestCollection,
    request_id: &str,
) -> Result<Resource> {
    let tracker = Tracker::new(client);
    match tracker.wait_for_request(collection, request_id).await? {
        Outcome::Completed { message, resource } => {
            let detail = message.map(|m| format!(": {m}")).unwrap_or_default();
            print_success(&format!("request {request_id} finished{detail}"));
            Ok(resource)
        }
        Outcome::Failed { message } => {
            anyhow::bail!("request {request_id} failed: {message}")
        }
    }
}
