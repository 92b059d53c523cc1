//! Provider commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

use cirrus_client::resource::{first_result_id, task_id};

use crate::output::{print_info, print_single, print_success};

use super::{load_payload, lookup_single, track_task, CommandContext};

/// Provider commands.
#[derive(Debug, Args)]
pub struct ProvidersCommand {
    #[command(subcommand)]
    command: ProvidersSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProvidersSubcommand {
    /// Register a new provider from payload data.
    Create(CreateProviderArgs),

    /// Remove a provider by name.
    Delete(ProviderActionArgs),

    /// Refresh a provider's inventory.
    Refresh(ProviderActionArgs),
}

#[derive(Debug, Args)]
struct CreateProviderArgs {
    /// Provider payload data as inline JSON.
    #[arg(long)]
    payload: Option<String>,

    /// File containing JSON payload data.
    #[arg(long)]
    payload_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ProviderActionArgs {
    /// Provider name.
    name: String,

    /// Track the spawned task to completion.
    #[arg(long)]
    wait: bool,
}

impl ProvidersCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ProvidersSubcommand::Create(args) => create_provider(ctx, args).await,
            ProvidersSubcommand::Delete(args) => provider_action(ctx, args, "delete").await,
            ProvidersSubcommand::Refresh(args) => provider_action(ctx, args, "refresh").await,
        }
    }
}

/// Register a new provider.
async fn create_provider(ctx: CommandContext, args: CreateProviderArgs) -> Result<()> {
    let client = ctx.client().await?;
    let payload = load_payload(args.payload.as_deref(), args.payload_file.as_deref())?;

    let body = json!({"action": "create", "resources": [payload]});
    let response = client.post_action("providers", &body).await?;

    match first_result_id(&response) {
        Some(id) => print_success(&format!("Provider created: {id}")),
        None => print_single(&response),
    }
    Ok(())
}

/// Invoke a lifecycle action against a provider resolved by name.
async fn provider_action(ctx: CommandContext, args: ProviderActionArgs, verb: &str) -> Result<()> {
    let client = ctx.client().await?;

    let provider = lookup_single(&client, "providers", &args.name).await?;
    let id = provider
        .id()
        .ok_or_else(|| anyhow::anyhow!("provider '{}' has no id", args.name))?;

    let response = client
        .post_resource_action("providers", &id, &json!({"action": verb}))
        .await?;

    match task_id(&response) {
        Some(task) => {
            print_info(&format!("Task ID for {verb} of provider {}: {task}", args.name));
            if args.wait {
                track_task(&client, &task).await?;
            }
        }
        None => print_single(&response),
    }
    Ok(())
}
