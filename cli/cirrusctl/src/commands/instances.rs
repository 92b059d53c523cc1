//! Instance commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use cirrus_client::query::{advanced_query, basic_query};
use cirrus_client::resolver::Provider;
use cirrus_client::resource::{task_id, Resource};
use cirrus_client::{Condition, FilterExpr, FilterOp};

use crate::output::{print_info, print_output, print_single, OutputFormat};

use super::{lookup_single, track_task, CommandContext};

const COLLECTION: &str = "instances";

/// Instance commands.
#[derive(Debug, Args)]
pub struct InstancesCommand {
    #[command(subcommand)]
    command: InstancesSubcommand,
}

#[derive(Debug, Subcommand)]
enum InstancesSubcommand {
    /// List instances matching a name.
    Query(QueryInstancesArgs),

    /// Terminate an instance.
    Terminate(TerminateInstanceArgs),
}

#[derive(Debug, Args)]
struct QueryInstancesArgs {
    /// Instance name to match.
    name: String,

    /// Restrict matches to one provider's instances.
    #[arg(long)]
    provider: Option<String>,

    /// Extra attribute to fetch for each match (repeatable).
    #[arg(long = "attr")]
    attrs: Vec<String>,
}

#[derive(Debug, Args)]
struct TerminateInstanceArgs {
    /// Instance name (or id with --by-id).
    name: String,

    /// Treat the positional argument as a server id instead of a name.
    #[arg(long)]
    by_id: bool,

    /// Track the spawned task to completion.
    #[arg(long)]
    wait: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct InstanceRow {
    id: String,
    name: String,
    power_state: String,
}

impl InstancesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            InstancesSubcommand::Query(args) => query_instances(ctx, args).await,
            InstancesSubcommand::Terminate(args) => terminate_instance(ctx, args).await,
        }
    }
}

async fn query_instances(ctx: CommandContext, args: QueryInstancesArgs) -> Result<()> {
    let client = ctx.client().await?;
    let attrs: Vec<&str> = args.attrs.iter().map(String::as_str).collect();

    let matches = match args.provider.as_deref() {
        Some(provider_name) => {
            let provider = Provider::discover(&client, provider_name, ctx.ambiguity).await?;
            let expr = FilterExpr::new(Condition::new("name", FilterOp::Eq, &args.name))
                .and(Condition::new("type", FilterOp::Eq, provider.vm_type()));
            advanced_query(&client, COLLECTION, &expr, &attrs).await?
        }
        None => {
            basic_query(
                &client,
                COLLECTION,
                Condition::new("name", FilterOp::Eq, &args.name),
                &attrs,
            )
            .await?
        }
    };

    show_instances(&matches, ctx.format);
    Ok(())
}

fn show_instances(matches: &[Resource], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let raw: Vec<_> = matches.iter().map(|r| &r.0).collect();
            print_single(&raw);
        }
        OutputFormat::Table => {
            let rows: Vec<InstanceRow> = matches
                .iter()
                .map(|r| InstanceRow {
                    id: r.id().unwrap_or_else(|| "-".to_string()),
                    name: r.display_attr("name"),
                    power_state: r.display_attr("power_state"),
                })
                .collect();
            print_output(&rows, format);
        }
    }
}

async fn terminate_instance(ctx: CommandContext, args: TerminateInstanceArgs) -> Result<()> {
    let client = ctx.client().await?;

    let id = if args.by_id {
        args.name.clone()
    } else {
        let instance = lookup_single(&client, COLLECTION, &args.name).await?;
        instance
            .id()
            .ok_or_else(|| anyhow::anyhow!("instance '{}' has no id", args.name))?
    };

    let response = client
        .post_resource_action(COLLECTION, &id, &json!({"action": "terminate"}))
        .await?;

    match task_id(&response) {
        Some(task) => {
            print_info(&format!("Task ID for terminate of instance {id}: {task}"));
            if args.wait {
                track_task(&client, &task).await?;
            }
        }
        None => print_single(&response),
    }
    Ok(())
}
