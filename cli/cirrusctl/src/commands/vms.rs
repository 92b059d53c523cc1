//! VM commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use cirrus_client::query::{advanced_query, basic_query};
use cirrus_client::resolver::Provider;
use cirrus_client::resource::task_id;
use cirrus_client::{Condition, FilterExpr, FilterOp};

use crate::output::{print_info, print_output, print_single, OutputFormat};

use super::{lookup_single, track_task, CommandContext};

const COLLECTION: &str = "vms";

/// VM commands.
#[derive(Debug, Args)]
pub struct VmsCommand {
    #[command(subcommand)]
    command: VmsSubcommand,
}

#[derive(Debug, Subcommand)]
enum VmsSubcommand {
    /// List VMs matching a name.
    Query(QueryVmsArgs),

    /// Delete a VM reference from the server inventory.
    Delete(DeleteVmArgs),
}

#[derive(Debug, Args)]
struct QueryVmsArgs {
    /// VM name to match.
    name: String,

    /// Restrict matches to one provider's VMs.
    #[arg(long)]
    provider: Option<String>,

    /// Extra attribute to fetch for each match (repeatable).
    #[arg(long = "attr")]
    attrs: Vec<String>,
}

#[derive(Debug, Args)]
struct DeleteVmArgs {
    /// VM name (or id with --by-id).
    name: String,

    /// Treat the positional argument as a server id instead of a name.
    #[arg(long)]
    by_id: bool,

    /// Track the spawned task to completion.
    #[arg(long)]
    wait: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct VmRow {
    id: String,
    name: String,
    power_state: String,
}

impl VmsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            VmsSubcommand::Query(args) => query_vms(ctx, args).await,
            VmsSubcommand::Delete(args) => delete_vm(ctx, args).await,
        }
    }
}

async fn query_vms(ctx: CommandContext, args: QueryVmsArgs) -> Result<()> {
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

    match ctx.format {
        OutputFormat::Json => {
            let raw: Vec<_> = matches.iter().map(|r| &r.0).collect();
            print_single(&raw);
        }
        OutputFormat::Table => {
            let rows: Vec<VmRow> = matches
                .iter()
                .map(|r| VmRow {
                    id: r.id().unwrap_or_else(|| "-".to_string()),
                    name: r.display_attr("name"),
                    power_state: r.display_attr("power_state"),
                })
                .collect();
            print_output(&rows, ctx.format);
        }
    }
    Ok(())
}

async fn delete_vm(ctx: CommandContext, args: DeleteVmArgs) -> Result<()> {
    let client = ctx.client().await?;

    let id = if args.by_id {
        args.name.clone()
    } else {
        let vm = lookup_single(&client, COLLECTION, &args.name).await?;
        vm.id()
            .ok_or_else(|| anyhow::anyhow!("vm '{}' has no id", args.name))?
    };

    let response = client
        .post_resource_action(COLLECTION, &id, &json!({"action": "delete"}))
        .await?;

    match task_id(&response) {
        Some(task) => {
            print_info(&format!("Task ID for delete of vm {id}: {task}"));
            if args.wait {
                track_task(&client, &task).await?;
            }
        }
        None => print_single(&response),
    }
    Ok(())
}
