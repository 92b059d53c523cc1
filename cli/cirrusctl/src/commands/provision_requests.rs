//! Provision request commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use cirrus_client::payload::{build_provision_payload, CloudProvider, ProvisionInput};
use cirrus_client::query::basic_query;
use cirrus_client::resource::{first_result_id, Resource};
use cirrus_client::{Condition, FilterOp, RequestCollection};

use crate::output::{print_info, print_output, print_single, print_success, OutputFormat};

use super::{load_payload, track_request, CommandContext};

const COLLECTION: &str = "provision_requests";

/// Provision request commands.
#[derive(Debug, Args)]
pub struct ProvisionRequestsCommand {
    #[command(subcommand)]
    command: ProvisionRequestsSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProvisionRequestsSubcommand {
    /// Submit a provision request built from payload data.
    Create(CreateProvisionArgs),

    /// Show one request's progress, or list requests still in flight.
    Status(ProvisionStatusArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Openstack,
    Amazon,
}

impl From<ProviderArg> for CloudProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Openstack => CloudProvider::OpenStack,
            ProviderArg::Amazon => CloudProvider::Amazon,
        }
    }
}

#[derive(Debug, Args)]
struct CreateProvisionArgs {
    /// Target cloud provider.
    #[arg(long, value_enum)]
    provider: ProviderArg,

    /// Provisioning input as inline JSON.
    #[arg(long)]
    payload: Option<String>,

    /// File containing JSON provisioning input.
    #[arg(long)]
    payload_file: Option<PathBuf>,

    /// Track the request to completion.
    #[arg(long)]
    wait: bool,
}

#[derive(Debug, Args)]
struct ProvisionStatusArgs {
    /// Request id; omit to list all unfinished requests.
    id: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct ProvisionRow {
    id: String,
    state: String,
    status: String,
    message: String,
}

impl ProvisionRequestsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ProvisionRequestsSubcommand::Create(args) => create_request(ctx, args).await,
            ProvisionRequestsSubcommand::Status(args) => request_status(ctx, args).await,
        }
    }
}

async fn create_request(ctx: CommandContext, args: CreateProvisionArgs) -> Result<()> {
    let client = ctx.client().await?;

    let raw = load_payload(args.payload.as_deref(), args.payload_file.as_deref())?;
    let input: ProvisionInput = serde_json::from_value(raw)?;

    let payload =
        build_provision_payload(&client, args.provider.into(), &input, ctx.ambiguity).await?;

    let response = client
        .post_action(COLLECTION, &json!({"action": "create", "resources": [payload]}))
        .await?;

    let Some(id) = first_result_id(&response) else {
        print_single(&response);
        anyhow::bail!("server response carried no request id");
    };
    print_success(&format!("Provision request submitted: {id}"));

    if args.wait {
        let request = track_request(&client, RequestCollection::Provision, &id).await?;
        show_provision_result(&request);
    }
    Ok(())
}

/// Surface the provisioned VM name and address from the finished request's
/// options, when the server recorded them.
fn show_provision_result(request: &Resource) {
    let options = request.attr("options").cloned().unwrap_or_default();
    if let Some(vm_name) = options.get("vm_target_name").and_then(|v| v.as_str()) {
        print_info(&format!("Provisioned VM: {vm_name}"));
    }
    if let Some(address) = options.get("floating_ip_address").and_then(|v| v.as_str()) {
        print_info(&format!("Floating IP: {address}"));
    }
}

async fn request_status(ctx: CommandContext, args: ProvisionStatusArgs) -> Result<()> {
    let client = ctx.client().await?;

    let matches = match args.id.as_deref() {
        Some(id) => {
            basic_query(
                &client,
                COLLECTION,
                Condition::new("id", FilterOp::Eq, id),
                &[],
            )
            .await?
        }
        // Finished requests stay in the collection indefinitely; the
        // unparameterized listing only shows the ones still moving.
        None => {
            basic_query(
                &client,
                COLLECTION,
                Condition::new("request_state", FilterOp::Ne, "finished"),
                &[],
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
            let rows: Vec<ProvisionRow> = matches
                .iter()
                .map(|r| ProvisionRow {
                    id: r.id().unwrap_or_else(|| "-".to_string()),
                    state: r.display_attr("request_state"),
                    status: r.display_attr("status"),
                    message: r.display_attr("message"),
                })
                .collect();
            print_output(&rows, ctx.format);
        }
    }
    Ok(())
}
