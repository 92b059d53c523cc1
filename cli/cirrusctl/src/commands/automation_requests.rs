//! Automation request commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use cirrus_client::payload::{build_floating_ip_payload, ProvisionInput};
use cirrus_client::query::basic_query;
use cirrus_client::resource::{first_result_id, Resource};
use cirrus_client::{Condition, FilterOp, RequestCollection};

use crate::output::{print_info, print_output, print_single, print_success, OutputFormat};

use super::{load_payload, track_request, CommandContext};

const COLLECTION: &str = "automation_requests";

/// Automation request commands.
#[derive(Debug, Args)]
pub struct AutomationRequestsCommand {
    #[command(subcommand)]
    command: AutomationRequestsSubcommand,
}

#[derive(Debug, Subcommand)]
enum AutomationRequestsSubcommand {
    /// Submit an automation request.
    Create(CreateAutomationArgs),

    /// Show one request's progress, or list requests still in flight.
    Status(AutomationStatusArgs),
}

/// Built-in automation payload builders. Without one, the payload data is
/// submitted as-is.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum AutomationKind {
    /// Allocate a floating ip from a public pool.
    GenFloatingIp,
}

#[derive(Debug, Args)]
struct CreateAutomationArgs {
    /// Built-in payload builder to run on the input.
    #[arg(long, value_enum)]
    kind: Option<AutomationKind>,

    /// Automation input as inline JSON.
    #[arg(long)]
    payload: Option<String>,

    /// File containing JSON automation input.
    #[arg(long)]
    payload_file: Option<PathBuf>,

    /// Track the request to completion.
    #[arg(long)]
    wait: bool,
}

#[derive(Debug, Args)]
struct AutomationStatusArgs {
    /// Request id; omit to list all unfinished requests.
    id: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct AutomationRow {
    id: String,
    state: String,
    status: String,
    message: String,
}

impl AutomationRequestsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            AutomationRequestsSubcommand::Create(args) => create_request(ctx, args).await,
            AutomationRequestsSubcommand::Status(args) => request_status(ctx, args).await,
        }
    }
}

async fn create_request(ctx: CommandContext, args: CreateAutomationArgs) -> Result<()> {
    let client = ctx.client().await?;

    let raw = load_payload(args.payload.as_deref(), args.payload_file.as_deref())?;
    let payload = match args.kind {
        Some(AutomationKind::GenFloatingIp) => {
            let input: ProvisionInput = serde_json::from_value(raw)?;
            build_floating_ip_payload(&client, &input, ctx.ambiguity).await?
        }
        None => raw,
    };

    let response = client
        .post_action(COLLECTION, &json!({"action": "create", "resources": [payload]}))
        .await?;

    let Some(id) = first_result_id(&response) else {
        print_single(&response);
        anyhow::bail!("server response carried no request id");
    };
    print_success(&format!("Automation request submitted: {id}"));

    if args.wait {
        let request = track_request(&client, RequestCollection::Automation, &id).await?;
        show_automation_result(&request);
    }
    Ok(())
}

/// The floating ip method writes the allocated address into the request's
/// options on completion.
fn show_automation_result(request: &Resource) {
    let options = request.attr("options").cloned().unwrap_or_default();
    if let Some(address) = options
        .get("return")
        .and_then(|v| v.get("floating_ip_address"))
        .and_then(|v| v.as_str())
    {
        print_info(&format!("Floating IP: {address}"));
    }
}

async fn request_status(ctx: CommandContext, args: AutomationStatusArgs) -> Result<()> {
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
            let rows: Vec<AutomationRow> = matches
                .iter()
                .map(|r| AutomationRow {
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
