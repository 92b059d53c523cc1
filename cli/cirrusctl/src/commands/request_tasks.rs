//! Request task commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use cirrus_client::query::basic_query;
use cirrus_client::{Condition, FilterOp};

use crate::output::{print_output, print_single, OutputFormat};

use super::CommandContext;

const COLLECTION: &str = "request_tasks";

/// Request task commands.
#[derive(Debug, Args)]
pub struct RequestTasksCommand {
    #[command(subcommand)]
    command: RequestTasksSubcommand,
}

#[derive(Debug, Subcommand)]
enum RequestTasksSubcommand {
    /// Show one request task, or list request tasks still running.
    Status(RequestTaskStatusArgs),
}

#[derive(Debug, Args)]
struct RequestTaskStatusArgs {
    /// Request task id; omit to list all unfinished request tasks.
    id: Option<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct RequestTaskRow {
    id: String,
    description: String,
    state: String,
    status: String,
    message: String,
}

impl RequestTasksCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let RequestTasksSubcommand::Status(args) = self.command;
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
                    Condition::new("state", FilterOp::Ne, "finished"),
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
                let rows: Vec<RequestTaskRow> = matches
                    .iter()
                    .map(|r| RequestTaskRow {
                        id: r.id().unwrap_or_else(|| "-".to_string()),
                        description: r.display_attr("description"),
                        state: r.display_attr("state"),
                        status: r.display_attr("status"),
                        message: r.display_attr("message"),
                    })
                    .collect();
                print_output(&rows, ctx.format);
            }
        }
        Ok(())
    }
}
