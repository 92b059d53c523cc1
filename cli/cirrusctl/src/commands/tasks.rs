//! Task commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use cirrus_client::query::basic_query;
use cirrus_client::{Condition, FilterOp};

use crate::output::{print_output, print_single, OutputFormat};

use super::{track_task, CommandContext};

const COLLECTION: &str = "tasks";

/// Task commands.
#[derive(Debug, Args)]
pub struct TasksCommand {
    #[command(subcommand)]
    command: TasksSubcommand,
}

#[derive(Debug, Subcommand)]
enum TasksSubcommand {
    /// Show one task's progress, or list tasks still running.
    Status(TaskStatusArgs),
}

#[derive(Debug, Args)]
struct TaskStatusArgs {
    /// Task id; omit to list all unfinished tasks.
    id: Option<String>,

    /// Track the task to completion (requires an id).
    #[arg(long, requires = "id")]
    wait: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct TaskRow {
    id: String,
    name: String,
    state: String,
    status: String,
    message: String,
}

impl TasksCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let TasksSubcommand::Status(args) = self.command;
        let client = ctx.client().await?;

        if args.wait {
            let id = args.id.as_deref().unwrap_or_default();
            return track_task(&client, id).await;
        }

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
                    Condition::new("state", FilterOp::Ne, "Finished"),
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
                let rows: Vec<TaskRow> = matches
                    .iter()
                    .map(|r| TaskRow {
                        id: r.id().unwrap_or_else(|| "-".to_string()),
                        name: r.display_attr("name"),
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
