//! Polling tracker for asynchronous server-side operations.
//!
//! Two operation families exist server-side, with deliberately different
//! state vocabularies that must be matched bit-for-bit:
//!
//! - **Tasks** (single-phase): `state` reaches `"Finished"` (capitalized),
//!   and a separate `status` of `"Ok"` or `"Error"` carries the outcome.
//! - **Requests** (two-phase): the outer request's `request_state` moves
//!   through `pending → queued → active → finished` (lower-case) while a
//!   spawned request task runs; the inner task's `state` terminates at
//!   `"finished"` (lower-case). Provider-specific output (assigned floating
//!   ip, final VM name) lives only on the request object, so the request is
//!   re-fetched after the inner task completes.
//!
//! Polling is intentionally unbounded: the tracker has no timeout and no
//! cancellation path, matching the remote contract. A lookup that returns
//! zero resources is fatal and never retried; transient network failures
//! are retried a bounded number of consecutive times before escalating.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::query::{Condition, FilterExpr, FilterOp};
use crate::resource::Resource;
use crate::rest::RestClient;

const TASKS_COLLECTION: &str = "tasks";
const REQUEST_TASKS_COLLECTION: &str = "request_tasks";

/// Terminal `state` for tasks. Capitalized, unlike the request vocabulary.
const TASK_STATE_FINISHED: &str = "Finished";

/// Outer request states at which the spawned task exists.
const REQUEST_STATE_ACTIVE: &str = "active";
const REQUEST_STATE_FINISHED: &str = "finished";

/// Terminal `state` for request tasks.
const REQUEST_TASK_STATE_FINISHED: &str = "finished";

/// Business-failure `status` value, shared by both families.
const STATUS_ERROR: &str = "Error";

/// Poll timing and transient-failure tolerance.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Interval between task polls (inner phase and family-A tasks).
    pub task_poll_interval: Duration,

    /// Interval between outer request polls. The outer state machine moves
    /// slower than its tasks, so this is longer by default.
    pub request_poll_interval: Duration,

    /// Consecutive transient network failures tolerated during polling
    /// before escalating to a fatal error.
    pub max_transient_retries: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            task_poll_interval: Duration::from_secs(5),
            request_poll_interval: Duration::from_secs(10),
            max_transient_retries: 3,
        }
    }
}

/// Request collections that drive the two-phase family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCollection {
    Provision,
    Automation,
}

impl RequestCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestCollection::Provision => "provision_requests",
            RequestCollection::Automation => "automation_requests",
        }
    }
}

/// Structured result of a tracked operation.
///
/// A business failure is a valid outcome, not an error; the caller decides
/// exit code and display.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The operation reached its terminal state successfully.
    Completed {
        message: Option<String>,
        resource: Resource,
    },

    /// The operation terminated with an `Error` status. Carries the remote
    /// message field.
    Failed { message: String },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// Polls a submitted operation until it reaches a terminal state.
#[derive(Debug)]
pub struct Tracker<'a> {
    client: &'a RestClient,
    config: TrackerConfig,
}

impl<'a> Tracker<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self {
            client,
            config: TrackerConfig::default(),
        }
    }

    pub fn with_config(client: &'a RestClient, config: TrackerConfig) -> Self {
        Self { client, config }
    }

    /// Track a single-phase task to completion.
    pub async fn wait_for_task(&self, task_id: &str) -> Result<Outcome> {
        loop {
            let task = self.poll_lookup(TASKS_COLLECTION, task_id).await?;
            let state = task.str_attr("state").unwrap_or_default();

            if state == TASK_STATE_FINISHED {
                debug!(task_id, "task reached terminal state");
                return Ok(classify(&task));
            }

            debug!(task_id, state, "task not finished yet");
            sleep(self.config.task_poll_interval).await;
        }
    }

    /// Track a two-phase request to completion.
    ///
    /// Polls the request until it turns `active`, then the spawned request
    /// task until it finishes, then re-fetches the request for the final
    /// outcome and provider-specific output. A request already `finished`
    /// skips the inner phase. On inner-task failure the re-fetched request's
    /// message is preferred; the task-level message is only a fallback.
    pub async fn wait_for_request(
        &self,
        collection: RequestCollection,
        request_id: &str,
    ) -> Result<Outcome> {
        let mut inner_failed = None;

        let request = self.poll_outer(collection, request_id).await?;
        let skip_inner = request.str_attr("request_state") == Some(REQUEST_STATE_FINISHED)
            || request.str_attr("status") == Some(STATUS_ERROR);

        if !skip_inner {
            let task = self.poll_inner(request_id).await?;
            if task.str_attr("status") == Some(STATUS_ERROR) {
                inner_failed = task.str_attr("message").map(str::to_string);
            }
        }

        // The task does not carry provider-specific output; only the
        // request object does. Re-fetch it for the final word.
        let request = self.poll_lookup(collection.as_str(), request_id).await?;
        let request_message = request.str_attr("message").map(str::to_string);

        if request.str_attr("status") == Some(STATUS_ERROR) || inner_failed.is_some() {
            let message = request_message
                .or(inner_failed)
                .unwrap_or_else(|| "remote operation failed".to_string());
            return Ok(Outcome::Failed { message });
        }

        Ok(Outcome::Completed {
            message: request_message,
            resource: request,
        })
    }

    /// Poll the outer request until its state shows the spawned task exists
    /// (`active`), or the request is already `finished`.
    async fn poll_outer(
        &self,
        collection: RequestCollection,
        request_id: &str,
    ) -> Result<Resource> {
        loop {
            let request = self.poll_lookup(collection.as_str(), request_id).await?;
            let state = request.str_attr("request_state").unwrap_or_default();

            if request.str_attr("status") == Some(STATUS_ERROR) {
                return Ok(request);
            }
            if state == REQUEST_STATE_ACTIVE || state == REQUEST_STATE_FINISHED {
                debug!(request_id, state, "request reached trackable state");
                return Ok(request);
            }

            debug!(request_id, state, "request not active yet");
            sleep(self.config.request_poll_interval).await;
        }
    }

    /// Poll the spawned request task, scoped by the request id, until done.
    async fn poll_inner(&self, request_id: &str) -> Result<Resource> {
        loop {
            let task = self
                .poll_lookup(REQUEST_TASKS_COLLECTION, request_id)
                .await?;
            let state = task.str_attr("state").unwrap_or_default();

            if state == REQUEST_TASK_STATE_FINISHED {
                debug!(request_id, "request task finished");
                return Ok(task);
            }

            debug!(request_id, state, "request task not finished yet");
            sleep(self.config.task_poll_interval).await;
        }
    }

    /// Look up a tracked operation by id.
    ///
    /// An empty result is fatal: polling cannot continue without a valid
    /// identifier. Transient network failures are retried up to the
    /// configured bound.
    async fn poll_lookup(&self, collection: &str, id: &str) -> Result<Resource> {
        let expr = FilterExpr::new(Condition::new("id", FilterOp::Eq, id));
        let params = expr.to_params();

        let mut transient = 0u32;
        loop {
            match self.client.filter_collection(collection, &params).await {
                Ok(mut resources) => {
                    if resources.is_empty() {
                        return Err(ClientError::NotFound(format!(
                            "{collection} id {id} (query: id={id})"
                        )));
                    }
                    return Ok(resources.remove(0));
                }
                Err(ClientError::Network(err)) if transient < self.config.max_transient_retries => {
                    transient += 1;
                    warn!(
                        collection,
                        id, transient, "transient network error while polling: {err}"
                    );
                    sleep(self.config.task_poll_interval).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

fn classify(task: &Resource) -> Outcome {
    let message = task.str_attr("message").map(str::to_string);
    if task.str_attr("status") == Some(STATUS_ERROR) {
        Outcome::Failed {
            message: message.unwrap_or_else(|| "remote operation failed".to_string()),
        }
    } else {
        Outcome::Completed {
            message,
            resource: task.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_reads_status_and_message() {
        let task = Resource(json!({
            "state": "Finished", "status": "Error", "message": "boom"
        }));
        match classify(&task) {
            Outcome::Failed { message } => assert_eq!(message, "boom"),
            other => panic!("expected failure, got {other:?}"),
        }

        let task = Resource(json!({
            "state": "Finished", "status": "Ok", "message": "Task completed"
        }));
        match classify(&task) {
            Outcome::Completed { message, .. } => {
                assert_eq!(message.as_deref(), Some("Task completed"));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn default_config_uses_slower_outer_interval() {
        let config = TrackerConfig::default();
        assert!(config.request_poll_interval > config.task_poll_interval);
        assert_eq!(config.max_transient_retries, 3);
    }
}
