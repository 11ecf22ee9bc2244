use crate::models::Status;
use serde::{Deserialize, Serialize};

/// One execution of one job within a stage of a node run. Created when the
/// job is dispatched to a worker, finalized when the worker's result arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNodeJobRun {
    pub id: u64,
    pub workflow_node_run_id: u64,
    pub job_name: String,
    pub status: Status,

    /// Where the job's log stream was persisted, if anywhere.
    pub log_ref: Option<String>,
}

/// The outcome a worker reports for one dispatched job run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Identifies the job run this result finalizes.
    pub job_run_id: u64,
    pub status: Status,

    /// Epoch seconds at which the job finished on the worker.
    pub done: u64,

    /// Human readable failure reason, when the worker has one.
    pub reason: Option<String>,
}
