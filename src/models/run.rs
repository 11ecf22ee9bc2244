use crate::models::{Workflow, WorkflowNodeJobRun};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumString};

/// Execution status shared by runs, node runs, stages and job runs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Waiting,
    Building,
    Success,
    Fail,
    Skipped,
    Disabled,
    NeverBuilt,
    Stopped,
}

impl Status {
    /// A terminal status never transitions again; only terminal node runs are
    /// eligible for commit-status reconciliation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Waiting | Status::Building)
    }
}

/// What caused a node run to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual { user: String },
    Hook { vcs_server: String },
}

/// One end-to-end execution of a workflow graph. Created when the workflow is
/// triggered, mutated as nodes complete, archived when terminal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,

    /// Monotonically increasing per workflow.
    pub number: u64,
    pub status: Status,
    pub workflow: Workflow,

    /// Node id mapped to every run of that node, retries included.
    pub node_runs: HashMap<u64, Vec<WorkflowNodeRun>>,
}

/// One execution of a single graph node within a workflow run. Mutated
/// exclusively by result processing; the reconciler only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNodeRun {
    pub id: u64,
    pub workflow_run_id: u64,
    pub workflow_node_id: u64,
    pub number: u64,

    /// 0 is the primary attempt; later sub-runs/retries increment this.
    pub sub_number: u64,
    pub status: Status,

    /// Epoch seconds.
    pub started: u64,
    /// Epoch seconds; 0 while the run is still in progress.
    pub done: u64,

    pub triggered_by: Option<Trigger>,
    pub payload: HashMap<String, String>,

    /// Ids of the node runs that fed into this one.
    pub source_node_runs: Vec<u64>,

    pub vcs_hash: String,
    pub vcs_branch: String,

    pub stages: Vec<Stage>,
}

/// One stage of a node run's pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: u64,
    pub name: String,
    pub status: Status,
    pub job_runs: Vec<WorkflowNodeJobRun>,
}

impl Stage {
    pub fn to_summary(&self) -> StageSummary {
        StageSummary {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            jobs: self.job_runs.len() as u64,
        }
    }
}

/// Compact stage projection carried on outbound events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub id: u64,
    pub name: String,
    pub status: Status,
    pub jobs: u64,
}

/// The run with the highest sub number is the authoritative attempt for a
/// node.
pub fn current_node_run(runs: &[WorkflowNodeRun]) -> Option<&WorkflowNodeRun> {
    runs.iter().max_by_key(|run| run.sub_number)
}
