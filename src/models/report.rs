use crate::models::{WorkflowNodeJobRun, WorkflowNodeRun, WorkflowRun};
use serde::{Deserialize, Serialize};

/// Everything touched by a single ingested job result: the workflow runs,
/// node runs and job runs that result processing created or mutated.
///
/// A report is populated during one ingestion call and then handed by value
/// to event fan-out. Fan-out treats it strictly as a worklist of identifiers
/// to reload, never as a cache of current state; by the time fan-out executes
/// the copies in here may already be stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorReport {
    workflow_runs: Vec<WorkflowRun>,
    node_runs: Vec<WorkflowNodeRun>,
    job_runs: Vec<WorkflowNodeJobRun>,
}

impl ProcessorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_workflow_run(&mut self, run: WorkflowRun) {
        if self.workflow_runs.iter().any(|existing| existing.id == run.id) {
            return;
        }
        self.workflow_runs.push(run);
    }

    /// The same node run never appears twice within one report.
    pub fn add_node_run(&mut self, node_run: WorkflowNodeRun) {
        if self.node_runs.iter().any(|existing| existing.id == node_run.id) {
            return;
        }
        self.node_runs.push(node_run);
    }

    pub fn add_job_run(&mut self, job_run: WorkflowNodeJobRun) {
        if self.job_runs.iter().any(|existing| existing.id == job_run.id) {
            return;
        }
        self.job_runs.push(job_run);
    }

    /// Fold another report into this one, keeping first occurrences.
    pub fn merge(&mut self, other: ProcessorReport) {
        for run in other.workflow_runs {
            self.add_workflow_run(run);
        }
        for node_run in other.node_runs {
            self.add_node_run(node_run);
        }
        for job_run in other.job_runs {
            self.add_job_run(job_run);
        }
    }

    pub fn workflow_runs(&self) -> &[WorkflowRun] {
        &self.workflow_runs
    }

    pub fn node_runs(&self) -> &[WorkflowNodeRun] {
        &self.node_runs
    }

    pub fn job_runs(&self) -> &[WorkflowNodeJobRun] {
        &self.job_runs
    }

    pub fn is_empty(&self) -> bool {
        self.workflow_runs.is_empty() && self.node_runs.is_empty() && self.job_runs.is_empty()
    }
}
