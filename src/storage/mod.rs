//! Interfaces to the persistence layer. The storage engine itself (and its
//! query layer) lives behind these traits; this crate only depends on the
//! operations the ingestion and propagation paths need.

use crate::models::{
    JobResult, ProcessorReport, Project, Worker, WorkflowNodeRun, WorkflowRun,
};
use async_trait::async_trait;

/// Represents different storage failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StorageError {
    #[error("could not establish connection to database; {0}")]
    Connection(String),

    #[error("requested entity not found")]
    NotFound,

    #[error("unexpected storage error occurred; {0}")]
    Unknown(String),
}

/// Read/write access to the orchestration engine's state. Implementations
/// are expected to return fresh authoritative copies on every load; callers
/// never cache results across suspension points.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load the project owning the referenced job run, variables resolved as
    /// part of the load.
    async fn load_project_by_job_run_id(&self, job_run_id: u64)
        -> Result<Project, StorageError>;

    async fn load_worker(&self, worker_id: &str) -> Result<Worker, StorageError>;

    async fn load_run(&self, run_id: u64) -> Result<WorkflowRun, StorageError>;

    async fn load_node_run(&self, node_run_id: u64) -> Result<WorkflowNodeRun, StorageError>;

    /// The chronologically preceding run of the same node across prior
    /// workflow run numbers. `NotFound` when this is the node's first run.
    async fn previous_node_run(
        &self,
        node_run: &WorkflowNodeRun,
        node_id: u64,
        workflow_id: u64,
    ) -> Result<WorkflowNodeRun, StorageError>;

    /// Refresh the VCS commit linkage (hash/branch) of the given node runs.
    async fn resync_node_run_commits(
        &self,
        project: &Project,
        node_runs: &[WorkflowNodeRun],
    ) -> Result<(), StorageError>;
}

/// The job-result processing delegate. Persists one worker-reported outcome
/// and returns the report of everything it touched. Re-submission of a result
/// for an already-terminal job run is this delegate's concern; the gateway
/// performs no deduplication.
#[async_trait]
pub trait ResultProcessor: Send + Sync {
    async fn process(
        &self,
        project: &Project,
        worker: &Worker,
        result: &JobResult,
    ) -> Result<ProcessorReport, StorageError>;
}
