//! Hand-rolled doubles and fixtures shared by the api tests.

use crate::events::Event;
use crate::models::{
    ApplicationContext, JobResult, NodeContext, ProcessorReport, Project, Status, Variable,
    VcsServerLink, Worker, Workflow, WorkflowNode, WorkflowNodeRun, WorkflowRun,
};
use crate::storage::{ResultProcessor, StorageError, Store};
use crate::vcs::{CommitStatus, RetryQueue, VcsClient, VcsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) fn sample_project() -> Project {
    Project {
        key: "PROJ".into(),
        name: "Project".into(),
        variables: vec![Variable {
            name: "region".into(),
            value: "eu-west-1".into(),
        }],
        vcs_servers: vec![VcsServerLink {
            name: "github".into(),
        }],
    }
}

pub(crate) fn sample_worker() -> Worker {
    Worker {
        id: "abc-123".into(),
        name: "worker-7".into(),
    }
}

pub(crate) fn sample_workflow() -> Workflow {
    Workflow {
        id: 9,
        name: "release".into(),
        nodes: vec![
            WorkflowNode {
                id: 1,
                name: "build".into(),
                pipeline_name: "build-pipeline".into(),
                context: Some(NodeContext {
                    application: Some(ApplicationContext {
                        name: "website".into(),
                        vcs_server: "github".into(),
                        repository_full_name: "acme/website".into(),
                    }),
                    environment_name: Some("production".into()),
                }),
            },
            WorkflowNode {
                id: 2,
                name: "deploy".into(),
                pipeline_name: "deploy-pipeline".into(),
                context: Some(NodeContext {
                    application: Some(ApplicationContext {
                        name: "website".into(),
                        vcs_server: "github".into(),
                        repository_full_name: "acme/website".into(),
                    }),
                    environment_name: None,
                }),
            },
        ],
    }
}

/// A node run for `node_id` inside the sample run. Ids are derived so
/// different attempts never collide: node 1 / sub 0 is 500.
pub(crate) fn sample_node_run(node_id: u64, sub_number: u64, status: Status) -> WorkflowNodeRun {
    WorkflowNodeRun {
        id: node_id * 500 + sub_number,
        workflow_run_id: 50,
        workflow_node_id: node_id,
        number: 4,
        sub_number,
        status,
        started: 1_700_000_000,
        done: 1_700_000_600,
        vcs_hash: "abc123".into(),
        vcs_branch: "main".into(),
        ..Default::default()
    }
}

pub(crate) fn sample_run() -> WorkflowRun {
    let node_run = sample_node_run(1, 0, Status::Success);

    WorkflowRun {
        id: 50,
        number: 4,
        status: Status::Building,
        workflow: sample_workflow(),
        node_runs: HashMap::from([(1, vec![node_run])]),
    }
}

/// In-memory [`Store`] with per-call accounting.
#[derive(Default)]
pub(crate) struct TestStore {
    project: Option<Project>,
    worker: Option<Worker>,
    runs: HashMap<u64, WorkflowRun>,
    node_runs: HashMap<u64, WorkflowNodeRun>,
    previous: Option<WorkflowNodeRun>,
    calls: AtomicUsize,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_worker(mut self, worker: Worker) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Index the run and every node run inside it.
    pub fn with_run(mut self, run: WorkflowRun) -> Self {
        for node_run in run.node_runs.values().flatten() {
            self.node_runs.insert(node_run.id, node_run.clone());
        }
        self.runs.insert(run.id, run);
        self
    }

    pub fn with_previous_node_run(mut self, node_run: WorkflowNodeRun) -> Self {
        self.previous = Some(node_run);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for TestStore {
    async fn load_project_by_job_run_id(
        &self,
        _job_run_id: u64,
    ) -> Result<Project, StorageError> {
        self.record_call();
        self.project.clone().ok_or(StorageError::NotFound)
    }

    async fn load_worker(&self, worker_id: &str) -> Result<Worker, StorageError> {
        self.record_call();
        self.worker
            .clone()
            .filter(|worker| worker.id == worker_id)
            .ok_or(StorageError::NotFound)
    }

    async fn load_run(&self, run_id: u64) -> Result<WorkflowRun, StorageError> {
        self.record_call();
        self.runs.get(&run_id).cloned().ok_or(StorageError::NotFound)
    }

    async fn load_node_run(&self, node_run_id: u64) -> Result<WorkflowNodeRun, StorageError> {
        self.record_call();
        self.node_runs
            .get(&node_run_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn previous_node_run(
        &self,
        _node_run: &WorkflowNodeRun,
        _node_id: u64,
        _workflow_id: u64,
    ) -> Result<WorkflowNodeRun, StorageError> {
        self.record_call();
        self.previous.clone().ok_or(StorageError::NotFound)
    }

    async fn resync_node_run_commits(
        &self,
        _project: &Project,
        _node_runs: &[WorkflowNodeRun],
    ) -> Result<(), StorageError> {
        self.record_call();
        Ok(())
    }
}

/// [`ResultProcessor`] double returning a canned report or a canned failure.
pub(crate) struct TestProcessor {
    report: ProcessorReport,
    fail: bool,
}

impl TestProcessor {
    pub fn returning(report: ProcessorReport) -> Self {
        Self {
            report,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            report: ProcessorReport::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ResultProcessor for TestProcessor {
    async fn process(
        &self,
        _project: &Project,
        _worker: &Worker,
        _result: &JobResult,
    ) -> Result<ProcessorReport, StorageError> {
        if self.fail {
            return Err(StorageError::Unknown("processing blew up".into()));
        }
        Ok(self.report.clone())
    }
}

/// [`VcsClient`] double that serves a canned status list and records pushes.
#[derive(Default)]
pub(crate) struct RecordingVcs {
    statuses: Vec<CommitStatus>,
    fail_fetch: bool,
    fail_push: bool,
    pub pushes: Mutex<Vec<Event>>,
}

impl RecordingVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(mut self, statuses: Vec<CommitStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

#[async_trait]
impl VcsClient for RecordingVcs {
    async fn list_statuses(
        &self,
        _repo_full_name: &str,
        _commit_hash: &str,
    ) -> Result<Vec<CommitStatus>, VcsError> {
        if self.fail_fetch {
            return Err(VcsError::Fetch("host unreachable".into()));
        }
        Ok(self.statuses.clone())
    }

    async fn set_status(&self, event: &Event) -> Result<(), VcsError> {
        self.pushes.lock().unwrap().push(event.clone());

        if self.fail_push {
            return Err(VcsError::Push("host rejected status".into()));
        }
        Ok(())
    }
}

/// [`RetryQueue`] double capturing enqueued pushes.
#[derive(Default)]
pub(crate) struct RecordingRetryQueue {
    pub entries: Mutex<Vec<(Event, VcsError)>>,
}

impl RecordingRetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl RetryQueue for RecordingRetryQueue {
    async fn retry_event(&self, event: Event, error: VcsError) {
        self.entries.lock().unwrap().push((event, error));
    }
}
