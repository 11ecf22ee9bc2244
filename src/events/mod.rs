use crate::epoch_milli;
use crate::models::{
    StageSummary, Status, Trigger, WorkflowNodeJobRun, WorkflowNodeRun, WorkflowRun,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// The payload shape of an event. The event type string on the envelope is
/// derived from the variant name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    RunWorkflow(WorkflowRunPayload),
    RunWorkflowNode(Box<NodeRunPayload>),
    RunWorkflowNodeJob(JobRunPayload),
}

/// Coarse run-level state. Published straight from the processor report copy;
/// run-level subscribers do not need the node graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunPayload {
    pub id: u64,
    pub number: u64,
    pub status: Status,
    pub workflow_name: String,
}

impl WorkflowRunPayload {
    pub fn new(run: &WorkflowRun) -> Self {
        Self {
            id: run.id,
            number: run.number,
            status: run.status,
            workflow_name: run.workflow.name.clone(),
        }
    }
}

/// Full node-run summary, including the delta against the previous attempt
/// when one is known. This is also the payload pushed to the VCS host as a
/// commit status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRunPayload {
    pub id: u64,
    pub number: u64,
    pub sub_number: u64,
    pub status: Status,

    /// Epoch seconds.
    pub start: u64,
    pub done: u64,

    pub triggered_by: Option<Trigger>,
    pub payload: HashMap<String, String>,
    pub source_node_runs: Vec<u64>,

    pub hash: String,
    pub branch_name: String,

    pub node_id: u64,
    pub run_id: u64,
    pub node_name: String,

    pub stages_summary: Vec<StageSummary>,

    pub repository_manager_name: String,
    pub repository_full_name: String,

    /// State of the chronologically preceding attempt, when the publisher
    /// computed one.
    pub previous: Option<NodeRunDelta>,
}

impl NodeRunPayload {
    pub fn new(
        node_run: &WorkflowNodeRun,
        run: &WorkflowRun,
        previous: Option<&WorkflowNodeRun>,
    ) -> Self {
        let node = run.workflow.node(node_run.workflow_node_id);
        let application = node.and_then(|node| node.application());

        Self {
            id: node_run.id,
            number: node_run.number,
            sub_number: node_run.sub_number,
            status: node_run.status,
            start: node_run.started,
            done: node_run.done,
            triggered_by: node_run.triggered_by.clone(),
            payload: node_run.payload.clone(),
            source_node_runs: node_run.source_node_runs.clone(),
            hash: node_run.vcs_hash.clone(),
            branch_name: node_run.vcs_branch.clone(),
            node_id: node_run.workflow_node_id,
            run_id: node_run.workflow_run_id,
            node_name: node.map(|node| node.name.clone()).unwrap_or_default(),
            stages_summary: node_run.stages.iter().map(|stage| stage.to_summary()).collect(),
            repository_manager_name: application
                .map(|app| app.vcs_server.clone())
                .unwrap_or_default(),
            repository_full_name: application
                .map(|app| app.repository_full_name.clone())
                .unwrap_or_default(),
            previous: previous.map(|previous| NodeRunDelta {
                sub_number: previous.sub_number,
                status: previous.status,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRunDelta {
    pub sub_number: u64,
    pub status: Status,
}

/// Leaf event for a single job run; no previous-run delta is computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRunPayload {
    pub id: u64,
    pub node_run_id: u64,
    pub job_name: String,
    pub status: Status,
}

impl JobRunPayload {
    pub fn new(job_run: &WorkflowNodeJobRun) -> Self {
        Self {
            id: job_run.id,
            node_run_id: job_run.workflow_node_run_id,
            job_name: job_run.job_name.clone(),
            status: job_run.status,
        }
    }
}

/// Name tags subscribers route and filter on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    pub project_key: String,
    pub workflow_name: String,
    pub pipeline_name: String,
    pub application_name: String,
    pub environment_name: String,
}

impl Tags {
    pub fn for_run(project_key: &str, run: &WorkflowRun) -> Self {
        Self {
            project_key: project_key.to_string(),
            workflow_name: run.workflow.name.clone(),
            ..Default::default()
        }
    }

    pub fn for_node(project_key: &str, run: &WorkflowRun, node_id: u64) -> Self {
        let mut tags = Self::for_run(project_key, run);

        if let Some(node) = run.workflow.node(node_id) {
            tags.pipeline_name = node.pipeline_name.clone();
            if let Some(application) = node.application() {
                tags.application_name = application.name.clone();
            }
            if let Some(environment) = node.environment_name() {
                tags.environment_name = environment.to_string();
            }
        }

        tags
    }
}

/// A single outbound notification. Fire-and-forget once published; no
/// acknowledgment is waited on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for the event.
    pub id: String,

    /// Derived from the payload shape, e.g. `run_workflow_node`.
    pub event_type: String,

    pub kind: Kind,

    /// Time the event was emitted in epoch milliseconds.
    pub emitted: u64,

    pub tags: Tags,
}

impl Event {
    pub fn new(kind: Kind, tags: Tags) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            event_type: kind.to_string(),
            kind,
            emitted: epoch_milli(),
            tags,
        }
    }

    /// The payload as a flattened key/value document, for subscribers that
    /// forward events without knowing the payload shapes.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(&self.kind).unwrap_or_default()
    }
}

/// Central handler for outbound events. Subscribers listen on a broadcast
/// channel; publishers never wait on them.
#[derive(Debug, Clone)]
pub struct EventBus {
    broadcast_channel: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));

        Self {
            broadcast_channel: tx,
        }
    }

    /// Returns a channel receiver end which can be used to listen to events.
    /// The receiver will drop automatically when out of scope.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.broadcast_channel.subscribe()
    }

    pub fn publish_workflow_run(&self, run: &WorkflowRun, project_key: &str) {
        let kind = Kind::RunWorkflow(WorkflowRunPayload::new(run));
        self.send(Event::new(kind, Tags::for_run(project_key, run)));
    }

    pub fn publish_workflow_node_run(
        &self,
        node_run: &WorkflowNodeRun,
        run: &WorkflowRun,
        previous: Option<&WorkflowNodeRun>,
        project_key: &str,
    ) {
        let payload = NodeRunPayload::new(node_run, run, previous);
        let tags = Tags::for_node(project_key, run, node_run.workflow_node_id);
        self.send(Event::new(Kind::RunWorkflowNode(Box::new(payload)), tags));
    }

    pub fn publish_workflow_node_job_run(
        &self,
        project_key: &str,
        job_run: &WorkflowNodeJobRun,
        node_run: &WorkflowNodeRun,
        run: &WorkflowRun,
    ) {
        let payload = JobRunPayload::new(job_run);
        let tags = Tags::for_node(project_key, run, node_run.workflow_node_id);
        self.send(Event::new(Kind::RunWorkflowNodeJob(payload), tags));
    }

    fn send(&self, event: Event) {
        trace!(id = %event.id, event_type = %event.event_type, emitted = event.emitted, "new event");

        if self.broadcast_channel.send(event).is_err() {
            trace!("no receivers available to receive published event");
        }
    }
}
