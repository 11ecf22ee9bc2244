use serde::{Deserialize, Serialize};

/// An immutable workflow definition. Runs reference the definition they were
/// created from; the definition itself is never mutated by ingestion or
/// reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub nodes: Vec<WorkflowNode>,
}

impl Workflow {
    pub fn node(&self, node_id: u64) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|node| node.id == node_id)
    }
}

/// A single node in the workflow graph. Each node executes one pipeline and
/// may carry an application/environment context that links it to a repository
/// on a VCS host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: u64,
    pub name: String,
    pub pipeline_name: String,
    pub context: Option<NodeContext>,
}

impl WorkflowNode {
    /// Only nodes whose application context points at a repository report
    /// commit statuses.
    pub fn is_linked_to_repo(&self) -> bool {
        self.application()
            .map(|app| !app.repository_full_name.is_empty())
            .unwrap_or(false)
    }

    pub fn application(&self) -> Option<&ApplicationContext> {
        self.context.as_ref()?.application.as_ref()
    }

    pub fn environment_name(&self) -> Option<&str> {
        self.context.as_ref()?.environment_name.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContext {
    pub application: Option<ApplicationContext>,
    pub environment_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationContext {
    pub name: String,

    /// Name of the VCS host configuration this application belongs to.
    pub vcs_server: String,

    /// `owner/repo` as the host knows it.
    pub repository_full_name: String,
}
