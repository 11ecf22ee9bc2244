use crate::api::{Api, ApiError};
use crate::events::{Event, Kind, NodeRunPayload, Tags};
use crate::models::{current_node_run, Project, Status, WorkflowRun};
use crate::vcs::RemoteState;
use tracing::{debug, error, warn};

impl Api {
    /// Compare each node's latest run against the statuses already on its
    /// commit and push a corrected status wherever the two diverge.
    ///
    /// Only terminal, repository-linked node runs are considered. If any
    /// eligible node lacks an authorized VCS client the whole run's
    /// reconciliation is abandoned before a single status goes out; a graph
    /// that cannot be reconciled completely should not be reconciled
    /// partially. Fetch failures abort the pass and propagate so the caller
    /// can retry the pass later; push failures are parked on the retry queue
    /// and never abort sibling nodes.
    pub async fn resync_commit_status(
        &self,
        project: &Project,
        run: &WorkflowRun,
    ) -> Result<(), ApiError> {
        let mut candidates = Vec::new();

        for (node_id, node_runs) in &run.node_runs {
            let Some(node_run) = current_node_run(node_runs) else {
                continue;
            };
            if !node_run.status.is_terminal() {
                continue;
            }

            let Some(node) = run.workflow.node(*node_id) else {
                warn!(
                    workflow_node_id = node_id,
                    workflow = %run.workflow.name,
                    "could not find node in workflow"
                );
                continue;
            };
            if !node.is_linked_to_repo() {
                continue;
            }
            let Some(application) = node.application() else {
                continue;
            };

            let Some(client) = self.authorized_client(project, &application.vcs_server) else {
                debug!(
                    project = %project.key,
                    vcs_server = %application.vcs_server,
                    "no authorized vcs client configured; abandoning reconciliation for this run"
                );
                return Ok(());
            };

            candidates.push((node, node_run, application, client));
        }

        for (node, node_run, application, client) in candidates {
            let statuses = client
                .list_statuses(&application.repository_full_name, &node_run.vcs_hash)
                .await
                .map_err(ApiError::StatusFetch)?;

            let expected =
                self.commit_status_description(&project.key, &run.workflow.name, &node.name);
            let remote = statuses
                .iter()
                .find(|status| status.description == expected)
                .map(|status| status.state);

            if !should_push(remote, node_run.status) {
                continue;
            }

            let payload = NodeRunPayload::new(node_run, run, None);
            let tags = Tags::for_node(&project.key, run, node.id);
            let event = Event::new(Kind::RunWorkflowNode(Box::new(payload)), tags);

            debug!(
                node_run_id = node_run.id,
                status = %node_run.status,
                "pushing corrected commit status"
            );

            if let Err(e) = client.set_status(&event).await {
                error!(
                    error = %e,
                    node_run_id = node_run.id,
                    "could not push commit status; queueing for retry"
                );
                self.retry_queue.retry_event(event, e).await;
            }
        }

        Ok(())
    }

    /// The description doubles as the correlation key for finding our prior
    /// entry among statuses pushed by other systems.
    pub(crate) fn commit_status_description(
        &self,
        project_key: &str,
        workflow_name: &str,
        node_name: &str,
    ) -> String {
        format!(
            "{}/{}-{}-{}",
            self.conf.vcs.status_prefix, project_key, workflow_name, node_name
        )
    }
}

/// Decision table keyed by (remote state, local status). `None` means no
/// entry of ours exists on the commit yet. A remote still marked building is
/// always refreshed since the local run has since reached a terminal state.
pub fn should_push(remote: Option<RemoteState>, local: Status) -> bool {
    match remote {
        None => true,
        Some(RemoteState::Building) => true,
        Some(RemoteState::Success) => local != Status::Success,
        Some(RemoteState::Fail) => local != Status::Fail,
        Some(RemoteState::Skipped) => {
            !matches!(local, Status::Disabled | Status::NeverBuilt | Status::Skipped)
        }
    }
}
