use crate::events::EventBus;
use crate::models::ProcessorReport;
use crate::storage::Store;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

struct FanoutJob {
    report: ProcessorReport,
    project_key: String,
}

/// A bounded pool of background workers that turn accepted processor reports
/// into published events. Submissions are detached: the submitting request
/// returns immediately and its cancellation cannot cancel a queued job.
#[derive(Clone)]
pub struct FanoutPool {
    tx: mpsc::Sender<FanoutJob>,
}

impl FanoutPool {
    pub fn start(
        workers: usize,
        queue_capacity: usize,
        store: Arc<dyn Store>,
        event_bus: EventBus,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<FanoutJob>(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for _ in 0..workers.max(1) {
            let rx = rx.clone();
            let store = store.clone();
            let event_bus = event_bus.clone();

            tokio::spawn(async move {
                loop {
                    // Hold the lock only long enough to pull one job.
                    let job = rx.lock().await.recv().await;

                    match job {
                        Some(job) => {
                            send_report_events(
                                store.as_ref(),
                                &event_bus,
                                &job.report,
                                &job.project_key,
                            )
                            .await
                        }
                        None => break,
                    }
                }
            });
        }

        Self { tx }
    }

    /// Queue a report for fan-out. Never blocks; when the queue is full the
    /// report's events are dropped with an error log, the worker's result is
    /// already durable either way.
    pub fn submit(&self, report: ProcessorReport, project_key: &str) {
        if report.is_empty() {
            return;
        }

        let job = FanoutJob {
            report,
            project_key: project_key.to_string(),
        };

        if let Err(e) = self.tx.try_send(job) {
            error!(error = %e, "could not queue processor report for event fan-out");
        }
    }
}

/// Publish events for everything one processor report touched.
///
/// The report is only a worklist: node and job runs are reloaded fresh from
/// storage so the published state reflects what is authoritative now, not
/// what processing saw. Individual reload failures are logged and skipped so
/// one broken entity never silences its siblings. Within one call events go
/// out workflow-runs first, then node-runs, then job-runs, each in report
/// order.
pub(crate) async fn send_report_events(
    store: &dyn Store,
    event_bus: &EventBus,
    report: &ProcessorReport,
    project_key: &str,
) {
    // Run-level events carry coarse state only, the report's copy suffices.
    for run in report.workflow_runs() {
        event_bus.publish_workflow_run(run, project_key);
    }

    for node_run in report.node_runs() {
        let run = match store.load_run(node_run.workflow_run_id).await {
            Ok(run) => run,
            Err(e) => {
                warn!(
                    error = %e,
                    workflow_run_id = node_run.workflow_run_id,
                    "could not load workflow run for node run event"
                );
                continue;
            }
        };

        // A sub-run is its own baseline; there is no distinct prior state to
        // diff against.
        let previous = if node_run.sub_number > 0 {
            Some(node_run.clone())
        } else {
            match run.workflow.node(node_run.workflow_node_id) {
                Some(node) => {
                    match store.previous_node_run(node_run, node.id, run.workflow.id).await {
                        Ok(previous) => Some(previous),
                        Err(e) => {
                            debug!(
                                error = %e,
                                node_run_id = node_run.id,
                                "could not load previous node run"
                            );
                            None
                        }
                    }
                }
                None => {
                    warn!(
                        workflow_node_id = node_run.workflow_node_id,
                        workflow = %run.workflow.name,
                        "could not find node in workflow"
                    );
                    None
                }
            }
        };

        event_bus.publish_workflow_node_run(node_run, &run, previous.as_ref(), project_key);
    }

    for job_run in report.job_runs() {
        let node_run = match store.load_node_run(job_run.workflow_node_run_id).await {
            Ok(node_run) => node_run,
            Err(e) => {
                warn!(
                    error = %e,
                    node_run_id = job_run.workflow_node_run_id,
                    "could not load node run for job run event"
                );
                continue;
            }
        };

        let run = match store.load_run(node_run.workflow_run_id).await {
            Ok(run) => run,
            Err(e) => {
                warn!(
                    error = %e,
                    workflow_run_id = node_run.workflow_run_id,
                    "could not load workflow run for job run event"
                );
                continue;
            }
        };

        // Subscribers distinguish "job completed" from "node completed"; the
        // node event that follows carries no previous-run comparison.
        event_bus.publish_workflow_node_job_run(project_key, job_run, &node_run, &run);
        event_bus.publish_workflow_node_run(&node_run, &run, None, project_key);
    }
}
