use crate::api::{Api, ApiError, WorkerIdentity};
use crate::models::JobResult;
use std::collections::HashMap;
use tracing::{debug, warn};

impl Api {
    /// Accept one job result from a worker.
    ///
    /// The identity claims are checked before anything else; a request
    /// missing either claim fails `Unauthorized` without touching storage.
    /// The call returns as soon as the result is durably processed. Event
    /// fan-out runs detached and is never awaited; its failures can at most
    /// delay a notification, never fail a submission that already persisted.
    pub async fn submit_result(
        &self,
        claims: &HashMap<String, String>,
        result: JobResult,
    ) -> Result<(), ApiError> {
        let identity = WorkerIdentity::from_claims(claims)?;
        self.ingest_result(&identity, result).await
    }

    async fn ingest_result(
        &self,
        identity: &WorkerIdentity,
        result: JobResult,
    ) -> Result<(), ApiError> {
        debug!(
            worker = %identity.name,
            job_run_id = result.job_run_id,
            status = %result.status,
            "received job result"
        );

        let project = self
            .store
            .load_project_by_job_run_id(result.job_run_id)
            .await
            .map_err(|e| ApiError::Load {
                entity: "project",
                source: e,
            })?;

        let worker = self
            .store
            .load_worker(&identity.id)
            .await
            .map_err(|e| ApiError::Load {
                entity: "worker",
                source: e,
            })?;

        let report = self
            .processor
            .process(&project, &worker, &result)
            .await
            .map_err(ApiError::Processing)?;

        // Best effort; a stale commit linkage only delays the next
        // reconciliation pass.
        if let Err(e) = self
            .store
            .resync_node_run_commits(&project, report.node_runs())
            .await
        {
            warn!(
                error = %e,
                project = %project.key,
                "could not resync node run commit linkage"
            );
        }

        self.fanout.submit(report, &project.key);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_harness::{
        sample_node_run, sample_project, sample_run, sample_worker, RecordingRetryQueue,
        TestProcessor, TestStore,
    };
    use crate::api::{WORKER_ID_CLAIM, WORKER_NAME_CLAIM};
    use crate::conf::Config;
    use crate::models::{ProcessorReport, Status};
    use std::sync::Arc;

    fn worker_claims() -> HashMap<String, String> {
        HashMap::from([
            (WORKER_NAME_CLAIM.to_string(), "worker-7".to_string()),
            (WORKER_ID_CLAIM.to_string(), "abc-123".to_string()),
        ])
    }

    fn api_with(store: TestStore, processor: TestProcessor) -> (Api, Arc<TestStore>) {
        let store = Arc::new(store);
        let api = Api::new(
            Config::default(),
            store.clone(),
            Arc::new(processor),
            Arc::new(RecordingRetryQueue::new()),
        );
        (api, store)
    }

    fn sample_result() -> JobResult {
        JobResult {
            job_run_id: 900,
            status: Status::Success,
            done: 1_700_000_600,
            reason: None,
        }
    }

    #[tokio::test]
    async fn missing_claim_is_unauthorized_before_any_storage_access() {
        let (api, store) = api_with(
            TestStore::new().with_project(sample_project()),
            TestProcessor::returning(ProcessorReport::new()),
        );

        let claims = HashMap::from([(WORKER_NAME_CLAIM.to_string(), "worker-7".to_string())]);

        let err = api.submit_result(&claims, sample_result()).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn accepted_result_triggers_fanout() {
        let run = sample_run();
        let mut report = ProcessorReport::new();
        report.add_workflow_run(run.clone());
        report.add_node_run(sample_node_run(1, 0, Status::Success));

        let (api, _store) = api_with(
            TestStore::new()
                .with_project(sample_project())
                .with_worker(sample_worker())
                .with_run(run),
            TestProcessor::returning(report),
        );
        let mut subscription = api.event_bus().subscribe();

        api.submit_result(&worker_claims(), sample_result())
            .await
            .unwrap();

        // Fan-out is detached; wait for the first event to come through.
        let event = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            subscription.recv(),
        )
        .await
        .expect("fan-out did not publish in time")
        .unwrap();

        assert_eq!(event.event_type, "run_workflow");
        assert_eq!(event.tags.project_key, "PROJ");
    }

    #[tokio::test]
    async fn unknown_project_fails_the_request() {
        let (api, _store) = api_with(
            TestStore::new().with_worker(sample_worker()),
            TestProcessor::returning(ProcessorReport::new()),
        );

        let err = api
            .submit_result(&worker_claims(), sample_result())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Load { entity: "project", .. }));
    }

    #[tokio::test]
    async fn processing_failure_is_surfaced_and_nothing_is_published() {
        let (api, _store) = api_with(
            TestStore::new()
                .with_project(sample_project())
                .with_worker(sample_worker()),
            TestProcessor::failing(),
        );
        let mut subscription = api.event_bus().subscribe();

        let err = api
            .submit_result(&worker_claims(), sample_result())
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Processing(_)));
        assert!(subscription.try_recv().is_err());
    }
}
