mod fanout;
mod identity;
mod reconcile;
mod results;

pub use self::fanout::FanoutPool;
pub use self::identity::{WorkerIdentity, WORKER_ID_CLAIM, WORKER_NAME_CLAIM};
pub use self::reconcile::should_push;

use crate::conf;
use crate::events::EventBus;
use crate::models::Project;
use crate::storage::{ResultProcessor, StorageError, Store};
use crate::vcs::{RetryQueue, VcsClient, VcsError};
use dashmap::DashMap;
use std::sync::Arc;

/// Failures surfaced by the synchronous ingestion and reconciliation paths.
/// Failures inside detached fan-out are logged, never returned.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The request did not carry both worker identity claims. Terminal; the
    /// request never reaches storage.
    #[error("request did not carry an authenticated worker identity")]
    Unauthorized,

    /// A project or worker record needed by the request could not be loaded.
    #[error("could not load {entity}; {source}")]
    Load {
        entity: &'static str,
        source: StorageError,
    },

    /// Result persistence failed. Surfaced to the worker so it can retry its
    /// submission.
    #[error("could not process job result; {0}")]
    Processing(StorageError),

    /// The remote status list was unreachable. Aborts one reconciliation
    /// pass; the whole pass is safe to retry later.
    #[error("could not fetch commit statuses from the vcs host; {0}")]
    StatusFetch(VcsError),
}

/// The result-ingestion core. One instance is shared across all inbound
/// worker calls; every piece of mutable state lives behind the storage layer.
pub struct Api {
    pub(crate) conf: conf::Config,

    /// The orchestration engine's backend storage.
    pub(crate) store: Arc<dyn Store>,

    /// Persists worker-reported outcomes and reports what they touched.
    pub(crate) processor: Arc<dyn ResultProcessor>,

    /// Used to notify subscribers of run/node/job state changes.
    pub(crate) event_bus: EventBus,

    /// Authorized clients per configured VCS host, keyed by server name.
    pub(crate) vcs_clients: DashMap<String, Arc<dyn VcsClient>>,

    /// Failed status pushes are parked here for later replay.
    pub(crate) retry_queue: Arc<dyn RetryQueue>,

    /// Detached event fan-out workers.
    pub(crate) fanout: FanoutPool,
}

impl Api {
    pub fn new(
        conf: conf::Config,
        store: Arc<dyn Store>,
        processor: Arc<dyn ResultProcessor>,
        retry_queue: Arc<dyn RetryQueue>,
    ) -> Self {
        let event_bus = EventBus::new(conf.event_bus.channel_capacity);
        let fanout = FanoutPool::start(
            conf.fanout.workers,
            conf.fanout.queue_capacity,
            store.clone(),
            event_bus.clone(),
        );

        Self {
            conf,
            store,
            processor,
            event_bus,
            vcs_clients: DashMap::new(),
            retry_queue,
            fanout,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn register_vcs_client(&self, server_name: &str, client: Arc<dyn VcsClient>) {
        self.vcs_clients.insert(server_name.to_string(), client);
    }

    /// Resolve a client for a VCS host, but only if the project actually
    /// links to that host.
    pub(crate) fn authorized_client(
        &self,
        project: &Project,
        server_name: &str,
    ) -> Option<Arc<dyn VcsClient>> {
        project.vcs_server(server_name)?;
        self.vcs_clients
            .get(server_name)
            .map(|client| client.value().clone())
    }
}

#[cfg(test)]
pub(crate) mod test_harness;
