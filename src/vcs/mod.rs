//! Contracts for talking to the external version-control host: the commit
//! status projection we read back from it, the client used to read/write
//! statuses, and the retry queue failed pushes are parked on.

use crate::events::Event;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::mpsc;
use tracing::error;

/// Represents different VCS host failure possibilities.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VcsError {
    #[error("could not list commit statuses; {0}")]
    Fetch(String),

    #[error("could not push commit status; {0}")]
    Push(String),

    #[error("credentials rejected by the vcs host; {0}")]
    Unauthorized(String),
}

/// A commit status state, mapped from the host's own vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum RemoteState {
    /// Hosts report this as `pending` or `building`.
    #[strum(to_string = "building", serialize = "pending")]
    Building,

    #[strum(to_string = "success")]
    Success,

    #[strum(to_string = "fail", serialize = "failure", serialize = "error")]
    Fail,

    #[strum(to_string = "skipped", serialize = "neutral")]
    Skipped,
}

/// A read-only projection of one status entry on a commit. The description is
/// the correlation key used to find our own prior entry among entries pushed
/// by other systems; the host's entry ids are never relied on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub description: String,
    pub state: RemoteState,
}

/// An authorized client for one configured VCS host.
#[async_trait]
pub trait VcsClient: Send + Sync {
    async fn list_statuses(
        &self,
        repo_full_name: &str,
        commit_hash: &str,
    ) -> Result<Vec<CommitStatus>, VcsError>;

    async fn set_status(&self, event: &Event) -> Result<(), VcsError>;
}

/// Parking lot for status pushes that failed. Enqueueing is fire-and-forget;
/// the reconciler never observes the outcome of a replay.
#[async_trait]
pub trait RetryQueue: Send + Sync {
    async fn retry_event(&self, event: Event, error: VcsError);
}

/// Bounded channel-backed retry queue. Draining and replaying the queued
/// pushes is the embedder's concern; when the queue is full the enqueue is
/// dropped with an error log rather than blocking the reconciler.
#[derive(Debug, Clone)]
pub struct ChannelRetryQueue {
    tx: mpsc::Sender<(Event, VcsError)>,
}

impl ChannelRetryQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(Event, VcsError)>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl RetryQueue for ChannelRetryQueue {
    async fn retry_event(&self, event: Event, error: VcsError) {
        if let Err(e) = self.tx.try_send((event, error)) {
            error!(error = %e, "could not enqueue failed status push for retry");
        }
    }
}
