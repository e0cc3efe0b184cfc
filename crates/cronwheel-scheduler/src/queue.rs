//! Work-queue contract consumed by the scheduler.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::SchedulerError;

/// Queue lane a job is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lane {
    /// Short-lived jobs.
    Default,
    /// Long-running and maintenance jobs.
    Long,
}

impl Lane {
    /// Wire name of the lane.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Default => "default",
            Lane::Long => "long",
        }
    }
}

/// Payload handed to the queue for a scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    /// Method reference the executor should resolve and run.
    pub method_ref: String,
}

/// External work queue contract.
///
/// Dedup is best-effort unless the implementation makes `enqueue` an atomic
/// insert-if-absent on the dedup key: the scheduler's `exists`-then-`enqueue`
/// sequence is not atomic on its own, and two overlapping driver ticks may
/// both observe the key absent. Implementations backed by a shared queue
/// should provide a check-and-set; otherwise the guarantee degrades to
/// at-most-mostly-once.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Submit a job. Returns whether the submission was accepted; `false`
    /// means the dedup key was already in flight.
    async fn enqueue(
        &self,
        lane: Lane,
        dedup_key: &str,
        payload: JobPayload,
    ) -> Result<bool, SchedulerError>;

    /// Whether a submission with this dedup key is currently in flight.
    async fn exists(&self, dedup_key: &str) -> Result<bool, SchedulerError>;
}

/// In-process queue front.
///
/// Tracks in-flight dedup keys and the submissions routed to each lane.
/// `enqueue` is an atomic insert-if-absent under one write lock, so within a
/// single process dedup is exact. Doubles as the test queue.
#[derive(Default)]
pub struct MemoryWorkQueue {
    state: RwLock<QueueState>,
}

#[derive(Default)]
struct QueueState {
    in_flight: HashSet<String>,
    submissions: HashMap<&'static str, Vec<JobPayload>>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the in-flight marker once the executor picks the job up.
    pub async fn complete(&self, dedup_key: &str) {
        let mut state = self.state.write().await;
        state.in_flight.remove(dedup_key);
    }

    /// Submissions routed to a lane so far.
    pub async fn submissions(&self, lane: Lane) -> Vec<JobPayload> {
        let state = self.state.read().await;
        state.submissions.get(lane.as_str()).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(
        &self,
        lane: Lane,
        dedup_key: &str,
        payload: JobPayload,
    ) -> Result<bool, SchedulerError> {
        let mut state = self.state.write().await;
        if !state.in_flight.insert(dedup_key.to_string()) {
            return Ok(false);
        }
        debug!("Enqueueing {} on lane '{}'", dedup_key, lane.as_str());
        state.submissions.entry(lane.as_str()).or_default().push(payload);
        Ok(true)
    }

    async fn exists(&self, dedup_key: &str) -> Result<bool, SchedulerError> {
        let state = self.state.read().await;
        Ok(state.in_flight.contains(dedup_key))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
