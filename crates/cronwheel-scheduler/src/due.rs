//! Due checking and dedup-guarded enqueueing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use cronwheel_core::{next_after, resolve as resolve_recurrence, Frequency};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::definition::JobDefinition;
use crate::error::SchedulerError;
use crate::queue::{JobPayload, WorkQueue};
use crate::registry::JobRegistry;

/// Result of one enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Submitted to the work queue.
    Enqueued,
    /// A submission with the same dedup key is already in flight.
    SkippedDuplicate,
    /// The job's next occurrence is still in the future.
    NotDue,
}

/// Evaluates due-ness per job and submits due jobs to the work queue.
///
/// Holds no lock of its own: the queue's dedup key check is the only
/// concurrency guard, so overlapping driver ticks are safe to the extent the
/// queue's check-and-set is atomic.
pub struct DueChecker {
    registry: Arc<dyn JobRegistry>,
    queue: Arc<dyn WorkQueue>,
    clock: Arc<dyn Clock>,
    tenant_id: String,
    config: SchedulerConfig,
}

impl DueChecker {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        queue: Arc<dyn WorkQueue>,
        clock: Arc<dyn Clock>,
        tenant_id: impl Into<String>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            queue,
            clock,
            tenant_id: tenant_id.into(),
            config,
        }
    }

    /// The concrete cron expression for a job: the stored override for Cron
    /// frequency, the stored cache when present, the resolver otherwise.
    pub fn resolved_cron(&self, job: &JobDefinition) -> Result<String, SchedulerError> {
        if let Some(expr) = job.cron_expression.as_deref() {
            if !expr.is_empty() {
                return Ok(expr.to_string());
            }
        }
        Ok(resolve_recurrence(
            job.frequency,
            &self.tenant_id,
            self.config.scheduler_interval_secs,
        )?)
    }

    /// Next occurrence strictly after the job's anchor.
    pub fn next_execution(&self, job: &JobDefinition) -> Result<DateTime<Utc>, SchedulerError> {
        let expr = self.resolved_cron(job)?;
        Ok(next_after(&expr, job.anchor())?)
    }

    /// Whether the job's next occurrence is at or before `now`. Disabled
    /// jobs are never due.
    pub fn is_due(&self, job: &JobDefinition, now: DateTime<Utc>) -> Result<bool, SchedulerError> {
        if !job.enabled {
            return Ok(false);
        }
        Ok(self.next_execution(job)? <= now)
    }

    /// Attempt to submit a job for execution.
    ///
    /// `force` bypasses the due check but never the dedup check.
    pub async fn try_enqueue(
        &self,
        job: &JobDefinition,
        force: bool,
    ) -> Result<EnqueueOutcome, SchedulerError> {
        if !force && !self.is_due(job, self.clock.now())? {
            return Ok(EnqueueOutcome::NotDue);
        }

        let dedup_key = job.dedup_key();
        if self.queue.exists(&dedup_key).await? {
            error!(
                "Skipped queueing {} because it was found in queue for {}",
                job.method_ref, self.tenant_id
            );
            return Ok(EnqueueOutcome::SkippedDuplicate);
        }

        let payload = JobPayload {
            method_ref: job.method_ref.clone(),
        };
        let accepted = self
            .queue
            .enqueue(job.queue_lane(), &dedup_key, payload)
            .await?;
        if !accepted {
            // Lost the race between exists() and enqueue(); same outcome.
            error!(
                "Skipped queueing {} because it was found in queue for {}",
                job.method_ref, self.tenant_id
            );
            return Ok(EnqueueOutcome::SkippedDuplicate);
        }

        debug!("Enqueued {} on lane '{}'", job.identifier, job.queue_lane().as_str());
        Ok(EnqueueOutcome::Enqueued)
    }

    /// Enabled jobs whose next occurrence is at or before `now`.
    ///
    /// Jobs with an unreadable stored expression are logged and skipped so
    /// one bad definition cannot hide the rest.
    pub async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<JobDefinition>, SchedulerError> {
        let mut due = Vec::new();
        for job in self.registry.load_all().await? {
            if !job.enabled {
                continue;
            }
            match self.is_due(&job, now) {
                Ok(true) => due.push(job),
                Ok(false) => {}
                Err(e) => {
                    warn!("Skipping '{}': {}", job.identifier, e);
                }
            }
        }
        due.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(due)
    }

    /// One scheduler tick: evaluate every registered job and submit the due
    /// ones. Returns the non-trivial outcomes.
    pub async fn enqueue_due(
        &self,
    ) -> Result<Vec<(String, EnqueueOutcome)>, SchedulerError> {
        let mut outcomes = Vec::new();
        for mut job in self.registry.load_all().await? {
            if !job.enabled {
                continue;
            }

            // Cache the derived expression onto the entity so later due
            // computations read a stable value.
            if job.cron_expression.as_deref().unwrap_or("").is_empty()
                && job.frequency != Frequency::Cron
            {
                match self.resolved_cron(&job) {
                    Ok(expr) => {
                        job.cron_expression = Some(expr);
                        self.registry.update(&job).await?;
                    }
                    Err(e) => {
                        warn!("Cannot resolve schedule for '{}': {}", job.identifier, e);
                        continue;
                    }
                }
            }

            match self.try_enqueue(&job, false).await {
                Ok(EnqueueOutcome::NotDue) => {}
                Ok(outcome) => outcomes.push((job.identifier.clone(), outcome)),
                Err(e) => {
                    warn!("Enqueue failed for '{}': {}", job.identifier, e);
                }
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
#[path = "due_tests.rs"]
mod tests;
