//! Scheduler facade and the periodic driver loop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{self, Duration};
use tracing::{error, info};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::definition::JobDefinition;
use crate::due::{DueChecker, EnqueueOutcome};
use crate::error::SchedulerError;
use crate::execution::{ExecutionLogger, JobRunner, MaintenanceFlag, RunOutcome};
use crate::queue::WorkQueue;
use crate::registry::JobRegistry;
use crate::runnable::RunnableRegistry;
use crate::sync::{DeclaredJobs, SyncEngine, SyncReport};

/// Wires registry, queue, clock and runnables into one scheduling surface.
pub struct Scheduler {
    registry: Arc<dyn JobRegistry>,
    due: DueChecker,
    runner: JobRunner,
    sync: SyncEngine,
    maintenance: MaintenanceFlag,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        queue: Arc<dyn WorkQueue>,
        runnables: Arc<dyn RunnableRegistry>,
        clock: Arc<dyn Clock>,
        tenant_id: impl Into<String>,
        config: SchedulerConfig,
    ) -> Self {
        let tenant_id = tenant_id.into();
        let maintenance = MaintenanceFlag::new();
        let due = DueChecker::new(
            registry.clone(),
            queue,
            clock.clone(),
            tenant_id,
            config.clone(),
        );
        let logger = ExecutionLogger::new(registry.clone(), clock.clone());
        let runner = JobRunner::new(
            registry.clone(),
            runnables.clone(),
            logger,
            maintenance.clone(),
        );
        let sync = SyncEngine::new(registry.clone(), runnables, clock);
        Self {
            registry,
            due,
            runner,
            sync,
            maintenance,
            config,
        }
    }

    /// Handle to the maintenance switch.
    pub fn maintenance(&self) -> MaintenanceFlag {
        self.maintenance.clone()
    }

    /// Reconcile the registry against a declared job set.
    pub async fn sync(&self, declared: &DeclaredJobs) -> Result<SyncReport, SchedulerError> {
        self.sync.sync(declared).await
    }

    /// Enabled jobs due at `now`.
    pub async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<JobDefinition>, SchedulerError> {
        self.due.list_due(now).await
    }

    /// Submit a job regardless of due-ness. The dedup check still applies.
    pub async fn force_run(&self, identifier: &str) -> Result<EnqueueOutcome, SchedulerError> {
        let job = self
            .registry
            .get(identifier)
            .await?
            .ok_or_else(|| SchedulerError::JobNotFound(identifier.to_string()))?;
        self.due.try_enqueue(&job, true).await
    }

    /// One sweep over the registry: enqueue everything due.
    pub async fn tick(&self) -> Result<Vec<(String, EnqueueOutcome)>, SchedulerError> {
        self.due.enqueue_due().await
    }

    /// Execute a job on behalf of a queue consumer.
    pub async fn execute(&self, identifier: &str) -> Result<RunOutcome, SchedulerError> {
        self.runner.run(identifier).await
    }

    /// Driver loop: tick at the configured interval until cancelled.
    pub async fn run(self: Arc<Self>, cancel: tokio::sync::watch::Receiver<bool>) {
        info!(
            "Scheduler started (tick interval: {}s)",
            self.config.tick_interval_secs
        );

        let mut interval = time::interval(Duration::from_secs(self.config.tick_interval_secs));
        let mut cancel = cancel;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(outcomes) => {
                            for (identifier, outcome) in outcomes {
                                info!("Tick outcome for '{}': {:?}", identifier, outcome);
                            }
                        }
                        Err(e) => error!("Scheduler tick failed: {}", e),
                    }
                }
                _ = cancel.changed() => {
                    info!("Scheduler shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
