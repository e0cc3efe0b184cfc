//! Execution logging and the job run wrapper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::definition::{ExecutionRecord, ExecutionStatus, JobDefinition};
use crate::error::SchedulerError;
use crate::registry::JobRegistry;
use crate::runnable::RunnableRegistry;

/// Shared read-only/maintenance switch.
///
/// While active, job execution is refused before any state change; the
/// refusal is surfaced to the caller and never retried here.
#[derive(Clone, Default)]
pub struct MaintenanceFlag {
    active: Arc<AtomicBool>,
}

impl MaintenanceFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Result of one job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The runnable raised; the diagnostic is persisted on the execution
    /// record and the failure does not propagate further.
    Failed { diagnostic: String },
}

/// Records start/complete/failed transitions durably.
pub struct ExecutionLogger {
    registry: Arc<dyn JobRegistry>,
    clock: Arc<dyn Clock>,
}

impl ExecutionLogger {
    pub fn new(registry: Arc<dyn JobRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// Record the start of a run.
    ///
    /// `last_execution` advances and is committed regardless of whether
    /// logging is enabled: due-ness must reflect the attempt even if the run
    /// later fails, so a failing job cannot re-fire immediately.
    pub async fn on_start(&self, job: &mut JobDefinition) -> Result<(), SchedulerError> {
        let now = self.clock.now();
        job.last_execution = Some(now);
        self.registry.update(job).await?;
        info!("Scheduled job Start: {}", job.method_ref);

        if job.logging_enabled {
            let record = ExecutionRecord::start(&job.identifier, now);
            self.registry.insert_record(&record).await?;
        }
        Ok(())
    }

    /// Record successful completion.
    pub async fn on_complete(
        &self,
        job: &JobDefinition,
        debug_trace: Option<String>,
    ) -> Result<(), SchedulerError> {
        info!("Scheduled job Complete: {}", job.method_ref);
        if !job.logging_enabled {
            return Ok(());
        }
        let mut record = self.open_record(job).await?;
        record.status = ExecutionStatus::Complete;
        if debug_trace.is_some() {
            record.debug_trace = debug_trace;
        }
        self.registry.update_record(&record).await
    }

    /// Record a failed run with its diagnostic text.
    pub async fn on_failed(
        &self,
        job: &JobDefinition,
        diagnostic: impl Into<String>,
    ) -> Result<(), SchedulerError> {
        info!("Scheduled job Failed: {}", job.method_ref);
        if !job.logging_enabled {
            return Ok(());
        }
        let mut record = self.open_record(job).await?;
        record.status = ExecutionStatus::Failed;
        record.diagnostic_text = Some(diagnostic.into());
        self.registry.update_record(&record).await
    }

    /// The record opened by `on_start`, or a fresh one if it is missing
    /// (e.g. logging was switched on mid-run).
    async fn open_record(&self, job: &JobDefinition) -> Result<ExecutionRecord, SchedulerError> {
        match self.registry.latest_open_record(&job.identifier).await? {
            Some(record) => Ok(record),
            None => {
                warn!("No open execution record for '{}', creating one", job.identifier);
                let record = ExecutionRecord::start(&job.identifier, self.clock.now());
                self.registry.insert_record(&record).await?;
                Ok(record)
            }
        }
    }
}

/// Resolves and runs a job on behalf of a queue consumer.
pub struct JobRunner {
    registry: Arc<dyn JobRegistry>,
    runnables: Arc<dyn RunnableRegistry>,
    logger: ExecutionLogger,
    maintenance: MaintenanceFlag,
}

impl JobRunner {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        runnables: Arc<dyn RunnableRegistry>,
        logger: ExecutionLogger,
        maintenance: MaintenanceFlag,
    ) -> Self {
        Self {
            registry,
            runnables,
            logger,
            maintenance,
        }
    }

    /// Run a job to completion.
    ///
    /// Fails fast in maintenance mode and on unresolved method references.
    /// A failure inside the runnable itself is converted into durable log
    /// state and returned as [`RunOutcome::Failed`], never as `Err`; the next
    /// cron occurrence, computed from the already-advanced `last_execution`,
    /// is the only retry mechanism.
    pub async fn run(&self, identifier: &str) -> Result<RunOutcome, SchedulerError> {
        if self.maintenance.active() {
            return Err(SchedulerError::MaintenanceMode);
        }

        let mut job = self
            .registry
            .get(identifier)
            .await?
            .ok_or_else(|| SchedulerError::JobNotFound(identifier.to_string()))?;

        let runnable = self
            .runnables
            .resolve(&job.method_ref)
            .ok_or_else(|| SchedulerError::UnresolvedRunnable(job.method_ref.clone()))?;

        self.logger.on_start(&mut job).await?;

        match runnable.run().await {
            Ok(()) => {
                self.logger.on_complete(&job, None).await?;
                Ok(RunOutcome::Completed)
            }
            Err(diagnostic) => {
                error!("Scheduled job '{}' failed: {}", job.identifier, diagnostic);
                self.logger.on_failed(&job, diagnostic.clone()).await?;
                Ok(RunOutcome::Failed { diagnostic })
            }
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
