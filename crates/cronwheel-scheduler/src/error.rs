//! Scheduler errors.

use thiserror::Error;

use cronwheel_core::CoreError;

/// Scheduler error types.
///
/// A duplicate in-flight job and a failed run are outcomes, not errors; they
/// surface as [`crate::due::EnqueueOutcome`] and [`crate::execution::RunOutcome`]
/// so one misbehaving job can never halt a scheduler sweep.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Malformed cron expression or frequency, rejected at write time.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// A job with this identifier already exists in the registry.
    #[error("job already registered: {0}")]
    DuplicateIdentifier(String),

    /// No job with this identifier.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Declared method reference does not resolve to a runnable.
    #[error("method does not resolve to a runnable: {0}")]
    UnresolvedRunnable(String),

    /// Execution refused because the system is in maintenance mode.
    #[error("scheduled jobs can't run in maintenance mode")]
    MaintenanceMode,

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(String),

    /// Work queue failure.
    #[error("queue error: {0}")]
    Queue(String),
}
