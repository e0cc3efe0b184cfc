//! Job definition and execution record entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cronwheel_core::{validate, Frequency};

use crate::error::SchedulerError;
use crate::queue::Lane;

/// Prefix of the work-queue dedup key for scheduled jobs.
const DEDUP_KEY_PREFIX: &str = "scheduled_job::";

/// A registered recurring job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Unique registry key, derived from the method reference.
    pub identifier: String,
    /// Fully-qualified reference to the runnable unit; opaque to the
    /// scheduler, resolved by the runnable registry.
    pub method_ref: String,
    /// Recurrence class.
    pub frequency: Frequency,
    /// Stored cron expression. Required for `Cron` frequency; for other
    /// frequencies it caches the resolved expression.
    pub cron_expression: Option<String>,
    /// When the job last started executing.
    pub last_execution: Option<DateTime<Utc>>,
    /// When the definition was created; the due-ness anchor on cold start.
    pub creation_time: DateTime<Utc>,
    /// Whether execution records are written. Forced on for everything
    /// except continuous (`All`) jobs.
    pub logging_enabled: bool,
    /// Disabled jobs are never evaluated for due-ness.
    pub enabled: bool,
    /// Back-reference to an owning scheduler event; exempts the job from
    /// sync pruning.
    pub linked_scheduler_event: Option<String>,
    /// Back-reference to an owning script; exempts the job from sync pruning.
    pub linked_script: Option<String>,
}

impl JobDefinition {
    /// Create a definition for a method reference.
    ///
    /// The identifier is the last two dotted segments of the reference, which
    /// keeps registry keys short while staying unique within a tenant's
    /// method namespace.
    pub fn new(method_ref: impl Into<String>, frequency: Frequency, created_at: DateTime<Utc>) -> Self {
        let method_ref = method_ref.into();
        Self {
            identifier: derive_identifier(&method_ref),
            method_ref,
            frequency,
            cron_expression: None,
            last_execution: None,
            creation_time: created_at,
            logging_enabled: frequency.forces_logging(),
            enabled: true,
            linked_scheduler_event: None,
            linked_script: None,
        }
    }

    /// Set the stored cron expression.
    pub fn with_cron_expression(mut self, expr: impl Into<String>) -> Self {
        let expr = expr.into();
        self.cron_expression = if expr.is_empty() { None } else { Some(expr) };
        self
    }

    /// Set enabled state.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Mark the job as owned by a scheduler event.
    pub fn with_scheduler_event(mut self, event: impl Into<String>) -> Self {
        self.linked_scheduler_event = Some(event.into());
        self
    }

    /// Mark the job as owned by a script.
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.linked_script = Some(script.into());
        self
    }

    /// Validate the definition before it is written to the registry.
    ///
    /// Cron-frequency jobs must carry a syntactically valid 5-field
    /// expression; malformed input is rejected here, never at scheduling
    /// time. Logging is re-forced for non-continuous frequencies.
    pub fn validate(&mut self) -> Result<(), SchedulerError> {
        if self.frequency.forces_logging() {
            self.logging_enabled = true;
        }

        if self.frequency == Frequency::Cron {
            match self.cron_expression.as_deref() {
                None | Some("") => {
                    return Err(SchedulerError::Invalid(
                        cronwheel_core::CoreError::MissingCronExpression,
                    ))
                }
                Some(expr) => validate(expr)?,
            }
        }

        Ok(())
    }

    /// Dedup key used by the work queue to keep at most one in-flight
    /// submission per job.
    pub fn dedup_key(&self) -> String {
        format!("{}{}", DEDUP_KEY_PREFIX, self.method_ref)
    }

    /// Queue lane this job is routed to.
    pub fn queue_lane(&self) -> Lane {
        if self.frequency.is_long_running() {
            Lane::Long
        } else {
            Lane::Default
        }
    }

    /// Reference timestamp for next-occurrence computation.
    ///
    /// Cold starts anchor on creation time: "now" would let long-period jobs
    /// slip past the scheduler interval and never start, while a fixed old
    /// epoch would fire the whole backlog immediately.
    pub fn anchor(&self) -> DateTime<Utc> {
        self.last_execution.unwrap_or(self.creation_time)
    }

    /// Whether an external owner exempts this job from sync pruning.
    pub fn externally_owned(&self) -> bool {
        self.linked_scheduler_event.is_some() || self.linked_script.is_some()
    }
}

/// Derive a registry identifier from a dotted method reference.
fn derive_identifier(method_ref: &str) -> String {
    let segments: Vec<&str> = method_ref.rsplit('.').take(2).collect();
    segments.into_iter().rev().collect::<Vec<_>>().join(".")
}

/// Status of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Start,
    Complete,
    Failed,
}

/// Durable record of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// Identifier of the job this record belongs to.
    pub job_identifier: String,
    /// Current transition state.
    pub status: ExecutionStatus,
    /// When the attempt started.
    pub timestamp: DateTime<Utc>,
    /// Failure details, present only on `Failed`.
    pub diagnostic_text: Option<String>,
    /// Captured diagnostic output, if any.
    pub debug_trace: Option<String>,
}

impl ExecutionRecord {
    /// Create a fresh `Start` record.
    pub fn start(job_identifier: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_identifier: job_identifier.into(),
            status: ExecutionStatus::Start,
            timestamp: at,
            diagnostic_text: None,
            debug_trace: None,
        }
    }

    /// Whether this record is still awaiting a terminal transition.
    pub fn open(&self) -> bool {
        self.status == ExecutionStatus::Start
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
