//! Core scheduling errors.

use thiserror::Error;

/// Errors from cron evaluation and recurrence resolution.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Expression does not conform to the 5-field cron grammar.
    #[error("'{expr}' is not a valid cron expression: {reason}")]
    InvalidExpression { expr: String, reason: String },

    /// A Cron-frequency job has no stored expression to resolve.
    #[error("cron expression is required for jobs with Cron frequency")]
    MissingCronExpression,

    /// The schedule yields no occurrence after the anchor.
    #[error("'{expr}' has no occurrence after the given anchor")]
    PastEndOfSchedule { expr: String },

    /// Frequency label or event-class key is not recognised.
    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),
}
