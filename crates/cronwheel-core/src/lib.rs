//! # Cronwheel Core
//!
//! Pure scheduling arithmetic for the cronwheel recurring job scheduler.
//!
//! ## Features
//!
//! - 5-field cron expression parsing, validation and next-occurrence evaluation
//! - Frequency taxonomy (hourly/daily/weekly/... plus long and maintenance lanes)
//! - Recurrence resolution with deterministic per-tenant maintenance offsets
//!
//! No I/O and no async: everything in this crate is a pure function over its
//! inputs, which is what keeps due-time computation stable and testable.

mod cron;
mod error;
mod frequency;
mod recurrence;

pub use cron::{next_after, validate, CronExpr};
pub use error::CoreError;
pub use frequency::Frequency;
pub use recurrence::{hourly_offset_minute, resolve};
