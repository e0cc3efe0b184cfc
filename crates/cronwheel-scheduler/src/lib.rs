//! # Cronwheel Scheduler
//!
//! The stateful core of the cronwheel recurring job scheduler.
//!
//! ## Features
//!
//! - Durable job registry with pluggable persistence (memory / JSON files)
//! - Due checking against the last-execution anchor
//! - Dedup-keyed enqueue into an external work queue
//! - Start/Complete/Failed execution logging
//! - Declarative sync of the registry against configured job sets
//!
//! The periodic driver, the queue's execution engine and the admin surface
//! live outside this crate; it only consumes their contracts.

pub mod clock;
pub mod config;
pub mod definition;
pub mod due;
pub mod error;
pub mod execution;
pub mod queue;
pub mod registry;
pub mod runnable;
pub mod scheduler;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SchedulerConfig;
pub use definition::{ExecutionRecord, ExecutionStatus, JobDefinition};
pub use due::{DueChecker, EnqueueOutcome};
pub use error::SchedulerError;
pub use execution::{ExecutionLogger, JobRunner, MaintenanceFlag, RunOutcome};
pub use queue::{JobPayload, Lane, MemoryWorkQueue, WorkQueue};
pub use registry::{FileJobRegistry, JobRegistry, MemoryJobRegistry};
pub use runnable::{Runnable, RunnableRegistry, StaticRunnableRegistry};
pub use scheduler::Scheduler;
pub use sync::{DeclaredJobs, SyncEngine, SyncReport};
