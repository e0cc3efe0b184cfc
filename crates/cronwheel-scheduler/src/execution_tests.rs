//! Tests for execution logging and the job runner.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use cronwheel_core::Frequency;

use super::*;
use crate::clock::ManualClock;
use crate::definition::{ExecutionStatus, JobDefinition};
use crate::queue::MemoryWorkQueue;
use crate::registry::MemoryJobRegistry;
use crate::runnable::StaticRunnableRegistry;
use crate::{DueChecker, SchedulerConfig};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap()
}

struct Harness {
    registry: Arc<MemoryJobRegistry>,
    logger: ExecutionLogger,
}

fn harness() -> Harness {
    let registry = Arc::new(MemoryJobRegistry::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let logger = ExecutionLogger::new(registry.clone(), clock);
    Harness { registry, logger }
}

fn runner_with(
    registry: Arc<MemoryJobRegistry>,
    clock: Arc<ManualClock>,
    runnables: StaticRunnableRegistry,
    maintenance: MaintenanceFlag,
) -> JobRunner {
    let logger = ExecutionLogger::new(registry.clone(), clock.clone());
    JobRunner::new(registry, Arc::new(runnables), logger, maintenance)
}

#[tokio::test]
async fn test_on_start_advances_last_execution_without_logging() {
    let h = harness();
    // Continuous jobs skip record creation but still advance the anchor.
    let mut job = JobDefinition::new("ticks.process", Frequency::All, t0() - Duration::days(1));
    h.registry.insert(&job).await.unwrap();
    assert!(!job.logging_enabled);

    h.logger.on_start(&mut job).await.unwrap();

    let stored = h.registry.get(&job.identifier).await.unwrap().unwrap();
    assert_eq!(stored.last_execution, Some(t0()));
    assert!(h
        .registry
        .records_for(&job.identifier)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_start_complete_transition() {
    let h = harness();
    let mut job = JobDefinition::new("reports.digest", Frequency::Daily, t0() - Duration::days(1));
    h.registry.insert(&job).await.unwrap();

    h.logger.on_start(&mut job).await.unwrap();
    let records = h.registry.records_for(&job.identifier).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ExecutionStatus::Start);

    h.logger
        .on_complete(&job, Some("fetched 42 rows".to_string()))
        .await
        .unwrap();
    let records = h.registry.records_for(&job.identifier).await.unwrap();
    assert_eq!(records[0].status, ExecutionStatus::Complete);
    assert_eq!(records[0].debug_trace.as_deref(), Some("fetched 42 rows"));
    assert!(records[0].diagnostic_text.is_none());
}

#[tokio::test]
async fn test_start_failed_transition_captures_diagnostic() {
    let h = harness();
    let mut job = JobDefinition::new("billing.rollover", Frequency::Daily, t0() - Duration::days(1));
    h.registry.insert(&job).await.unwrap();

    h.logger.on_start(&mut job).await.unwrap();
    h.logger.on_failed(&job, "ledger out of balance").await.unwrap();

    let records = h.registry.records_for(&job.identifier).await.unwrap();
    assert_eq!(records[0].status, ExecutionStatus::Failed);
    assert_eq!(
        records[0].diagnostic_text.as_deref(),
        Some("ledger out of balance")
    );
}

#[tokio::test]
async fn test_runner_completes_job() {
    let registry = Arc::new(MemoryJobRegistry::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let job = JobDefinition::new("reports.digest", Frequency::Daily, t0() - Duration::days(1));
    registry.insert(&job).await.unwrap();

    let mut runnables = StaticRunnableRegistry::new();
    runnables.register_fn("reports.digest", || async { Ok(()) });
    let runner = runner_with(registry.clone(), clock, runnables, MaintenanceFlag::new());

    let outcome = runner.run(&job.identifier).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed);

    let stored = registry.get(&job.identifier).await.unwrap().unwrap();
    assert_eq!(stored.last_execution, Some(t0()));
    let records = registry.records_for(&job.identifier).await.unwrap();
    assert_eq!(records[0].status, ExecutionStatus::Complete);
}

#[tokio::test]
async fn test_runner_captures_failure_without_propagating() {
    let registry = Arc::new(MemoryJobRegistry::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let job = JobDefinition::new("billing.rollover", Frequency::Hourly, t0() - Duration::days(1));
    registry.insert(&job).await.unwrap();

    let mut runnables = StaticRunnableRegistry::new();
    runnables.register_fn("billing.rollover", || async {
        Err("ledger out of balance".to_string())
    });
    let runner = runner_with(registry.clone(), clock, runnables, MaintenanceFlag::new());

    let outcome = runner.run(&job.identifier).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Failed {
            diagnostic: "ledger out of balance".to_string()
        }
    );

    // last_execution advanced at Start despite the failure.
    let stored = registry.get(&job.identifier).await.unwrap().unwrap();
    assert_eq!(stored.last_execution, Some(t0()));
}

#[tokio::test]
async fn test_failure_does_not_block_rescheduling() {
    let registry = Arc::new(MemoryJobRegistry::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let job = JobDefinition::new("billing.rollover", Frequency::Hourly, t0() - Duration::days(1));
    registry.insert(&job).await.unwrap();

    let mut runnables = StaticRunnableRegistry::new();
    runnables.register_fn("billing.rollover", || async { Err("boom".to_string()) });
    let runner = runner_with(
        registry.clone(),
        clock.clone(),
        runnables,
        MaintenanceFlag::new(),
    );
    runner.run(&job.identifier).await.unwrap();

    let checker = DueChecker::new(
        registry.clone(),
        Arc::new(MemoryWorkQueue::new()),
        clock.clone(),
        "tenant-a",
        SchedulerConfig::default(),
    );
    let stored = registry.get(&job.identifier).await.unwrap().unwrap();

    // Not due right after the failed attempt...
    assert!(!checker.is_due(&stored, t0() + Duration::minutes(5)).unwrap());
    // ...but due again once the next cron boundary passes.
    assert!(checker.is_due(&stored, t0() + Duration::minutes(61)).unwrap());
}

#[tokio::test]
async fn test_maintenance_mode_refuses_execution() {
    let registry = Arc::new(MemoryJobRegistry::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let job = JobDefinition::new("reports.digest", Frequency::Daily, t0() - Duration::days(1));
    registry.insert(&job).await.unwrap();

    let mut runnables = StaticRunnableRegistry::new();
    runnables.register_fn("reports.digest", || async { Ok(()) });
    let maintenance = MaintenanceFlag::new();
    maintenance.enter();
    let runner = runner_with(registry.clone(), clock, runnables, maintenance.clone());

    assert!(matches!(
        runner.run(&job.identifier).await,
        Err(SchedulerError::MaintenanceMode)
    ));

    // Refused before any state change.
    let stored = registry.get(&job.identifier).await.unwrap().unwrap();
    assert!(stored.last_execution.is_none());

    maintenance.leave();
    assert_eq!(runner.run(&job.identifier).await.unwrap(), RunOutcome::Completed);
}

#[tokio::test]
async fn test_unresolved_runnable_is_an_error() {
    let registry = Arc::new(MemoryJobRegistry::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let job = JobDefinition::new("ghost.method", Frequency::Daily, t0());
    registry.insert(&job).await.unwrap();

    let runner = runner_with(
        registry,
        clock,
        StaticRunnableRegistry::new(),
        MaintenanceFlag::new(),
    );
    assert!(matches!(
        runner.run(&job.identifier).await,
        Err(SchedulerError::UnresolvedRunnable(_))
    ));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let runner = runner_with(
        Arc::new(MemoryJobRegistry::new()),
        Arc::new(ManualClock::new(t0())),
        StaticRunnableRegistry::new(),
        MaintenanceFlag::new(),
    );
    assert!(matches!(
        runner.run("nope").await,
        Err(SchedulerError::JobNotFound(_))
    ));
}

#[test]
fn test_maintenance_flag_round_trip() {
    let flag = MaintenanceFlag::new();
    assert!(!flag.active());
    flag.enter();
    assert!(flag.active());
    flag.leave();
    assert!(!flag.active());
}
