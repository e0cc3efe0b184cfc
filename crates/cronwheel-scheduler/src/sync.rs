//! Declarative registry reconciliation.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cronwheel_core::Frequency;

use crate::clock::Clock;
use crate::definition::JobDefinition;
use crate::error::SchedulerError;
use crate::registry::JobRegistry;
use crate::runnable::RunnableRegistry;

/// Declarative job set, keyed by event class plus an explicit cron section.
///
/// ```toml
/// [events]
/// daily = ["billing.rollover", "reports.nightly_digest"]
/// hourly_maintenance = ["cache.evict_stale"]
///
/// [cron]
/// "*/10 * * * *" = ["metrics.flush"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclaredJobs {
    /// Event-class key (`hourly`, `daily_long`, ...) to method references.
    #[serde(default)]
    pub events: BTreeMap<String, Vec<String>>,
    /// Cron expression to method references.
    #[serde(default)]
    pub cron: BTreeMap<String, Vec<String>>,
}

impl DeclaredJobs {
    /// Flatten into `(method_ref, frequency, cron_expression)` tuples.
    pub fn flatten(&self) -> Result<Vec<(String, Frequency, Option<String>)>, SchedulerError> {
        let mut tuples = Vec::new();
        for (class, methods) in &self.events {
            let frequency = Frequency::from_event_class(class)?;
            for method_ref in methods {
                tuples.push((method_ref.clone(), frequency, None));
            }
        }
        for (expr, methods) in &self.cron {
            for method_ref in methods {
                tuples.push((method_ref.clone(), Frequency::Cron, Some(expr.clone())));
            }
        }
        Ok(tuples)
    }
}

/// Counts of what one sync pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub pruned: usize,
}

impl SyncReport {
    /// Registry writes performed by the pass.
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.pruned
    }
}

/// Reconciles the registry against a declared job set.
pub struct SyncEngine {
    registry: Arc<dyn JobRegistry>,
    runnables: Arc<dyn RunnableRegistry>,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        runnables: Arc<dyn RunnableRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            runnables,
            clock,
        }
    }

    /// Upsert every declared job, then prune registry entries that are
    /// neither declared nor externally owned.
    ///
    /// Unresolvable method references are skipped with a warning; malformed
    /// cron expressions abort the pass since they are a configuration bug.
    /// Upserts preserve `last_execution` and only write when frequency or
    /// expression actually changed, so a repeat pass over an unchanged set
    /// performs zero writes.
    pub async fn sync(&self, declared: &DeclaredJobs) -> Result<SyncReport, SchedulerError> {
        let mut report = SyncReport::default();
        let mut declared_refs: HashSet<String> = HashSet::new();

        for (method_ref, frequency, cron_expression) in declared.flatten()? {
            declared_refs.insert(method_ref.clone());

            if self.runnables.resolve(&method_ref).is_none() {
                warn!("{} is not a valid method, skipping", method_ref);
                report.skipped += 1;
                continue;
            }

            match self.registry.find_by_method(&method_ref).await? {
                Some(mut existing) => {
                    // Only Cron-frequency jobs own their stored expression;
                    // for every other frequency the stored value is a cache
                    // written back by the due checker, not declared config.
                    let expression_changed = frequency == Frequency::Cron
                        && existing.cron_expression != cron_expression;
                    if existing.frequency == frequency && !expression_changed {
                        report.unchanged += 1;
                        continue;
                    }
                    existing.frequency = frequency;
                    existing.cron_expression = cron_expression;
                    existing.validate()?;
                    self.registry.update(&existing).await?;
                    report.updated += 1;
                }
                None => {
                    let mut job = JobDefinition::new(&method_ref, frequency, self.clock.now());
                    job.cron_expression = cron_expression;
                    job.validate()?;
                    self.insert_resolving_race(&job).await?;
                    report.inserted += 1;
                }
            }
        }

        // Prune stale entries with no external owner.
        for job in self.registry.load_all().await? {
            if job.externally_owned() || declared_refs.contains(&job.method_ref) {
                continue;
            }
            info!("Pruning undeclared job '{}'", job.identifier);
            self.registry.delete(&job.identifier).await?;
            report.pruned += 1;
        }

        Ok(report)
    }

    /// Insert, resolving a concurrent-creation race on the identifier by
    /// deleting the clashing row and reinserting.
    async fn insert_resolving_race(&self, job: &JobDefinition) -> Result<(), SchedulerError> {
        match self.registry.insert(job).await {
            Ok(()) => Ok(()),
            Err(SchedulerError::DuplicateIdentifier(_)) => {
                warn!("Insert race on '{}', replacing existing entry", job.identifier);
                self.registry.delete(&job.identifier).await?;
                self.registry.insert(job).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
