//! Durable job registry.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::definition::{ExecutionRecord, JobDefinition};
use crate::error::SchedulerError;

/// Durable catalog of job definitions and their execution records.
///
/// Every write is a single-entity commit; the scheduler never needs
/// multi-job transactions. `insert` must fail on an identifier clash so the
/// sync engine can resolve concurrent-creation races.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Insert a new definition. Fails with
    /// [`SchedulerError::DuplicateIdentifier`] if the key exists.
    async fn insert(&self, job: &JobDefinition) -> Result<(), SchedulerError>;

    /// Update an existing definition in place.
    async fn update(&self, job: &JobDefinition) -> Result<(), SchedulerError>;

    /// Load a definition by identifier.
    async fn get(&self, identifier: &str) -> Result<Option<JobDefinition>, SchedulerError>;

    /// Load a definition by method reference.
    async fn find_by_method(&self, method_ref: &str)
        -> Result<Option<JobDefinition>, SchedulerError>;

    /// Load all definitions.
    async fn load_all(&self) -> Result<Vec<JobDefinition>, SchedulerError>;

    /// Delete a definition and cascade-delete its execution records.
    async fn delete(&self, identifier: &str) -> Result<(), SchedulerError>;

    /// Append an execution record.
    async fn insert_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError>;

    /// Rewrite an execution record after a status transition.
    async fn update_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError>;

    /// The most recent record for a job still in `Start` state.
    async fn latest_open_record(
        &self,
        job_identifier: &str,
    ) -> Result<Option<ExecutionRecord>, SchedulerError>;

    /// All records for a job, oldest first.
    async fn records_for(&self, job_identifier: &str)
        -> Result<Vec<ExecutionRecord>, SchedulerError>;
}

/// In-memory registry for tests and embedded use.
#[derive(Default)]
pub struct MemoryJobRegistry {
    jobs: RwLock<HashMap<String, JobDefinition>>,
    records: RwLock<Vec<ExecutionRecord>>,
}

impl MemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRegistry for MemoryJobRegistry {
    async fn insert(&self, job: &JobDefinition) -> Result<(), SchedulerError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.identifier) {
            return Err(SchedulerError::DuplicateIdentifier(job.identifier.clone()));
        }
        jobs.insert(job.identifier.clone(), job.clone());
        Ok(())
    }

    async fn update(&self, job: &JobDefinition) -> Result<(), SchedulerError> {
        let mut jobs = self.jobs.write().await;
        if !jobs.contains_key(&job.identifier) {
            return Err(SchedulerError::JobNotFound(job.identifier.clone()));
        }
        jobs.insert(job.identifier.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, identifier: &str) -> Result<Option<JobDefinition>, SchedulerError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(identifier).cloned())
    }

    async fn find_by_method(
        &self,
        method_ref: &str,
    ) -> Result<Option<JobDefinition>, SchedulerError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.values().find(|j| j.method_ref == method_ref).cloned())
    }

    async fn load_all(&self) -> Result<Vec<JobDefinition>, SchedulerError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.values().cloned().collect())
    }

    async fn delete(&self, identifier: &str) -> Result<(), SchedulerError> {
        let mut jobs = self.jobs.write().await;
        jobs.remove(identifier);
        let mut records = self.records.write().await;
        records.retain(|r| r.job_identifier != identifier);
        Ok(())
    }

    async fn insert_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        let mut records = self.records.write().await;
        records.push(record.clone());
        Ok(())
    }

    async fn update_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(SchedulerError::Store(format!(
                "execution record not found: {}",
                record.id
            ))),
        }
    }

    async fn latest_open_record(
        &self,
        job_identifier: &str,
    ) -> Result<Option<ExecutionRecord>, SchedulerError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.job_identifier == job_identifier && r.open())
            .max_by_key(|r| r.timestamp)
            .cloned())
    }

    async fn records_for(
        &self,
        job_identifier: &str,
    ) -> Result<Vec<ExecutionRecord>, SchedulerError> {
        let records = self.records.read().await;
        let mut matching: Vec<ExecutionRecord> = records
            .iter()
            .filter(|r| r.job_identifier == job_identifier)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.timestamp);
        Ok(matching)
    }
}

/// File-backed registry: one JSON file per job under `jobs/`, one per
/// execution record under `logs/`.
pub struct FileJobRegistry {
    data_dir: PathBuf,
}

impl FileJobRegistry {
    /// Create a registry rooted at `data_dir`, creating subdirectories as
    /// needed.
    pub async fn new(data_dir: impl Into<PathBuf>) -> Result<Self, SchedulerError> {
        let data_dir = data_dir.into();
        for sub in ["jobs", "logs"] {
            fs::create_dir_all(data_dir.join(sub))
                .await
                .map_err(|e| SchedulerError::Store(format!("failed to create {} dir: {}", sub, e)))?;
        }
        debug!("FileJobRegistry initialized at {:?}", data_dir);
        Ok(Self { data_dir })
    }

    fn job_path(&self, identifier: &str) -> PathBuf {
        self.data_dir
            .join("jobs")
            .join(format!("{}.json", sanitize(identifier)))
    }

    fn record_path(&self, record: &ExecutionRecord) -> PathBuf {
        self.data_dir.join("logs").join(format!("{}.json", record.id))
    }

    async fn write_json<T: serde::Serialize>(
        path: &PathBuf,
        value: &T,
    ) -> Result<(), SchedulerError> {
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| SchedulerError::Store(format!("serialize failed: {}", e)))?;
        fs::write(path, content)
            .await
            .map_err(|e| SchedulerError::Store(format!("write {:?} failed: {}", path, e)))
    }

    async fn load_records(&self) -> Result<Vec<ExecutionRecord>, SchedulerError> {
        let logs_dir = self.data_dir.join("logs");
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&logs_dir)
            .await
            .map_err(|e| SchedulerError::Store(format!("read logs dir failed: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SchedulerError::Store(format!("read dir entry failed: {}", e)))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<ExecutionRecord>(&content) {
                        Ok(record) => records.push(record),
                        Err(e) => warn!("Skipping unreadable record {:?}: {}", path, e),
                    },
                    Err(e) => warn!("Failed to read record file {:?}: {}", path, e),
                }
            }
        }
        Ok(records)
    }
}

fn sanitize(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl JobRegistry for FileJobRegistry {
    async fn insert(&self, job: &JobDefinition) -> Result<(), SchedulerError> {
        let path = self.job_path(&job.identifier);
        if path.exists() {
            return Err(SchedulerError::DuplicateIdentifier(job.identifier.clone()));
        }
        Self::write_json(&path, job).await
    }

    async fn update(&self, job: &JobDefinition) -> Result<(), SchedulerError> {
        let path = self.job_path(&job.identifier);
        if !path.exists() {
            return Err(SchedulerError::JobNotFound(job.identifier.clone()));
        }
        Self::write_json(&path, job).await
    }

    async fn get(&self, identifier: &str) -> Result<Option<JobDefinition>, SchedulerError> {
        let path = self.job_path(identifier);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| SchedulerError::Store(format!("read {:?} failed: {}", path, e)))?;
        let job = serde_json::from_str(&content)
            .map_err(|e| SchedulerError::Store(format!("deserialize {:?} failed: {}", path, e)))?;
        Ok(Some(job))
    }

    async fn find_by_method(
        &self,
        method_ref: &str,
    ) -> Result<Option<JobDefinition>, SchedulerError> {
        let all = self.load_all().await?;
        Ok(all.into_iter().find(|j| j.method_ref == method_ref))
    }

    async fn load_all(&self) -> Result<Vec<JobDefinition>, SchedulerError> {
        let jobs_dir = self.data_dir.join("jobs");
        let mut jobs = Vec::new();
        let mut entries = fs::read_dir(&jobs_dir)
            .await
            .map_err(|e| SchedulerError::Store(format!("read jobs dir failed: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SchedulerError::Store(format!("read dir entry failed: {}", e)))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match fs::read_to_string(&path).await {
                    Ok(content) => match serde_json::from_str::<JobDefinition>(&content) {
                        Ok(job) => jobs.push(job),
                        Err(e) => warn!("Skipping unreadable job {:?}: {}", path, e),
                    },
                    Err(e) => warn!("Failed to read job file {:?}: {}", path, e),
                }
            }
        }
        Ok(jobs)
    }

    async fn delete(&self, identifier: &str) -> Result<(), SchedulerError> {
        let path = self.job_path(identifier);
        if path.exists() {
            fs::remove_file(&path)
                .await
                .map_err(|e| SchedulerError::Store(format!("delete {:?} failed: {}", path, e)))?;
        }

        // Cascade: drop this job's execution records.
        for record in self.load_records().await? {
            if record.job_identifier == identifier {
                let record_path = self.record_path(&record);
                if let Err(e) = fs::remove_file(&record_path).await {
                    warn!("Failed to delete record file {:?}: {}", record_path, e);
                }
            }
        }
        debug!("Deleted job '{}' and its records", identifier);
        Ok(())
    }

    async fn insert_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        Self::write_json(&self.record_path(record), record).await
    }

    async fn update_record(&self, record: &ExecutionRecord) -> Result<(), SchedulerError> {
        let path = self.record_path(record);
        if !path.exists() {
            return Err(SchedulerError::Store(format!(
                "execution record not found: {}",
                record.id
            )));
        }
        Self::write_json(&path, record).await
    }

    async fn latest_open_record(
        &self,
        job_identifier: &str,
    ) -> Result<Option<ExecutionRecord>, SchedulerError> {
        let records = self.load_records().await?;
        Ok(records
            .into_iter()
            .filter(|r| r.job_identifier == job_identifier && r.open())
            .max_by_key(|r| r.timestamp))
    }

    async fn records_for(
        &self,
        job_identifier: &str,
    ) -> Result<Vec<ExecutionRecord>, SchedulerError> {
        let mut records: Vec<ExecutionRecord> = self
            .load_records()
            .await?
            .into_iter()
            .filter(|r| r.job_identifier == job_identifier)
            .collect();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
