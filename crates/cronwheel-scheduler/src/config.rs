//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the driver loop sweeps the registry, in seconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Cadence of continuous (`All` frequency) jobs, in seconds.
    #[serde(default = "default_scheduler_interval")]
    pub scheduler_interval_secs: u64,

    /// Directory for file-backed registry state.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_tick_interval() -> u64 {
    60
}

fn default_scheduler_interval() -> u64 {
    240
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            scheduler_interval_secs: default_scheduler_interval(),
            data_dir: None,
        }
    }
}
