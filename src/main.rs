//! cronwheel - recurring job scheduler
//!
//! Thin admin CLI over the scheduler core: declarative sync, due inspection,
//! forced runs and the periodic driver loop.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cronwheel_scheduler::{
    DeclaredJobs, FileJobRegistry, MemoryWorkQueue, Runnable, RunnableRegistry, Scheduler,
    SchedulerConfig, SystemClock,
};

/// cronwheel CLI.
#[derive(Parser)]
#[command(name = "cronwheel")]
#[command(about = "Recurring job scheduler")]
#[command(version)]
struct Cli {
    /// Directory for registry state
    #[arg(long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Tenant identifier (drives maintenance-job offsets)
    #[arg(long, env = "CRONWHEEL_TENANT", default_value = "default", global = true)]
    tenant: String,

    /// Continuous (All frequency) cadence in seconds
    #[arg(long, default_value_t = 240, global = true)]
    scheduler_interval: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the registry against a declared job file (TOML)
    Sync {
        /// Path to the declared jobs file
        #[arg(long)]
        jobs: PathBuf,
    },

    /// List jobs due right now
    ListDue,

    /// Enqueue a job regardless of its schedule
    ForceRun {
        /// Job identifier
        identifier: String,
    },

    /// Check a 5-field cron expression
    Validate {
        /// Cron expression
        expr: String,
    },

    /// Run the periodic driver loop until interrupted
    Run {
        /// Tick interval in seconds
        #[arg(long, default_value_t = 60)]
        tick_interval: u64,
    },
}

/// The admin CLI has no executable units of its own; every declared method
/// reference resolves to a no-op so sync and enqueue surfaces work. Actual
/// execution belongs to the hosting environment's queue consumers.
struct AdminRunnables;

struct Noop;

#[async_trait::async_trait]
impl Runnable for Noop {
    async fn run(&self) -> Result<(), String> {
        Ok(())
    }
}

impl RunnableRegistry for AdminRunnables {
    fn resolve(&self, _method_ref: &str) -> Option<Arc<dyn Runnable>> {
        Some(Arc::new(Noop))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let registry = Arc::new(
        FileJobRegistry::new(&cli.data_dir)
            .await
            .context("failed to open registry")?,
    );
    let mut config = SchedulerConfig {
        scheduler_interval_secs: cli.scheduler_interval,
        ..SchedulerConfig::default()
    };
    if let Commands::Run { tick_interval } = &cli.command {
        config.tick_interval_secs = *tick_interval;
    }
    let scheduler = Arc::new(Scheduler::new(
        registry,
        Arc::new(MemoryWorkQueue::new()),
        Arc::new(AdminRunnables),
        Arc::new(SystemClock),
        cli.tenant.clone(),
        config,
    ));

    match cli.command {
        Commands::Sync { jobs } => {
            let content = std::fs::read_to_string(&jobs)
                .with_context(|| format!("failed to read {}", jobs.display()))?;
            let declared: DeclaredJobs =
                toml::from_str(&content).context("failed to parse declared jobs")?;
            let report = scheduler.sync(&declared).await?;
            println!(
                "sync: {} inserted, {} updated, {} unchanged, {} skipped, {} pruned",
                report.inserted, report.updated, report.unchanged, report.skipped, report.pruned
            );
        }
        Commands::ListDue => {
            let due = scheduler.list_due(chrono::Utc::now()).await?;
            if due.is_empty() {
                println!("no jobs due");
            }
            for job in due {
                println!(
                    "{}\t{}\t{}",
                    job.identifier,
                    job.frequency,
                    job.cron_expression.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::ForceRun { identifier } => {
            let outcome = scheduler.force_run(&identifier).await?;
            println!("{}: {:?}", identifier, outcome);
        }
        Commands::Validate { expr } => match cronwheel_core::validate(&expr) {
            Ok(()) => println!("ok"),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        Commands::Run { .. } => {
            let (tx, rx) = tokio::sync::watch::channel(false);
            let handle = tokio::spawn(scheduler.run(rx));

            tokio::signal::ctrl_c().await?;
            info!("Interrupt received, stopping");
            let _ = tx.send(true);
            handle.await?;
        }
    }

    Ok(())
}
