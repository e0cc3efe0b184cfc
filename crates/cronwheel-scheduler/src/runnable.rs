//! Runnable registry contract.
//!
//! The scheduler treats method references as opaque strings; resolving them
//! to executable units is the hosting environment's job.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

/// A unit of work a job executes.
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Run to completion. A returned `Err` is the failure diagnostic.
    async fn run(&self) -> Result<(), String>;
}

/// Resolves method references to runnables.
pub trait RunnableRegistry: Send + Sync {
    fn resolve(&self, method_ref: &str) -> Option<Arc<dyn Runnable>>;
}

/// Fixed map of method references to runnables, for embedding and tests.
#[derive(Default)]
pub struct StaticRunnableRegistry {
    entries: HashMap<String, Arc<dyn Runnable>>,
}

impl StaticRunnableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runnable under a method reference.
    pub fn register(&mut self, method_ref: impl Into<String>, runnable: Arc<dyn Runnable>) {
        self.entries.insert(method_ref.into(), runnable);
    }

    /// Register an async closure as a runnable.
    pub fn register_fn<F, Fut>(&mut self, method_ref: impl Into<String>, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
    {
        self.entries.insert(method_ref.into(), Arc::new(FnRunnable(Box::new(move || Box::pin(f())))));
    }
}

impl RunnableRegistry for StaticRunnableRegistry {
    fn resolve(&self, method_ref: &str) -> Option<Arc<dyn Runnable>> {
        self.entries.get(method_ref).cloned()
    }
}

type BoxedRunFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), String>> + Send>>;

struct FnRunnable(Box<dyn Fn() -> BoxedRunFuture + Send + Sync>);

#[async_trait]
impl Runnable for FnRunnable {
    async fn run(&self) -> Result<(), String> {
        (self.0)().await
    }
}
