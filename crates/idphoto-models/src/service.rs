//! Initialize-once wrapper around a loaded model.
//!
//! The first caller starts the loader on the blocking pool; callers arriving
//! while it runs wait for the same load. The load runs in a task owned by the
//! service, so a caller that gives up early does not abandon it. The outcome
//! is kept for the life of the service, so a failed load is reported on every
//! later call without retrying. Inference holds the instance lock for its
//! whole run.

use crate::error::{ModelError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

type Loader<M> = dyn Fn() -> Result<M> + Send + Sync;
type Outcome<M> = std::result::Result<Arc<Mutex<M>>, String>;

/// Lifecycle of a [`ModelService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

pub struct ModelService<M> {
    inner: Arc<Inner<M>>,
}

struct Inner<M> {
    name: &'static str,
    loader: Arc<Loader<M>>,
    instance: OnceCell<Outcome<M>>,
    loading: AtomicBool,
}

impl<M: Send + 'static> Inner<M> {
    async fn load(&self) -> Outcome<M> {
        self.instance
            .get_or_init(|| async {
                self.loading.store(true, Ordering::Release);
                tracing::info!(model = self.name, "loading model");

                let loader = Arc::clone(&self.loader);
                let outcome = match tokio::task::spawn_blocking(move || loader()).await {
                    Ok(Ok(model)) => Ok(Arc::new(Mutex::new(model))),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("loader task failed: {e}")),
                };

                match &outcome {
                    Ok(_) => tracing::info!(model = self.name, "model ready"),
                    Err(error) => tracing::error!(model = self.name, %error, "model failed to load"),
                }
                self.loading.store(false, Ordering::Release);
                outcome
            })
            .await
            .clone()
    }
}

impl<M: Send + 'static> ModelService<M> {
    /// Create a service that loads its model with `loader` on first use.
    pub fn new<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> Result<M> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name,
                loader: Arc::new(loader),
                instance: OnceCell::new(),
                loading: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn state(&self) -> ServiceState {
        match self.inner.instance.get() {
            Some(Ok(_)) => ServiceState::Ready,
            Some(Err(_)) => ServiceState::Failed,
            None if self.inner.loading.load(Ordering::Acquire) => ServiceState::Loading,
            None => ServiceState::Uninitialized,
        }
    }

    /// The loaded instance, loading it first if needed.
    pub async fn get(&self) -> Result<Arc<Mutex<M>>> {
        let outcome = match self.inner.instance.get() {
            Some(outcome) => outcome.clone(),
            None => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move { inner.load().await }).await?
            }
        };
        outcome.map_err(|msg| ModelError::Unavailable(self.inner.name, msg))
    }

    /// Run `f` against the model on the blocking pool.
    ///
    /// Only one `run` per service executes at a time.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut M) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let instance = self.get().await?;
        let mut guard = instance.lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *guard)).await?
    }
}
