//! Engine pool: one evaluator per concurrent analysis.
//!
//! Engines are stateful (one position and search at a time), so an analysis
//! checks out an engine for its whole run and nobody else can send it
//! commands until the guard is dropped.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::info;

use crate::error::WorkerError;
use crate::evaluator::PositionEvaluator;

struct Shared<E> {
    idle: Mutex<Vec<E>>,
    permits: Arc<Semaphore>,
    /// Engines not yet discarded
    live: AtomicUsize,
    /// Signalled whenever an engine is returned, discarded or added
    changed: Notify,
}

impl<E> Shared<E> {
    fn idle(&self) -> MutexGuard<'_, Vec<E>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct EnginePool<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for EnginePool<E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<E: PositionEvaluator> EnginePool<E> {
    pub fn new(engines: Vec<E>) -> Self {
        let size = engines.len();
        Self {
            shared: Arc::new(Shared {
                idle: Mutex::new(engines),
                permits: Arc::new(Semaphore::new(size)),
                live: AtomicUsize::new(size),
                changed: Notify::new(),
            }),
        }
    }

    /// Engines still in service.
    pub fn size(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    /// Wait for a free engine.
    pub async fn checkout(&self) -> Result<PooledEngine<E>, WorkerError> {
        let permit = self
            .shared
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::EvaluatorUnavailable("engine pool closed".into()))?;
        // A permit guarantees an idle engine
        let engine = self
            .shared
            .idle()
            .pop()
            .ok_or_else(|| WorkerError::EvaluatorUnavailable("no idle engine".into()))?;

        Ok(PooledEngine {
            engine: Some(engine),
            shared: self.shared.clone(),
            permit: Some(permit),
        })
    }

    /// Put a new engine into service, e.g. to replace a discarded one.
    pub fn add(&self, engine: E) {
        self.shared.idle().push(engine);
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        self.shared.permits.add_permits(1);
        self.shared.changed.notify_waiters();
    }

    /// Refuse new checkouts, wait for every checked-out engine to be returned
    /// or discarded, then shut all down.
    pub async fn shutdown(self) {
        self.shared.permits.close();
        loop {
            let changed = self.shared.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();
            if self.shared.idle().len() >= self.size() {
                break;
            }
            changed.await;
        }

        let engines: Vec<E> = std::mem::take(&mut *self.shared.idle());
        info!(count = engines.len(), "Shutting down engines");
        for mut engine in engines {
            engine.shutdown().await;
        }
    }
}

/// Exclusive handle on one pooled engine; returns it on drop.
pub struct PooledEngine<E> {
    engine: Option<E>,
    shared: Arc<Shared<E>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<E> PooledEngine<E> {
    /// Drop the engine instead of returning it, e.g. after a timeout left it
    /// mid-search. The pool shrinks by one slot.
    pub fn discard(mut self) -> Option<E> {
        self.engine.take()
    }
}

impl<E> Deref for PooledEngine<E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine.as_ref().expect("engine present until drop")
    }
}

impl<E> DerefMut for PooledEngine<E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine.as_mut().expect("engine present until drop")
    }
}

impl<E> Drop for PooledEngine<E> {
    fn drop(&mut self) {
        match self.engine.take() {
            Some(engine) => self.shared.idle().push(engine),
            None => {
                // Keep the permit count in line with the idle list
                self.shared.live.fetch_sub(1, Ordering::SeqCst);
                if let Some(permit) = self.permit.take() {
                    permit.forget();
                }
            }
        }
        self.shared.changed.notify_waiters();
    }
}
