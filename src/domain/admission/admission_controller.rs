//! Concurrency gate in front of the session pool
//!
//! Admission never rejects work: a submission past the cap queues in FIFO
//! order behind the semaphore and starts as soon as a running session
//! releases its slot. Multiple sessions for the same identifier are allowed;
//! the alert cooldown keeps them from double-alerting.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::shared::errors::AdmissionError;

pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    limit: AtomicUsize,
    running: Arc<AtomicUsize>,
    waiting: Arc<AtomicUsize>,
}

impl AdmissionController {
    pub const DEFAULT_LIMIT: usize = 50;

    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit: AtomicUsize::new(limit),
            running: Arc::new(AtomicUsize::new(0)),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sessions currently holding a slot.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Relaxed)
    }

    /// Submissions queued behind the cap.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    /// Spawn `work` once a slot is free. Returns immediately; the spawned
    /// task queues on the semaphore, so submission order is start order.
    pub fn admit<F, T>(&self, work: F) -> JoinHandle<Result<T, AdmissionError>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let running = Arc::clone(&self.running);
        let waiting = Arc::clone(&self.waiting);

        waiting.fetch_add(1, Ordering::Relaxed);
        tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await;
            waiting.fetch_sub(1, Ordering::Relaxed);
            let _permit = match permit {
                Ok(p) => p,
                Err(_) => {
                    debug!("admission gate closed, dropping queued session");
                    return Err(AdmissionError::ShutDown);
                }
            };

            running.fetch_add(1, Ordering::Relaxed);
            let result = work.await;
            running.fetch_sub(1, Ordering::Relaxed);
            Ok(result)
        })
    }

    /// Change the concurrency cap at runtime. Raising the cap releases
    /// queued sessions immediately; lowering it retires slots as running
    /// sessions finish, never interrupting them.
    pub fn resize(&self, new_limit: usize) {
        let old = self.limit.swap(new_limit, Ordering::SeqCst);
        if new_limit > old {
            self.semaphore.add_permits(new_limit - old);
            info!(old, new = new_limit, "admission cap raised");
        } else if new_limit < old {
            let semaphore = Arc::clone(&self.semaphore);
            let retire = (old - new_limit) as u32;
            tokio::spawn(async move {
                match semaphore.acquire_many_owned(retire).await {
                    Ok(permits) => permits.forget(),
                    Err(_) => warn!("admission gate closed before cap shrink completed"),
                }
            });
            info!(old, new = new_limit, "admission cap lowered");
        }
    }

    /// Stop admitting. Queued submissions resolve to `ShutDown`; running
    /// sessions are unaffected (cancellation is signalled separately).
    pub fn close(&self) {
        self.semaphore.close();
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}
