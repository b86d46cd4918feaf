//! The periodic sweep that evicts tailing consumers which have fallen
//! behind the cache head.
//!
//! The cleaner never closes a consumer — it only removes it from the
//! tailing registry. The consumer's mode is derived from registry
//! membership (see `registry`), so the next time that consumer peeks it
//! simply finds itself no longer tailing and transparently reopens a
//! private stream, exactly as if it had demoted itself.

use crate::signal::ConditionGate;
use crate::store::StoreInner;
use event_storage::EventStorageEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracking_cache::TrackingToken;

pub(crate) struct Cleaner {
    closed: AtomicBool,
    wake: ConditionGate,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Cleaner {
    pub fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            wake: ConditionGate::new(),
            handle: Mutex::new(None),
        }
    }

    pub fn start<P, T, E>(&self, inner: &Arc<StoreInner<P, T, E>>)
    where
        P: Clone + Send + Sync + 'static,
        T: TrackingToken,
        E: EventStorageEngine<P, T>,
    {
        let inner = Arc::clone(inner);
        let name = format!("{}-cleaner", inner.config.thread_name_prefix);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || run(inner))
            .expect("failed to spawn cleaner thread");
        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stops the cleaner thread. Idempotent; blocks until the thread has
    /// exited.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.wake.notify_all();
        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new()
    }
}

fn run<P, T, E>(inner: Arc<StoreInner<P, T, E>>)
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    while !inner.cleaner.closed.load(Ordering::Acquire) {
        let closed = &inner.cleaner.closed;
        inner
            .cleaner
            .wake
            .wait_for(inner.config.cleanup_delay, || {
                if closed.load(Ordering::Acquire) {
                    Some(())
                } else {
                    None
                }
            });
        if inner.cleaner.closed.load(Ordering::Acquire) {
            break;
        }
        let evicted = inner.registry.evict_lagging(&inner.ring);
        if evicted > 0 {
            tracing::debug!(evicted, "cleaner evicted lagging tailing consumers");
            inner.metrics.record_cleaner_eviction(evicted);
        }
    }
}
