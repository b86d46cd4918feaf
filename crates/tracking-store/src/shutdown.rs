//! A cloneable handle for triggering shutdown from another thread.

use crate::store::EmbeddedEventStore;
use event_storage::EventStorageEngine;
use tracking_cache::TrackingToken;

/// A lightweight, cloneable handle that can trigger
/// [`EmbeddedEventStore::shut_down`] without holding on to the store
/// itself — useful for wiring into a signal handler or a supervisor task
/// that only needs to know how to stop things, not how to publish or
/// open streams.
///
/// Calling [`ShutdownSignal::trigger`] more than once, from any clone, is
/// a no-op after the first call.
pub struct ShutdownSignal<P, T: TrackingToken, E: EventStorageEngine<P, T>> {
    store: EmbeddedEventStore<P, T, E>,
}

impl<P, T, E> Clone for ShutdownSignal<P, T, E>
where
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<P, T, E> ShutdownSignal<P, T, E>
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    pub(crate) fn new(store: EmbeddedEventStore<P, T, E>) -> Self {
        Self { store }
    }

    /// Triggers graceful shutdown of the store this handle was taken
    /// from.
    pub fn trigger(&self) {
        self.store.shut_down();
    }
}
