//! The facade that wires the ring, producer, registry, and cleaner
//! together and is the only thing a caller constructs directly.

use crate::cleaner::Cleaner;
use crate::config::EventStoreConfig;
use crate::consumer::TrackingConsumer;
use crate::error::StoreError;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::producer::Producer;
use crate::registry::TailingRegistry;
use crate::shutdown::ShutdownSignal;
use crate::signal::ConditionGate;
use event_storage::EventStorageEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracking_cache::{NodeRing, TrackingToken};

/// Everything shared between the facade, the producer thread, the cleaner
/// thread, and every consumer. Held behind a single `Arc` so all four can
/// outlive the call that created them.
pub(crate) struct StoreInner<P, T: TrackingToken, E: EventStorageEngine<P, T>> {
    pub(crate) storage: E,
    pub(crate) ring: NodeRing<P, T>,
    pub(crate) registry: TailingRegistry<P, T>,
    pub(crate) producer: Producer,
    pub(crate) cleaner: Cleaner,
    pub(crate) consumer_signal: ConditionGate,
    pub(crate) config: EventStoreConfig,
    pub(crate) metrics: Metrics,
    shut_down: AtomicBool,
}

/// An embedded event store: a durable [`EventStorageEngine`] plus the
/// shared tailing cache and background tasks that let many concurrent
/// [`TrackingConsumer`]s read from it in global order without each one
/// hitting storage directly.
///
/// Cloning shares the same cache, producer, and cleaner — it is the
/// idiomatic way to hand the store to multiple threads that each want to
/// `open_stream` or `publish`.
pub struct EmbeddedEventStore<P, T: TrackingToken, E: EventStorageEngine<P, T>> {
    inner: Arc<StoreInner<P, T, E>>,
}

impl<P, T, E> Clone for EmbeddedEventStore<P, T, E>
where
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, T, E> EmbeddedEventStore<P, T, E>
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    /// Builds a store over `storage` with the default configuration.
    #[must_use]
    pub fn new(storage: E) -> Self {
        Self::with_config(storage, EventStoreConfig::default())
    }

    /// Builds a store over `storage` with an explicit configuration.
    #[must_use]
    pub fn with_config(storage: E, config: EventStoreConfig) -> Self {
        let cleaner = Cleaner::new();
        let inner = Arc::new(StoreInner {
            storage,
            ring: NodeRing::new(),
            registry: TailingRegistry::new(),
            producer: Producer::new(),
            cleaner,
            consumer_signal: ConditionGate::new(),
            config,
            metrics: Metrics::default(),
            shut_down: AtomicBool::new(false),
        });
        inner.cleaner.start(&inner);
        Self { inner }
    }

    /// Appends `events` to storage, then wakes the producer so it reads
    /// them immediately instead of waiting out the next idle poll.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] if the store has been shut down, or
    /// [`StoreError::Append`] if the storage engine rejected the batch (in
    /// which case no event in the batch was committed).
    pub fn publish(&self, events: Vec<P>) -> Result<Vec<T>, StoreError<E::Error>> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let tokens = self.inner.storage.append(events).map_err(StoreError::Append)?;
        self.inner.producer.fetch_if_waiting();
        Ok(tokens)
    }

    /// Opens a stream positioned strictly after `token` (or from the
    /// beginning, if `None`).
    ///
    /// If `optimize_event_consumption` is enabled and `token` is still
    /// present in the cache, the returned consumer starts in tailing mode,
    /// fed from the shared ring; otherwise it starts in private mode,
    /// reading directly from storage until it catches up.
    #[must_use]
    pub fn open_stream(&self, token: Option<T>) -> TrackingConsumer<P, T, E> {
        let id = self.inner.registry.allocate_id();

        if self.inner.config.optimize_event_consumption {
            if let Some(token) = &token {
                if let Some(node) = self.inner.ring.find_by_token(token) {
                    return TrackingConsumer::new_tailing(id, token.clone(), node, Arc::clone(&self.inner));
                }
            }
        }

        TrackingConsumer::new_private(id, token, Arc::clone(&self.inner))
    }

    /// A point-in-time snapshot of the cache's activity counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// A cloneable handle that can trigger [`Self::shut_down`] from
    /// another thread without holding on to the store itself.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal<P, T, E> {
        ShutdownSignal::new(self.clone())
    }

    /// Closes every tailing consumer's registry slot, stops the producer
    /// and cleaner threads, and marks the store closed to future
    /// `publish` calls. Idempotent.
    ///
    /// Open [`TrackingConsumer`]s are not dropped by this call — they
    /// simply find themselves no longer tailing on their next peek and
    /// fall back to private reads, exactly as if the cleaner had evicted
    /// them, until they too are closed.
    pub fn shut_down(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let evicted = self.inner.registry.clear();
        tracing::info!(evicted, "event store shutting down");
        self.inner.producer.close();
        self.inner.cleaner.close();
    }
}

impl<P, T, E> Drop for EmbeddedEventStore<P, T, E>
where
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    fn drop(&mut self) {
        // Only the last handle sharing this `Arc` should tear down the
        // background threads; cheap to check, harmless to skip otherwise.
        if Arc::strong_count(&self.inner) == 1 && !self.inner.shut_down.load(Ordering::Acquire) {
            self.inner.producer.close();
            self.inner.cleaner.close();
        }
    }
}
