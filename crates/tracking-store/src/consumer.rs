//! The per-reader stream: the tailing ↔ private state machine.
//!
//! A consumer's mode is never stored as a flag — it is derived from
//! whether the consumer's id is currently present in the store's tailing
//! registry (see `registry`). That is what lets the cleaner demote a
//! consumer unilaterally: it just removes the entry, and the consumer
//! notices on its next peek.
//!
//! A single consumer is meant to be driven by one thread at a time; its
//! own fields (`last_token`, `last_node`, `peeked`, `private_stream`) are
//! touched only from `&mut self` methods, never concurrently.

use crate::registry::{ConsumerId, TailingSlot};
use crate::store::StoreInner;
use crate::{lag, invariants};
use event_storage::{EventStorageEngine, EventStream};
use std::sync::Arc;
use std::time::Duration;
use tracking_cache::{Node, TrackedEvent, TrackingToken};

/// The public contract for a tracking consumer: a one-slot lookahead
/// stream over an event store's global order, starting at whatever token
/// the stream was opened with.
pub trait TrackingEventStream<P, T: TrackingToken> {
    /// Non-blocking lookahead at the next event, without consuming it.
    /// Repeated calls return the same event until [`Self::next_available`]
    /// consumes it.
    fn peek(&mut self) -> Option<TrackedEvent<P, T>>;

    /// Fills the one-slot lookahead, waiting up to `timeout` if nothing is
    /// available yet. Returns whether an event is now available.
    fn has_next_available(&mut self, timeout: Duration) -> bool;

    /// Blocks (with a long-but-bounded internal wait, looped so `close()`
    /// remains observable) until an event is available, then consumes and
    /// returns it.
    fn next_available(&mut self) -> TrackedEvent<P, T>;

    /// Releases this stream's private storage cursor (if any) and its
    /// tailing registry slot (if any). Idempotent.
    fn close(&mut self);
}

/// `next_available`'s per-iteration wait. The public contract blocks
/// "effectively forever"; internally that is this bounded wait, looped
/// until an event arrives or the consumer is closed, so `close()` called
/// from another thread is noticed promptly rather than after an unbounded
/// wait.
const NEXT_AVAILABLE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A stream positioned somewhere in an `EmbeddedEventStore`'s global
/// order, fed either by the shared tailing cache or, when it has fallen
/// behind or started older than the cache, directly by the storage
/// engine.
pub struct TrackingConsumer<P, T: TrackingToken, E: EventStorageEngine<P, T>> {
    id: ConsumerId,
    last_token: Option<T>,
    last_node: Option<Arc<Node<P, T>>>,
    peeked: Option<TrackedEvent<P, T>>,
    private_stream: Option<E::Stream>,
    closed: bool,
    inner: Arc<StoreInner<P, T, E>>,
}

impl<P, T, E> TrackingConsumer<P, T, E>
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    pub(crate) fn new_tailing(
        id: ConsumerId,
        last_token: T,
        node: Arc<Node<P, T>>,
        inner: Arc<StoreInner<P, T, E>>,
    ) -> Self {
        let slot = Arc::new(TailingSlot::new(Some(last_token.clone()), Some(Arc::clone(&node))));
        inner.registry.insert(id, slot);
        inner.producer.ensure_started(&inner);
        inner.metrics.record_tailing_open();
        Self {
            id,
            last_token: Some(last_token),
            last_node: Some(node),
            peeked: None,
            private_stream: None,
            closed: false,
            inner,
        }
    }

    pub(crate) fn new_private(id: ConsumerId, last_token: Option<T>, inner: Arc<StoreInner<P, T, E>>) -> Self {
        inner.metrics.record_private_open();
        Self {
            id,
            last_token,
            last_node: None,
            peeked: None,
            private_stream: None,
            closed: false,
            inner,
        }
    }

    fn is_tailing(&self) -> bool {
        self.inner.registry.contains(self.id)
    }

    fn behind_global_cache(&self) -> bool {
        lag::behind_global_cache(&self.inner.ring, self.last_node.as_ref(), self.last_token.as_ref())
    }

    fn stop_tailing_global_stream(&mut self) {
        self.inner.registry.remove(self.id);
        self.last_node = None;
        tracing::debug!(
            consumer = self.id_raw(),
            "consumer transitioned tailing -> private: fell behind the cache"
        );
    }

    fn id_raw(&self) -> u64 {
        // ConsumerId has no public accessor (it is a crate-private opaque
        // id); this is only for log correlation.
        format!("{:?}", self.id)
            .trim_start_matches("ConsumerId(")
            .trim_end_matches(')')
            .parse()
            .unwrap_or(0)
    }

    fn peek_internal(&mut self, timeout: Duration) -> Option<TrackedEvent<P, T>> {
        if self.closed {
            return None;
        }

        let mut allow_switch = self.inner.config.optimize_event_consumption;
        if self.is_tailing() {
            if !self.behind_global_cache() {
                return self.peek_global_stream(timeout);
            }
            self.stop_tailing_global_stream();
            allow_switch = false;
        }
        self.peek_private_stream(allow_switch, timeout)
    }

    fn peek_global_stream(&mut self, timeout: Duration) -> Option<TrackedEvent<P, T>> {
        let mut node = lag::next_node(&self.inner.ring, self.last_node.as_ref(), self.last_token.as_ref());

        if node.is_none() && !timeout.is_zero() {
            let last_node = self.last_node.clone();
            let last_token = self.last_token.clone();
            let inner = Arc::clone(&self.inner);
            node = inner
                .consumer_signal
                .wait_for(timeout, || lag::next_node(&inner.ring, last_node.as_ref(), last_token.as_ref()));
        }

        let node = node?;
        if self.is_tailing() {
            invariants::debug_assert_monotonic_node_index!(self.last_node.as_ref(), &node);
            self.last_node = Some(Arc::clone(&node));
            self.last_token = Some(node.event().tracking_token().clone());
            if let Some(slot) = self.inner.registry.slot(self.id) {
                slot.update(self.last_token.clone(), self.last_node.clone());
            }
        }
        Some(node.event().clone())
    }

    fn poll_private(&mut self) -> Option<TrackedEvent<P, T>> {
        let stream = self.private_stream.as_mut()?;
        match stream.poll_next(Duration::ZERO) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%error, consumer = self.id_raw(), "private stream read failed");
                None
            }
        }
    }

    fn peek_private_stream(&mut self, allow_switch: bool, timeout: Duration) -> Option<TrackedEvent<P, T>> {
        if self.private_stream.is_none() {
            self.private_stream = Some(self.inner.storage.read_events(self.last_token.clone(), false));
        }

        if let Some(event) = self.poll_private() {
            self.last_token = Some(event.tracking_token().clone());
            return Some(event);
        }

        if allow_switch {
            if let Some(stream) = self.private_stream.as_mut() {
                stream.close();
            }
            self.private_stream = None;
            self.last_node = self.inner.ring.find_by_previous_token(self.last_token.as_ref());
            let slot = Arc::new(TailingSlot::new(self.last_token.clone(), self.last_node.clone()));
            self.inner.registry.insert(self.id, slot);
            self.inner.producer.ensure_started(&self.inner);
            self.inner.metrics.record_tailing_open();
            tracing::debug!(consumer = self.id_raw(), "consumer transitioned private -> tailing");
            if timeout.is_zero() {
                return None;
            }
            return self.peek_internal(timeout);
        }

        if timeout.is_zero() {
            return None;
        }

        self.inner.consumer_signal.wait_for(timeout, || -> Option<()> { None });
        if let Some(event) = self.poll_private() {
            self.last_token = Some(event.tracking_token().clone());
            return Some(event);
        }
        None
    }
}

impl<P, T, E> TrackingEventStream<P, T> for TrackingConsumer<P, T, E>
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    fn peek(&mut self) -> Option<TrackedEvent<P, T>> {
        if self.peeked.is_none() {
            self.peeked = self.peek_internal(Duration::ZERO);
        }
        self.peeked.clone()
    }

    fn has_next_available(&mut self, timeout: Duration) -> bool {
        if self.peeked.is_some() {
            return true;
        }
        self.peeked = self.peek_internal(timeout);
        self.peeked.is_some()
    }

    fn next_available(&mut self) -> TrackedEvent<P, T> {
        loop {
            if let Some(event) = self.peeked.take() {
                return event;
            }
            if self.closed {
                // `close()` during a concurrent wait has no hard-cancellation
                // contract (see the crate docs); spin on a short wait so a
                // caller blocked here still returns promptly once the
                // owning thread observes `closed`.
                std::thread::yield_now();
            }
            self.peeked = self.peek_internal(NEXT_AVAILABLE_POLL_INTERVAL);
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.inner.registry.remove(self.id);
        self.last_node = None;
        if let Some(stream) = self.private_stream.as_mut() {
            stream.close();
        }
        self.private_stream = None;
        self.peeked = None;
    }
}

impl<P, T, E> Drop for TrackingConsumer<P, T, E>
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    fn drop(&mut self) {
        TrackingEventStream::close(self);
    }
}
