//! The single background thread that tails storage into the node ring.
//!
//! Only the producer ever appends nodes, advances `oldest`, or sets
//! `newest` — that single-writer discipline is what lets the ring's
//! publication stay lock-free (see `tracking_cache::Node::publish_next`).
//! Everything else here is just the control loop and its two knobs:
//! `should_fetch` (set by `fetch_if_waiting`, so a `publish` wakes the
//! producer immediately instead of waiting out `fetch_delay`) and
//! `closed` (set by `close`, for cooperative shutdown).

use crate::signal::ConditionGate;
use crate::store::StoreInner;
use event_storage::{EventStorageEngine, EventStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracking_cache::{Node, TrackingToken};

pub(crate) struct Producer {
    should_fetch: AtomicBool,
    closed: AtomicBool,
    data_available: ConditionGate,
    started: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Producer {
    pub fn new() -> Self {
        Self {
            should_fetch: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            data_available: ConditionGate::new(),
            started: AtomicBool::new(false),
            handle: Mutex::new(None),
        }
    }

    /// Wakes the producer so it reads newly-committed events immediately
    /// rather than waiting for the next idle-poll tick. Called by
    /// `publish` after a successful `storage.append`.
    pub fn fetch_if_waiting(&self) {
        self.should_fetch.store(true, Ordering::Release);
        self.data_available.notify_all();
    }

    /// Starts the producer thread the first time a tailing consumer
    /// appears. Idempotent — later calls are no-ops.
    pub fn ensure_started<P, T, E>(&self, inner: &Arc<StoreInner<P, T, E>>)
    where
        P: Clone + Send + Sync + 'static,
        T: TrackingToken,
        E: EventStorageEngine<P, T>,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let inner = Arc::clone(inner);
        let name = format!("{}-producer", inner.config.thread_name_prefix);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || run(inner))
            .expect("failed to spawn producer thread");
        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stops the producer thread. Idempotent; blocks until the thread has
    /// exited.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.data_available.notify_all();
        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Default for Producer {
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
    let mut newest: Option<Arc<Node<P, T>>> = None;
    let mut stream: Option<E::Stream> = None;
    let mut stream_anchor: Option<Option<T>> = None;

    while !inner.producer.closed.load(Ordering::Acquire) {
        inner.producer.should_fetch.store(true, Ordering::Release);
        let mut data_found = false;
        while inner.producer.should_fetch.swap(false, Ordering::AcqRel) {
            data_found = fetch_data(&inner, &mut newest, &mut stream, &mut stream_anchor);
        }
        if !data_found {
            let closed = &inner.producer.closed;
            let should_fetch = &inner.producer.should_fetch;
            inner.producer.data_available.wait_for(inner.config.fetch_delay, || {
                if should_fetch.load(Ordering::Acquire) || closed.load(Ordering::Acquire) {
                    Some(())
                } else {
                    None
                }
            });
        }
    }

    if let Some(stream) = stream.as_mut() {
        stream.close();
    }
}

/// Where the producer anchors its next poll: the token of the node it
/// last appended, or, if the cache is empty, some tailing consumer's last
/// delivered token (any one — see `TailingRegistry::any_last_token`).
fn last_token<P, T, E>(inner: &StoreInner<P, T, E>, newest: &Option<Arc<Node<P, T>>>) -> Option<T>
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    match newest {
        Some(node) => Some(node.event().tracking_token().clone()),
        None => inner.registry.any_last_token(),
    }
}

/// Drains every event currently available from storage into the ring,
/// trims the head, and wakes waiting consumers. Returns `true` iff the
/// ring's tail advanced this cycle.
fn fetch_data<P, T, E>(
    inner: &Arc<StoreInner<P, T, E>>,
    newest: &mut Option<Arc<Node<P, T>>>,
    stream: &mut Option<E::Stream>,
    stream_anchor: &mut Option<Option<T>>,
) -> bool
where
    P: Clone + Send + Sync + 'static,
    T: TrackingToken,
    E: EventStorageEngine<P, T>,
{
    inner.metrics.record_fetch_cycle();

    if inner.registry.is_empty() {
        return false;
    }

    let anchor = last_token(inner, newest);
    if stream.is_none() || stream_anchor.as_ref() != Some(&anchor) {
        if let Some(existing) = stream.as_mut() {
            existing.close();
        }
        *stream = Some(inner.storage.read_events(anchor.clone(), true));
        *stream_anchor = Some(anchor);
    }

    let mut advanced = false;
    loop {
        let polled = stream.as_mut().unwrap().poll_next(Duration::ZERO);
        let event = match polled {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%error, "storage read failed; abandoning stream for this cycle");
                *stream = None;
                *stream_anchor = None;
                break;
            }
        };
        let Some(event) = event else { break };

        let previous_token = last_token(inner, newest);
        let index = newest.as_ref().map_or(0, |n| n.index() + 1);
        let node = Arc::new(Node::new(index, previous_token, event));
        if let Some(prev) = newest.as_ref() {
            prev.publish_next(Arc::clone(&node));
        } else {
            inner.ring.set_oldest(Some(Arc::clone(&node)));
        }
        *newest = Some(node);
        inner.metrics.record_node_appended();
        advanced = true;
    }

    if advanced {
        inner.consumer_signal.notify_all();
        let newest_index = newest.as_ref().unwrap().index();
        let trimmed = inner.ring.trim(newest_index, inner.config.cached_events);
        if trimmed > 0 {
            inner.metrics.record_nodes_trimmed(trimmed);
        }
    }

    advanced
}
