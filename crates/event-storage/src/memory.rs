//! Reference [`EventStorageEngine`] backed by an in-process `Mutex<Vec<_>>`.
//!
//! This is the engine the workspace's tests, benchmarks, and demo use. It
//! is not durable — restart loses everything — but it is a faithful,
//! order-preserving implementation of the trait contract, which is all the
//! tailing cache and consumer state machine require of a collaborator.

use crate::engine::{EventStorageEngine, EventStream};
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::trace;
use tracking_cache::{GlobalSequenceTrackingToken, TrackedEvent};

struct Log<P> {
    events: Mutex<Vec<TrackedEvent<P, GlobalSequenceTrackingToken>>>,
    arrived: Condvar,
    closed: AtomicBool,
}

/// An in-memory, single-partition [`EventStorageEngine`].
///
/// Tokens are dense zero-based sequence numbers assigned in append order
/// ([`GlobalSequenceTrackingToken`]). Cloning shares the same underlying
/// log (it is an `Arc` handle), which is how a demo or test hands the same
/// engine to both an `EmbeddedEventStore` and a background writer thread.
#[derive(Clone)]
pub struct InMemoryStorageEngine<P> {
    log: Arc<Log<P>>,
}

impl<P> Default for InMemoryStorageEngine<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> InMemoryStorageEngine<P> {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Arc::new(Log {
                events: Mutex::new(Vec::new()),
                arrived: Condvar::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Number of events committed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// `true` iff no event has ever been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops accepting new reads; open streams observe `Ok(None)` from
    /// then on. Mirrors a real engine's shutdown, exercised by the
    /// facade's `shut_down`.
    pub fn close(&self) {
        self.log.closed.store(true, Ordering::Release);
        self.log.arrived.notify_all();
    }
}

impl<P: Clone + Send + Sync + 'static> EventStorageEngine<P, GlobalSequenceTrackingToken>
    for InMemoryStorageEngine<P>
{
    type Error = Infallible;
    type Stream = InMemoryEventStream<P>;

    fn append(&self, events: Vec<P>) -> Result<Vec<GlobalSequenceTrackingToken>, Infallible> {
        let mut guard = self.log.events.lock().unwrap_or_else(|e| e.into_inner());
        let mut tokens = Vec::with_capacity(events.len());
        for payload in events {
            let token = GlobalSequenceTrackingToken::new(guard.len() as u64);
            guard.push(TrackedEvent::new(payload, token));
            tokens.push(token);
        }
        drop(guard);
        trace!(appended = tokens.len(), "in-memory engine committed events");
        self.log.arrived.notify_all();
        Ok(tokens)
    }

    fn read_events(
        &self,
        after: Option<GlobalSequenceTrackingToken>,
        may_block: bool,
    ) -> InMemoryEventStream<P> {
        let position = after.map_or(0, |t| t.sequence() + 1);
        InMemoryEventStream {
            log: Arc::clone(&self.log),
            position,
            may_block,
            closed: false,
        }
    }
}

/// A cursor over [`InMemoryStorageEngine`]'s log.
pub struct InMemoryEventStream<P> {
    log: Arc<Log<P>>,
    position: u64,
    may_block: bool,
    closed: bool,
}

impl<P: Clone + Send + Sync + 'static> EventStream<P, GlobalSequenceTrackingToken>
    for InMemoryEventStream<P>
{
    type Error = Infallible;

    fn poll_next(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<TrackedEvent<P, GlobalSequenceTrackingToken>>, Infallible> {
        if self.closed {
            return Ok(None);
        }

        let guard = self.log.events.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(event) = guard.get(self.position as usize) {
            let event = event.clone();
            drop(guard);
            self.position += 1;
            return Ok(Some(event));
        }

        if !self.may_block || timeout.is_zero() || self.log.closed.load(Ordering::Acquire) {
            return Ok(None);
        }

        let (guard, _timed_out) = self
            .log
            .arrived
            .wait_timeout(guard, timeout)
            .unwrap_or_else(|e| e.into_inner());
        let event = guard.get(self.position as usize).cloned();
        drop(guard);
        if let Some(event) = event {
            self.position += 1;
            return Ok(Some(event));
        }
        Ok(None)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
