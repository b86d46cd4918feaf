//! The storage-engine collaborator boundary.
//!
//! Everything in the tailing cache and consumer state machine treats the
//! storage engine as an opaque, durable source of truth: append events,
//! read events strictly after a token in global order. This module defines
//! that boundary as two small traits so a real engine (sled, rocksdb, a
//! remote service) can stand in for [`InMemoryStorageEngine`](crate::InMemoryStorageEngine)
//! without the rest of the crate noticing.

use std::time::Duration;
use tracking_cache::{TrackedEvent, TrackingToken};

/// Durable append-only log of events, the source of truth the tailing
/// cache is an optimization over.
///
/// Implementations must guarantee that `append` commits events in the
/// order given, that each appended event receives a token strictly
/// greater (per `Ord`) than every token already committed, and that
/// `read_events` never skips or reorders events relative to that
/// commit order.
pub trait EventStorageEngine<P, T: TrackingToken>: Send + Sync + 'static {
    /// The error type this engine reports for append and read failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// A cursor over events strictly after a given token.
    type Stream: EventStream<P, T, Error = Self::Error>;

    /// Durably appends `events`, in order, and returns the token assigned
    /// to each one (same length and order as `events`).
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the engine cannot durably commit the
    /// batch. On error no event in the batch is considered committed.
    fn append(&self, events: Vec<P>) -> Result<Vec<T>, Self::Error>;

    /// Opens a cursor over events strictly after `after` (or from the
    /// beginning, if `None`), in global commit order.
    ///
    /// `may_block` is a hint about how the caller intends to use the
    /// returned stream: `true` for a long-lived cursor the producer
    /// reopens/reuses across many poll cycles as new events keep
    /// arriving; `false` for a one-shot cursor a private consumer drains
    /// to "caught up" and then discards. Either way, an individual
    /// [`EventStream::poll_next`] call only waits up to the timeout it is
    /// given — `may_block` never causes an unbounded internal wait.
    fn read_events(&self, after: Option<T>, may_block: bool) -> Self::Stream;
}

/// A cursor over a storage engine's event log.
///
/// Mirrors a blocking iterator: each call either yields the next event
/// immediately, waits up to `timeout` for one to arrive, or reports that
/// none arrived within the wait.
pub trait EventStream<P, T: TrackingToken>: Send {
    /// The error type this stream reports.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the next event after the stream's current position, waiting
    /// up to `timeout` if none is immediately available.
    ///
    /// `Ok(None)` means no event arrived within the wait — the caller
    /// decides whether to poll again, fall back to another strategy, or
    /// give up. It does not mean the stream is exhausted forever.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` if the underlying engine failed while
    /// reading. The stream's position is unchanged and it may be polled
    /// again.
    fn poll_next(&mut self, timeout: Duration) -> Result<Option<TrackedEvent<P, T>>, Self::Error>;

    /// Releases any resources held by this stream and causes subsequent
    /// `poll_next` calls to return `Ok(None)` immediately.
    fn close(&mut self);
}
