//! Embedded event store with a shared, bounded, in-memory tailing cache
//! for multiple concurrent tracking consumers.
//!
//! Events are appended to a durable [`EventStorageEngine`]; readers
//! advance through the event log by opaque [`TrackingToken`]s and receive
//! every event exactly once in global order. A single background
//! [`Producer`](crate::producer) thread tails the storage engine into a
//! shared [`NodeRing`](tracking_cache::NodeRing) cache (see the
//! `tracking-cache` crate); consumers read from that cache while they can
//! keep up and fall back to reading storage directly when they lag or
//! start from a token older than the cache retains. This crate is the
//! orchestration layer: the producer loop, the consumer state machine,
//! the cleaner, and the [`EmbeddedEventStore`] facade that wires them
//! together.
//!
//! ```
//! use event_storage::InMemoryStorageEngine;
//! use tracking_store::{EmbeddedEventStore, TrackingEventStream};
//!
//! let storage = InMemoryStorageEngine::new();
//! let store = EmbeddedEventStore::new(storage);
//!
//! store.publish(vec!["first".to_string(), "second".to_string()]).unwrap();
//!
//! let mut stream = store.open_stream(None);
//! let first = stream.next_available();
//! assert_eq!(first.payload(), "first");
//! ```

mod cleaner;
mod config;
mod consumer;
mod error;
mod invariants;
mod lag;
mod metrics;
mod producer;
mod registry;
mod shutdown;
mod signal;
mod store;

pub use config::EventStoreConfig;
pub use consumer::{TrackingConsumer, TrackingEventStream};
pub use error::StoreError;
pub use metrics::MetricsSnapshot;
pub use shutdown::ShutdownSignal;
pub use store::EmbeddedEventStore;

pub use event_storage::{EventStorageEngine, EventStream, InMemoryStorageEngine};
pub use tracking_cache::{GlobalSequenceTrackingToken, TrackedEvent, TrackingToken};
