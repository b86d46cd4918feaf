//! Errors `EmbeddedEventStore` can originate.

use thiserror::Error;

/// Errors `EmbeddedEventStore` operations can return.
///
/// There is no storage-read-failure variant here: the producer logs and
/// swallows those (see the producer module) and never propagates them to
/// a caller. Only `publish`'s own append can fail, and only `shut_down`
/// state can reject further calls.
#[derive(Debug, Error)]
pub enum StoreError<E: std::error::Error + 'static> {
    /// `storage.append` failed; no events in the batch were committed.
    #[error("failed to append events to storage")]
    Append(#[source] E),

    /// The store has already been shut down.
    #[error("event store has been shut down")]
    Closed,
}
