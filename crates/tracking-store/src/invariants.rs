//! Debug assertion macros for store-level invariants that span the
//! producer, the registry, and the consumer state machine.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.

/// A tailing consumer's node handle only ever advances forward.
///
/// **Invariant**: `new.index > old.index` whenever `old` is present.
///
/// Used in: `TrackingConsumer::peek_global_stream`
macro_rules! debug_assert_monotonic_node_index {
    ($old:expr, $new:expr) => {
        if let Some(old) = $old {
            debug_assert!(
                $new.index() > old.index(),
                "INV-CONSUMER-01 violated: node index went from {} to {}",
                old.index(),
                $new.index()
            );
        }
    };
}

pub(crate) use debug_assert_monotonic_node_index;
