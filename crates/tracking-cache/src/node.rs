//! A single cached event and its link to the next node.

use crate::event::TrackedEvent;
use crate::invariants::debug_assert_single_assignment;
use crate::token::TrackingToken;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// One element of the append-only node ring.
///
/// `next` is published with release semantics via [`ArcSwapOption`] and is
/// set at most once, by the producer, after every other field has already
/// been written — a consumer that observes a non-empty `next` is therefore
/// guaranteed to see a fully initialized node on the other end.
pub struct Node<P, T: TrackingToken> {
    index: u64,
    previous_token: Option<T>,
    event: TrackedEvent<P, T>,
    next: ArcSwapOption<Node<P, T>>,
}

impl<P, T: TrackingToken> Node<P, T> {
    /// Creates a new, unlinked node.
    ///
    /// `previous_token` is `None` only for the very first event the
    /// producer ever caches; every later node carries the token of the
    /// event immediately preceding it in the global order.
    pub fn new(index: u64, previous_token: Option<T>, event: TrackedEvent<P, T>) -> Self {
        Self {
            index,
            previous_token,
            event,
            next: ArcSwapOption::const_empty(),
        }
    }

    /// Dense, monotonically increasing position within the cache. Not the
    /// global tracking token.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The tail token at the moment this node was appended, i.e. the
    /// token a consumer must hold to legitimately receive this node next.
    pub fn previous_token(&self) -> Option<&T> {
        self.previous_token.as_ref()
    }

    /// The cached event itself.
    pub fn event(&self) -> &TrackedEvent<P, T> {
        &self.event
    }

    /// Loads the successor node, if the producer has linked one yet.
    ///
    /// Uses an acquire load so that, if this returns `Some`, every field of
    /// the returned node (including its own `event`) is visible to this
    /// thread.
    pub fn next(&self) -> Option<Arc<Node<P, T>>> {
        self.next.load_full()
    }

    /// Links `next` as this node's successor.
    ///
    /// Must be called at most once per node — the ring is append-only and
    /// a node's successor never changes once published. Debug builds
    /// assert this; release builds simply overwrite, which would violate
    /// the cache's ordering invariant, so callers (only the producer ever
    /// calls this) must uphold the single-assignment rule themselves.
    pub fn publish_next(&self, next: Arc<Node<P, T>>) {
        #[cfg(debug_assertions)]
        debug_assert_single_assignment!(self.next.load().is_some(), self.index);
        self.next.store(Some(next));
    }
}
