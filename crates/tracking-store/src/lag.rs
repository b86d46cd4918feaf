//! Shared logic for deciding whether a tailing consumer has fallen behind
//! the cache's head, and for locating the node it should read next.
//!
//! Both the consumer's own `peek` and the cleaner's eviction sweep need
//! exactly the same answer to "is this consumer behind?" — this module is
//! the one place that answer is computed, so the two call sites can never
//! disagree.

use std::sync::Arc;
use tracking_cache::{Node, NodeRing, TrackingToken};

/// `true` iff a tailing consumer anchored at `last_node` (or, if it holds
/// no node handle yet, at `last_token`) has fallen behind the cache's
/// current head and must fall back to reading storage directly.
pub(crate) fn behind_global_cache<P, T: TrackingToken>(
    ring: &NodeRing<P, T>,
    last_node: Option<&Arc<Node<P, T>>>,
    last_token: Option<&T>,
) -> bool {
    let Some(oldest) = ring.oldest() else {
        return false;
    };
    match last_node {
        Some(node) => node.index() < oldest.index(),
        None => next_node(ring, None, last_token).is_none(),
    }
}

/// Finds the node a tailing consumer should read next: its successor, if
/// it already holds a node handle, or the first node whose
/// `previous_token` matches the token it last delivered, otherwise.
pub(crate) fn next_node<P, T: TrackingToken>(
    ring: &NodeRing<P, T>,
    last_node: Option<&Arc<Node<P, T>>>,
    last_token: Option<&T>,
) -> Option<Arc<Node<P, T>>> {
    match last_node {
        Some(node) => node.next(),
        None => ring.find_by_previous_token(last_token),
    }
}
