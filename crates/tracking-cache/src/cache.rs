//! The shared node ring: an append-only singly linked list of cached
//! events, trimmed from the head as the producer advances the tail.
//!
//! Only the producer ever appends nodes or advances `oldest`; consumers
//! and the cleaner only read. That single-writer discipline is what lets
//! the ring avoid a mutex around its traversal — correctness instead
//! comes from [`Node`]'s release/acquire publication of `next`, and from
//! `oldest` itself being published the same way.

use crate::node::Node;
use crate::token::TrackingToken;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Process-wide handle to the cache's head.
///
/// Holds only `oldest`; `newest` is private producer state (see
/// `tracking-store`'s `Producer`) because nothing outside the producer
/// ever needs to read it — consumers reach the tail by walking `next`
/// links, not by comparing against `newest` directly.
pub struct NodeRing<P, T: TrackingToken> {
    oldest: ArcSwapOption<Node<P, T>>,
}

impl<P, T: TrackingToken> Default for NodeRing<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T: TrackingToken> NodeRing<P, T> {
    /// Creates an empty ring.
    pub fn new() -> Self {
        Self {
            oldest: ArcSwapOption::const_empty(),
        }
    }

    /// The current head of the cache, or `None` if nothing has been
    /// cached yet.
    pub fn oldest(&self) -> Option<Arc<Node<P, T>>> {
        self.oldest.load_full()
    }

    /// Sets the head of the cache.
    ///
    /// Called by the producer when the very first node is appended (the
    /// ring transitions from empty to non-empty) and by [`Self::trim`]
    /// when advancing past consumed nodes.
    pub fn set_oldest(&self, node: Option<Arc<Node<P, T>>>) {
        self.oldest.store(node);
    }

    /// Linear scan from `oldest` for the node whose event carries `token`.
    ///
    /// Used by `open_stream` to decide whether a requested start token is
    /// still in the cache.
    pub fn find_by_token(&self, token: &T) -> Option<Arc<Node<P, T>>> {
        let mut current = self.oldest();
        while let Some(node) = current {
            if node.event().tracking_token() == token {
                return Some(node);
            }
            current = node.next();
        }
        None
    }

    /// Linear scan from `oldest` for the first node whose `previous_token`
    /// equals `token`.
    ///
    /// This is how a consumer with `last_node == None` locates its next
    /// node: it has no node handle yet, only the token it last delivered,
    /// so it looks for the node that was appended directly after that
    /// token.
    pub fn find_by_previous_token(&self, token: Option<&T>) -> Option<Arc<Node<P, T>>> {
        let mut current = self.oldest();
        while let Some(node) = current {
            if node.previous_token() == token {
                return Some(node);
            }
            current = node.next();
        }
        None
    }

    /// Advances `oldest` while the gap between `newest_index` and the
    /// candidate head's index is at least `cached_events`.
    ///
    /// Returns the number of nodes trimmed. After this call,
    /// `newest_index - oldest.index < cached_events` (INV-CACHE-01),
    /// unless the ring is empty.
    pub fn trim(&self, newest_index: u64, cached_events: usize) -> usize {
        let cached_events = cached_events as u64;
        let mut trimmed = 0usize;
        let mut candidate = self.oldest();

        while let Some(node) = candidate {
            if newest_index.saturating_sub(node.index()) < cached_events {
                break;
            }
            let next = node.next();
            // A node with no successor yet is the only node in the ring;
            // trimming it would empty the cache while consumers may still
            // be anchored on it, so we never trim past the last node.
            if next.is_none() {
                break;
            }
            candidate = next;
            trimmed += 1;
        }

        if trimmed > 0 {
            self.set_oldest(candidate.clone());
        }

        if let Some(oldest) = candidate {
            debug_assert!(
                newest_index.saturating_sub(oldest.index()) < cached_events
                    || newest_index == oldest.index(),
                "INV-CACHE-01 violated: cache window did not shrink below {cached_events}"
            );
        }

        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TrackedEvent;

    fn chain(len: u64) -> NodeRing<u64, u64> {
        let ring = NodeRing::new();
        let mut prev: Option<Arc<Node<u64, u64>>> = None;
        for i in 0..len {
            let previous_token = prev.as_ref().map(|p| *p.event().tracking_token());
            let node = Arc::new(Node::new(i, previous_token, TrackedEvent::new(i, i)));
            if let Some(p) = &prev {
                p.publish_next(Arc::clone(&node));
            } else {
                ring.set_oldest(Some(Arc::clone(&node)));
            }
            prev = Some(node);
        }
        ring
    }

    #[test]
    fn finds_node_by_token() {
        let ring = chain(5);
        let found = ring.find_by_token(&3).unwrap();
        assert_eq!(found.index(), 3);
    }

    #[test]
    fn finds_node_by_previous_token() {
        let ring = chain(5);
        // previous_token of node 3 is the tracking token of node 2, which is 2.
        let found = ring.find_by_previous_token(Some(&2)).unwrap();
        assert_eq!(found.index(), 3);
    }

    #[test]
    fn finds_head_by_none_previous_token() {
        let ring = chain(5);
        let found = ring.find_by_previous_token(None).unwrap();
        assert_eq!(found.index(), 0);
    }

    #[test]
    fn trim_advances_oldest_but_keeps_at_least_one_node() {
        let ring = chain(10);
        let trimmed = ring.trim(9, 4);
        assert!(trimmed > 0);
        let oldest = ring.oldest().unwrap();
        assert!(9 - oldest.index() < 4);
    }

    #[test]
    fn trim_never_empties_the_ring() {
        let ring = chain(3);
        // newest == oldest (single node chain head), nothing to trim past.
        let only = Arc::new(Node::new(0, None, TrackedEvent::new(0u64, 0u64)));
        let lone = NodeRing::new();
        lone.set_oldest(Some(only));
        let trimmed = lone.trim(0, 1);
        assert_eq!(trimmed, 0);
        assert!(lone.oldest().is_some());
        let _ = ring;
    }
}
