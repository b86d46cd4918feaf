//! The process-wide set of currently-tailing consumers.
//!
//! Membership in this set *is* a consumer's mode — there is no separate
//! `mode` flag anywhere. A consumer is tailing iff its id is present here;
//! the cleaner (and, for a lagging consumer, the consumer itself) can
//! demote it to private simply by removing it, with no further
//! coordination required.

use crate::lag;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracking_cache::{Node, NodeRing, TrackingToken};

/// Opaque handle identifying one consumer for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ConsumerId(u64);

/// The tailing-mode position of one consumer, visible to the producer
/// (for `last_token()` when the cache is empty) and the cleaner (for lag
/// detection), and updated only by the consumer's own owning thread.
pub(crate) struct TailingSlot<P, T: TrackingToken> {
    state: Mutex<SlotState<P, T>>,
}

struct SlotState<P, T: TrackingToken> {
    last_token: Option<T>,
    last_node: Option<Arc<Node<P, T>>>,
}

impl<P, T: TrackingToken> TailingSlot<P, T> {
    pub fn new(last_token: Option<T>, last_node: Option<Arc<Node<P, T>>>) -> Self {
        Self {
            state: Mutex::new(SlotState { last_token, last_node }),
        }
    }

    pub fn update(&self, last_token: Option<T>, last_node: Option<Arc<Node<P, T>>>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.last_token = last_token;
        state.last_node = last_node;
    }

    pub fn last_token(&self) -> Option<T> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).last_token.clone()
    }

    /// Both fields together, under a single lock acquisition.
    pub fn snapshot(&self) -> (Option<T>, Option<Arc<Node<P, T>>>) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        (state.last_token.clone(), state.last_node.clone())
    }
}

/// The concurrent registry of tailing consumers.
pub(crate) struct TailingRegistry<P, T: TrackingToken> {
    next_id: AtomicU64,
    consumers: Mutex<HashMap<ConsumerId, Arc<TailingSlot<P, T>>>>,
}

impl<P, T: TrackingToken> TailingRegistry<P, T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            consumers: Mutex::new(HashMap::new()),
        }
    }

    pub fn allocate_id(&self) -> ConsumerId {
        ConsumerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn insert(&self, id: ConsumerId, slot: Arc<TailingSlot<P, T>>) {
        self.consumers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, slot);
    }

    pub fn remove(&self, id: ConsumerId) -> bool {
        self.consumers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }

    pub fn contains(&self, id: ConsumerId) -> bool {
        self.consumers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&id)
    }

    pub fn slot(&self, id: ConsumerId) -> Option<Arc<TailingSlot<P, T>>> {
        self.consumers.lock().unwrap_or_else(|e| e.into_inner()).get(&id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    pub fn len(&self) -> usize {
        self.consumers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Removes every tailing consumer, returning how many were present.
    /// Used by `shut_down`.
    pub fn clear(&self) -> usize {
        let mut map = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        let count = map.len();
        map.clear();
        count
    }

    /// Any one tailing consumer's last delivered token: if every tailing
    /// consumer has a token, any single one of them is returned; if any
    /// consumer is still starting from the very beginning, or there are no
    /// tailing consumers at all, `None` is returned (start the next poll
    /// from the very beginning of the log).
    pub fn any_last_token(&self) -> Option<T> {
        let map = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        let mut candidate = None;
        for slot in map.values() {
            match slot.last_token() {
                None => return None,
                token => candidate = token,
            }
        }
        candidate
    }

    /// Evicts every tailing consumer that has fallen behind the current
    /// cache head, returning how many were evicted. Shared by the cleaner
    /// and by tests that want to assert eviction deterministically.
    pub fn evict_lagging(&self, ring: &NodeRing<P, T>) -> usize {
        let mut map = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        let lagging: Vec<ConsumerId> = map
            .iter()
            .filter(|(_, slot)| {
                let (token, node) = slot.snapshot();
                lag::behind_global_cache(ring, node.as_ref(), token.as_ref())
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &lagging {
            map.remove(id);
        }
        lagging.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracking_cache::TrackedEvent;

    fn node(index: u64, previous_token: Option<u64>) -> Arc<Node<u64, u64>> {
        Arc::new(Node::new(index, previous_token, TrackedEvent::new(index, index)))
    }

    #[test]
    fn any_last_token_returns_none_when_a_consumer_starts_from_beginning() {
        let registry: TailingRegistry<u64, u64> = TailingRegistry::new();
        registry.insert(registry.allocate_id(), Arc::new(TailingSlot::new(Some(3), None)));
        registry.insert(registry.allocate_id(), Arc::new(TailingSlot::new(None, None)));
        assert_eq!(registry.any_last_token(), None);
    }

    #[test]
    fn any_last_token_returns_none_when_empty() {
        let registry: TailingRegistry<u64, u64> = TailingRegistry::new();
        assert_eq!(registry.any_last_token(), None);
    }

    #[test]
    fn any_last_token_returns_a_token_when_all_consumers_have_one() {
        let registry: TailingRegistry<u64, u64> = TailingRegistry::new();
        registry.insert(registry.allocate_id(), Arc::new(TailingSlot::new(Some(5), None)));
        assert_eq!(registry.any_last_token(), Some(5));
    }

    #[test]
    fn evict_lagging_removes_consumers_behind_the_oldest_node() {
        let ring: NodeRing<u64, u64> = NodeRing::new();
        let head = node(5, Some(4));
        ring.set_oldest(Some(Arc::clone(&head)));

        let registry: TailingRegistry<u64, u64> = TailingRegistry::new();
        let lagging_id = registry.allocate_id();
        registry.insert(lagging_id, Arc::new(TailingSlot::new(Some(1), Some(node(1, Some(0))))));
        let current_id = registry.allocate_id();
        registry.insert(current_id, Arc::new(TailingSlot::new(Some(5), Some(Arc::clone(&head)))));

        let evicted = registry.evict_lagging(&ring);

        assert_eq!(evicted, 1);
        assert!(!registry.contains(lagging_id));
        assert!(registry.contains(current_id));
    }
}
