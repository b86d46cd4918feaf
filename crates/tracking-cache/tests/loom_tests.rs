//! Loom-based exploration of the node ring's publication protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! `arc_swap::ArcSwapOption` is built on real atomics, not loom's shadow
//! ones, so loom cannot see through it directly. This models the same
//! single-writer-publishes/many-readers-observe protocol `Node::publish_next`
//! and `NodeRing::trim` implement, using loom's own primitives, and checks
//! the two properties that matter: a reader that observes a published
//! successor sees a fully initialized node (no torn read), and the index
//! sequence a reader walks is strictly increasing.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;

struct LoomNode {
    index: usize,
    initialized: AtomicBool,
    published: AtomicBool,
    next: loom::cell::UnsafeCell<Option<Arc<LoomNode>>>,
}

unsafe impl Send for LoomNode {}
unsafe impl Sync for LoomNode {}

impl LoomNode {
    fn new(index: usize) -> Arc<Self> {
        Arc::new(Self {
            index,
            initialized: AtomicBool::new(true),
            published: AtomicBool::new(false),
            next: loom::cell::UnsafeCell::new(None),
        })
    }

    /// Mirrors `Node::publish_next`: write the successor, then publish it
    /// with a release store so a reader's acquire load is guaranteed to
    /// see a fully written node.
    fn publish_next(&self, next: Arc<LoomNode>) {
        self.next.with_mut(|slot| unsafe { *slot = Some(next) });
        self.published.store(true, Ordering::Release);
    }

    /// Mirrors `Node::next`: an acquire load that only returns `Some` once
    /// the corresponding release store has happened-before this load.
    fn next(&self) -> Option<Arc<LoomNode>> {
        if self.published.load(Ordering::Acquire) {
            self.next.with(|slot| unsafe { (*slot).clone() })
        } else {
            None
        }
    }
}

#[test]
fn reader_never_observes_a_torn_successor() {
    loom::model(|| {
        let head = LoomNode::new(0);
        let tail = LoomNode::new(1);
        let head_for_writer = Arc::clone(&head);
        let tail_for_writer = Arc::clone(&tail);

        let writer = thread::spawn(move || {
            head_for_writer.publish_next(tail_for_writer);
        });

        let observed = head.next();
        if let Some(node) = observed {
            // If the successor is visible at all, it must be the fully
            // constructed node — `initialized` was set before this thread
            // could ever have gotten a handle to it.
            assert!(node.initialized.load(Ordering::Relaxed));
            assert_eq!(node.index, 1);
        }

        writer.join().unwrap();
        assert!(head.next().unwrap().index == 1);
    });
}

#[test]
fn concurrent_appends_preserve_strictly_increasing_indices() {
    loom::model(|| {
        let head = LoomNode::new(0);
        let appended = Arc::new(AtomicUsize::new(0));

        let tail = LoomNode::new(1);
        let head_for_writer = Arc::clone(&head);
        let appended_for_writer = Arc::clone(&appended);
        let writer = thread::spawn(move || {
            head_for_writer.publish_next(tail);
            appended_for_writer.fetch_add(1, Ordering::Release);
        });

        let mut last_seen = head.index;
        if let Some(node) = head.next() {
            assert!(node.index > last_seen);
            last_seen = node.index;
        }
        let _ = last_seen;

        writer.join().unwrap();
        assert_eq!(appended.load(Ordering::Acquire), 1);
        assert_eq!(head.next().unwrap().index, 1);
    });
}
