//! Cache activity counters.
//!
//! Observability *of the in-process tailing cache* — nodes appended and
//! trimmed, how many consumers are tailing versus reading privately, how
//! often the producer runs a fetch cycle, how often the cleaner evicts a
//! lagging consumer.

use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time snapshot of [`Metrics`], returned by
/// `EmbeddedEventStore::metrics()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total nodes ever appended to the ring.
    pub nodes_appended: u64,
    /// Total nodes ever trimmed from the head of the ring.
    pub nodes_trimmed: u64,
    /// Total consumers that have ever opened in tailing mode (including
    /// ones later promoted from private).
    pub tailing_consumers_opened: u64,
    /// Total consumers that have ever opened (or fallen back to) private
    /// mode.
    pub private_consumers_opened: u64,
    /// Total producer fetch cycles run.
    pub producer_fetch_cycles: u64,
    /// Total tailing consumers evicted by the cleaner for lagging behind
    /// the cache head.
    pub cleaner_evictions: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Metrics {
    nodes_appended: AtomicU64,
    nodes_trimmed: AtomicU64,
    tailing_consumers_opened: AtomicU64,
    private_consumers_opened: AtomicU64,
    producer_fetch_cycles: AtomicU64,
    cleaner_evictions: AtomicU64,
}

impl Metrics {
    pub fn record_node_appended(&self) {
        self.nodes_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_nodes_trimmed(&self, count: usize) {
        self.nodes_trimmed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_tailing_open(&self) {
        self.tailing_consumers_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_private_open(&self) {
        self.private_consumers_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_cycle(&self) {
        self.producer_fetch_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleaner_eviction(&self, count: usize) {
        self.cleaner_evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            nodes_appended: self.nodes_appended.load(Ordering::Relaxed),
            nodes_trimmed: self.nodes_trimmed.load(Ordering::Relaxed),
            tailing_consumers_opened: self.tailing_consumers_opened.load(Ordering::Relaxed),
            private_consumers_opened: self.private_consumers_opened.load(Ordering::Relaxed),
            producer_fetch_cycles: self.producer_fetch_cycles.load(Ordering::Relaxed),
            cleaner_evictions: self.cleaner_evictions.load(Ordering::Relaxed),
        }
    }
}
