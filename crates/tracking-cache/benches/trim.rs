//! Benchmarks for append and trim on the node ring.
//!
//! Run with: cargo bench --bench trim

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use tracking_cache::{Node, NodeRing, TrackedEvent};

const CACHED_EVENTS: usize = 10_000;
const APPEND_COUNT: u64 = 50_000;

fn build_ring(len: u64) -> (NodeRing<u64, u64>, Arc<Node<u64, u64>>) {
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
    (ring, prev.expect("len > 0"))
}

fn bench_append_and_trim(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_ring");
    group.throughput(Throughput::Elements(APPEND_COUNT));

    group.bench_function("append_then_trim", |b| {
        b.iter(|| {
            let ring = NodeRing::new();
            let mut newest: Option<Arc<Node<u64, u64>>> = None;
            for i in 0..APPEND_COUNT {
                let previous_token = newest.as_ref().map(|n| *n.event().tracking_token());
                let node = Arc::new(Node::new(i, previous_token, TrackedEvent::new(i, i)));
                if let Some(prev) = &newest {
                    prev.publish_next(Arc::clone(&node));
                } else {
                    ring.set_oldest(Some(Arc::clone(&node)));
                }
                newest = Some(node);
                ring.trim(black_box(i), CACHED_EVENTS);
            }
            black_box(ring.oldest().map(|n| n.index()))
        });
    });

    group.bench_function("find_by_token_cold_cache", |b| {
        let (ring, _newest) = build_ring(CACHED_EVENTS as u64);
        b.iter(|| black_box(ring.find_by_token(&0)));
    });

    group.finish();
}

criterion_group!(benches, bench_append_and_trim);
criterion_main!(benches);
