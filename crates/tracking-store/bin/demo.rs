//! Demonstration of the tailing event store.
//!
//! Run with: `cargo run -p tracking-store --bin demo`

use event_storage::InMemoryStorageEngine;
use std::thread;
use std::time::Duration;
use tracking_store::{EmbeddedEventStore, EventStoreConfig, TrackingEventStream};

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== tracking-store Demo ===\n");

    demo_basic_publish_and_tail();
    demo_multiple_shared_consumers();
    demo_lag_and_private_fallback();
    demo_commit_wakeup();
    demo_graceful_shutdown();

    println!("\n=== All demos completed ===");
}

/// Demo 1: publish a few events, consume them in order from the start.
fn demo_basic_publish_and_tail() {
    println!("--- Demo 1: Basic publish + tail ---");

    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    store.publish(vec!["alpha", "beta", "gamma"]).unwrap();

    let mut stream = store.open_stream(None);
    for _ in 0..3 {
        let event = stream.next_available();
        println!("  received {:?} at {}", event.payload(), event.tracking_token());
    }

    store.shut_down();
    println!("  done\n");
}

/// Demo 2: two consumers opened from the beginning share the same ring.
fn demo_multiple_shared_consumers() {
    println!("--- Demo 2: Multiple shared consumers ---");

    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    store.publish((1..=10).map(|n| format!("event-{n}")).collect()).unwrap();

    let mut a = store.open_stream(None);
    let mut b = store.open_stream(None);

    let drained_a: Vec<_> = (0..10).map(|_| a.next_available().into_payload()).collect();
    let drained_b: Vec<_> = (0..10).map(|_| b.next_available().into_payload()).collect();
    assert_eq!(drained_a, drained_b);
    println!("  both consumers drained {} matching events", drained_a.len());

    let metrics = store.metrics();
    println!("  metrics: {metrics:?}");

    store.shut_down();
    println!("  done\n");
}

/// Demo 3: a small cache forces a fresh consumer to start private, then
/// promotes it back to tailing once it catches up.
fn demo_lag_and_private_fallback() {
    println!("--- Demo 3: Lag and private fallback ---");

    let config = EventStoreConfig::default().with_cached_events(4);
    let store = EmbeddedEventStore::with_config(InMemoryStorageEngine::new(), config);
    store.publish((1..=10).map(|n| format!("event-{n}")).collect()).unwrap();

    // Give the producer a moment to tail and trim ahead of any reader.
    thread::sleep(Duration::from_millis(200));

    let mut stream = store.open_stream(None);
    let drained: Vec<_> = (0..10).map(|_| stream.next_available().into_payload()).collect();
    println!("  drained {} events despite a 4-node cache", drained.len());

    store.publish((11..=13).map(|n| format!("event-{n}")).collect()).unwrap();
    for _ in 0..3 {
        let event = stream.next_available();
        println!("  caught up to {:?}", event.payload());
    }

    store.shut_down();
    println!("  done\n");
}

/// Demo 5: a commit wakes a blocked `has_next_available` well before the
/// configured fetch delay would have elapsed.
fn demo_commit_wakeup() {
    println!("--- Demo 4: Commit wake-up ---");

    let config = EventStoreConfig::default().with_fetch_delay(Duration::from_secs(3600));
    let store = EmbeddedEventStore::with_config(InMemoryStorageEngine::new(), config);
    let mut stream = store.open_stream(None);

    let writer = store.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        writer.publish(vec!["late-arrival".to_string()]).unwrap();
    });

    let woke = stream.has_next_available(Duration::from_secs(10));
    println!("  woke up before the 1h fetch delay: {woke}");
    handle.join().unwrap();

    store.shut_down();
    println!("  done\n");
}

/// Demo 6: trigger shutdown from another thread via a cloned signal.
fn demo_graceful_shutdown() {
    println!("--- Demo 5: Graceful shutdown via ShutdownSignal ---");

    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    store.publish(vec![1, 2, 3]).unwrap();
    let _stream = store.open_stream(None);

    let signal = store.shutdown_signal();
    let handle = thread::spawn(move || signal.trigger());
    handle.join().unwrap();

    match store.publish(vec![4]) {
        Err(error) => println!("  publish after shutdown rejected: {error}"),
        Ok(_) => println!("  unexpected: publish succeeded after shutdown"),
    }
    println!("  done\n");
}
