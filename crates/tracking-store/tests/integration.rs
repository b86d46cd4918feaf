//! Integration tests covering the store's concrete scenarios: in-order
//! delivery, shared-ring fan-out, lag/recovery, cleaner eviction, commit
//! wake-up, and `optimize_event_consumption = false`.

use event_storage::InMemoryStorageEngine;
use std::thread;
use std::time::{Duration, Instant};
use tracking_store::{EmbeddedEventStore, EventStoreConfig, TrackingEventStream};

fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn single_producer_single_consumer_in_order() {
    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    let mut stream = store.open_stream(None);

    store.publish(vec![1, 2, 3]).unwrap();

    let received: Vec<_> = (0..3).map(|_| stream.next_available().into_payload()).collect();
    assert_eq!(received, vec![1, 2, 3]);

    store.shut_down();
}

#[test]
fn two_consumers_share_the_ring() {
    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    store.publish((1..=10).collect()).unwrap();

    let mut a = store.open_stream(None);
    let mut b = store.open_stream(None);

    let drained_a: Vec<_> = (0..10).map(|_| a.next_available().into_payload()).collect();
    let drained_b: Vec<_> = (0..10).map(|_| b.next_available().into_payload()).collect();

    assert_eq!(drained_a, (1..=10).collect::<Vec<_>>());
    assert_eq!(drained_b, (1..=10).collect::<Vec<_>>());

    // Both private streams just caught up with storage; probing once more
    // finds nothing available and promotes each consumer into the shared
    // tailing set — the "steady state" the scenario asserts.
    assert!(!a.has_next_available(Duration::from_millis(100)));
    assert!(!b.has_next_available(Duration::from_millis(100)));
    assert!(wait_until(
        || store.metrics().tailing_consumers_opened >= 2,
        Duration::from_secs(1)
    ));

    store.shut_down();
}

#[test]
fn lag_forces_private_start_then_recovers_to_tailing() {
    // The cache starts empty and stays empty until a tailing consumer
    // exists to make the producer fetch, so a stream opened at `None`
    // against an already-populated storage engine necessarily starts
    // private: it reads all ten events directly from storage, and only
    // once it catches up (storage has nothing more to offer) does it
    // promote itself into the tailing set.
    let config = EventStoreConfig::default()
        .with_cached_events(4)
        .with_fetch_delay(Duration::from_millis(20));
    let store = EmbeddedEventStore::with_config(InMemoryStorageEngine::new(), config);
    store.publish((1..=10).collect()).unwrap();

    let mut stream = store.open_stream(None);
    let drained: Vec<_> = (0..10).map(|_| stream.next_available().into_payload()).collect();
    assert_eq!(drained, (1..=10).collect::<Vec<_>>());

    // Probing once more while storage has nothing left is what the private
    // stream's "hit the end" check needs to promote into the tailing set.
    assert!(!stream.has_next_available(Duration::from_millis(50)));

    store.publish(vec![11, 12, 13]).unwrap();
    let tail: Vec<_> = (0..3).map(|_| stream.next_available().into_payload()).collect();
    assert_eq!(tail, vec![11, 12, 13]);

    store.shut_down();
}

#[test]
fn cleaner_evicts_consumers_that_fall_behind() {
    let config = EventStoreConfig::default()
        .with_cached_events(2)
        .with_fetch_delay(Duration::from_millis(10))
        .with_cleanup_delay(Duration::from_millis(30));
    let store = EmbeddedEventStore::with_config(InMemoryStorageEngine::new(), config);

    // Storage is empty at this point, so the first peek finds the private
    // stream immediately caught up and promotes the consumer into the
    // tailing set with `last_node = None`.
    let mut stream = store.open_stream(None);
    assert!(stream.peek().is_none());

    store.publish(vec![1, 2, 3, 4, 5]).unwrap();

    assert!(wait_until(|| store.metrics().cleaner_evictions > 0, Duration::from_secs(2)));

    let received: Vec<_> = (0..5).map(|_| stream.next_available().into_payload()).collect();
    assert_eq!(received, vec![1, 2, 3, 4, 5]);

    store.shut_down();
}

#[test]
fn publish_wakes_a_blocked_consumer_well_before_the_fetch_delay() {
    let config = EventStoreConfig::default().with_fetch_delay(Duration::from_secs(3600));
    let store = EmbeddedEventStore::with_config(InMemoryStorageEngine::new(), config);
    let mut stream = store.open_stream(None);

    let writer = store.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        writer.publish(vec![42]).unwrap();
    });

    let started = Instant::now();
    assert!(stream.has_next_available(Duration::from_secs(10)));
    assert!(started.elapsed() < Duration::from_secs(5));

    handle.join().unwrap();
    store.shut_down();
}

#[test]
fn optimize_event_consumption_disabled_keeps_every_consumer_private() {
    let config = EventStoreConfig::default().with_optimize_event_consumption(false);
    let store = EmbeddedEventStore::with_config(InMemoryStorageEngine::new(), config);
    store.publish(vec![1, 2, 3]).unwrap();

    let mut a = store.open_stream(None);
    let mut b = store.open_stream(None);

    assert_eq!(a.next_available().into_payload(), 1);
    assert_eq!(b.next_available().into_payload(), 1);

    // No tailing consumer ever registers, so the producer thread is never
    // started and no fetch cycle is ever recorded.
    thread::sleep(Duration::from_millis(100));
    assert_eq!(store.metrics().producer_fetch_cycles, 0);
    assert_eq!(store.metrics().tailing_consumers_opened, 0);

    store.shut_down();
}

#[test]
fn empty_storage_has_next_available_times_out() {
    let store: EmbeddedEventStore<u32, _, _> = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    let mut stream = store.open_stream(None);

    let started = Instant::now();
    assert!(!stream.has_next_available(Duration::from_millis(100)));
    assert!(started.elapsed() >= Duration::from_millis(90));

    store.shut_down();
}

#[test]
fn reopen_from_last_token_continues_without_gap_or_duplicate() {
    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    store.publish((1..=5).collect()).unwrap();

    let mut stream = store.open_stream(None);
    let first_two: Vec<_> = (0..2).map(|_| stream.next_available()).collect();
    let last_token = *first_two.last().unwrap().tracking_token();
    stream.close();

    let mut resumed = store.open_stream(Some(last_token));
    let rest: Vec<_> = (0..3).map(|_| resumed.next_available().into_payload()).collect();
    assert_eq!(rest, vec![3, 4, 5]);

    store.shut_down();
}

#[test]
fn close_is_idempotent() {
    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    store.publish(vec![1]).unwrap();
    let mut stream = store.open_stream(None);
    stream.close();
    stream.close();
    assert!(stream.peek().is_none());
    store.shut_down();
}

#[test]
fn peek_then_next_available_return_the_same_event() {
    let store = EmbeddedEventStore::new(InMemoryStorageEngine::new());
    store.publish(vec![7]).unwrap();
    let mut stream = store.open_stream(None);

    assert!(stream.has_next_available(Duration::from_secs(1)));
    let peeked = stream.peek().unwrap();
    let next = stream.next_available();
    assert_eq!(*peeked.payload(), *next.payload());
    assert!(stream.peek().is_none());

    store.shut_down();
}
