//! Construction-time configuration for an [`crate::EmbeddedEventStore`].

use std::env;
use std::time::Duration;

const DEFAULT_CACHED_EVENTS: usize = 10_000;
const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_millis(10_000);
const DEFAULT_THREAD_NAME_PREFIX: &str = "tracking-store";
const OPTIMIZE_EVENT_CONSUMPTION_ENV: &str = "OPTIMIZE_EVENT_CONSUMPTION";

/// Configuration for an [`crate::EmbeddedEventStore`], fixed at construction.
///
/// Built with the crate's builder idiom: construct a default (or a named
/// preset) and chain `with_*` calls.
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    pub(crate) cached_events: usize,
    pub(crate) fetch_delay: Duration,
    pub(crate) cleanup_delay: Duration,
    pub(crate) thread_name_prefix: String,
    pub(crate) optimize_event_consumption: bool,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            cached_events: DEFAULT_CACHED_EVENTS,
            fetch_delay: DEFAULT_FETCH_DELAY,
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            optimize_event_consumption: optimize_event_consumption_from_env().unwrap_or(true),
        }
    }
}

fn optimize_event_consumption_from_env() -> Option<bool> {
    match env::var(OPTIMIZE_EVENT_CONSUMPTION_ENV).ok()?.trim() {
        "0" | "false" | "FALSE" | "False" => Some(false),
        "1" | "true" | "TRUE" | "True" => Some(true),
        _ => None,
    }
}

impl EventStoreConfig {
    /// A small cache with short fetch and cleanup delays: favors freshness
    /// and low memory use over producer throughput.
    #[must_use]
    pub fn low_latency() -> Self {
        Self::default()
            .with_cached_events(256)
            .with_fetch_delay(Duration::from_millis(50))
            .with_cleanup_delay(Duration::from_millis(1_000))
    }

    /// A large cache with longer fetch and cleanup delays: favors producer
    /// throughput and tolerates slower consumers over memory use.
    #[must_use]
    pub fn high_throughput() -> Self {
        Self::default()
            .with_cached_events(100_000)
            .with_fetch_delay(Duration::from_millis(2_000))
            .with_cleanup_delay(Duration::from_millis(30_000))
    }

    /// Sets the maximum number of nodes the ring retains.
    ///
    /// # Panics
    ///
    /// Panics if `cached_events` is zero — the ring always needs room for
    /// at least the newest node.
    #[must_use]
    pub fn with_cached_events(mut self, cached_events: usize) -> Self {
        assert!(cached_events > 0, "cached_events must be at least 1");
        self.cached_events = cached_events;
        self
    }

    /// Sets how long the producer idles between polls when nothing new
    /// was found.
    #[must_use]
    pub fn with_fetch_delay(mut self, fetch_delay: Duration) -> Self {
        self.fetch_delay = fetch_delay;
        self
    }

    /// Sets how often the cleaner sweeps for lagging tailing consumers.
    #[must_use]
    pub fn with_cleanup_delay(mut self, cleanup_delay: Duration) -> Self {
        self.cleanup_delay = cleanup_delay;
        self
    }

    /// Sets the name prefix used for the producer and cleaner threads.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Sets whether consumers may join the shared tailing cache at all.
    /// When `false`, every stream reads privately from storage, and the
    /// producer thread never starts.
    #[must_use]
    pub fn with_optimize_event_consumption(mut self, enabled: bool) -> Self {
        self.optimize_event_consumption = enabled;
        self
    }

    /// Maximum number of nodes the ring retains.
    #[must_use]
    pub fn cached_events(&self) -> usize {
        self.cached_events
    }

    /// How long the producer idles between polls when nothing new was
    /// found.
    #[must_use]
    pub fn fetch_delay(&self) -> Duration {
        self.fetch_delay
    }

    /// How often the cleaner sweeps for lagging tailing consumers.
    #[must_use]
    pub fn cleanup_delay(&self) -> Duration {
        self.cleanup_delay
    }

    /// Whether consumers may join the shared tailing cache.
    #[must_use]
    pub fn optimize_event_consumption(&self) -> bool {
        self.optimize_event_consumption
    }
}
