//! A `Mutex<()>` + `Condvar` pair used for the two disjoint wait/notify
//! protocols the store needs: the producer's "new data might be available"
//! condition and the consumers' shared "a node was published" condition.
//!
//! Keeping the lock and the predicate check together in [`ConditionGate::wait_for`]
//! is what avoids the missed-wakeup race: the check runs under the same
//! lock a notifier must acquire before signaling, so a notification that
//! lands between the check and the wait is never lost.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

pub(crate) struct ConditionGate {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl ConditionGate {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Wakes every thread currently parked in [`Self::wait_for`].
    pub fn notify_all(&self) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.condvar.notify_all();
    }

    /// Runs `check` under the lock. If it returns `Some`, that value is
    /// returned immediately. Otherwise, unless `timeout` is zero, this
    /// parks on the condition variable for up to `timeout` and then runs
    /// `check` once more before returning its result.
    ///
    /// A wake-up is a hint, not a guarantee — `check` may still return
    /// `None` after waiting (spurious wakeup, or someone else consumed
    /// the thing being waited for). Callers already treat `None` as "not
    /// yet", so no extra looping is needed here.
    pub fn wait_for<R>(&self, timeout: Duration, mut check: impl FnMut() -> Option<R>) -> Option<R> {
        let guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = check() {
            return Some(value);
        }
        if timeout.is_zero() {
            return None;
        }
        let (_guard, _timed_out) = self
            .condvar
            .wait_timeout(guard, timeout)
            .unwrap_or_else(|e| e.into_inner());
        check()
    }
}

impl Default for ConditionGate {
    fn default() -> Self {
        Self::new()
    }
}
