//! Condition variable usable across process boundaries

use crate::mutex::ShmMutexGuard;
use std::hint::spin_loop;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::yield_now;
use std::time::{Duration, Instant};

const SPIN_ROUNDS: u32 = 64;
const YIELD_ROUNDS: u32 = 64;
const PARK_INTERVAL: Duration = Duration::from_millis(1);

/// Sequence-count condition variable.
///
/// One atomic counter lives in the shared segment; `notify_all` advances it
/// and waiters watch it move, escalating from spinning to yielding to short
/// sleeps. The all-zero bit pattern is a valid initial state, matching a
/// fresh segment.
#[repr(C)]
pub struct ShmCondvar {
    seq: AtomicU32,
}

impl ShmCondvar {
    pub fn new() -> Self {
        ShmCondvar {
            seq: AtomicU32::new(0),
        }
    }

    /// Wake every waiter so it re-checks its predicate.
    pub fn notify_all(&self) {
        self.seq.fetch_add(1, Ordering::Release);
    }

    /// Block until `pred` returns false, releasing the guard while waiting.
    ///
    /// The counter is snapshotted before the lock is released, so a
    /// notification arriving between release and sleep is never missed.
    /// Spurious wakeups are absorbed by re-checking `pred` under the lock.
    pub fn wait_while<'a, T, F>(
        &self,
        mut guard: ShmMutexGuard<'a, T>,
        mut pred: F,
    ) -> ShmMutexGuard<'a, T>
    where
        F: FnMut(&T) -> bool,
    {
        loop {
            if !pred(&guard) {
                return guard;
            }
            let seen = self.seq.load(Ordering::Acquire);
            let mutex = ShmMutexGuard::mutex(&guard);
            drop(guard);
            self.wait_for_notify(seen, None);
            guard = mutex.lock();
        }
    }

    /// As [`wait_while`](Self::wait_while), giving up once `timeout` has
    /// elapsed. A timeout too large to fold into a deadline is an untimed
    /// wait.
    ///
    /// Returns the reacquired guard and whether the wait timed out with the
    /// predicate still unsatisfied.
    pub fn wait_timeout_while<'a, T, F>(
        &self,
        mut guard: ShmMutexGuard<'a, T>,
        timeout: Duration,
        mut pred: F,
    ) -> (ShmMutexGuard<'a, T>, bool)
    where
        F: FnMut(&T) -> bool,
    {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => return (self.wait_while(guard, pred), false),
        };
        loop {
            if !pred(&guard) {
                return (guard, false);
            }
            let seen = self.seq.load(Ordering::Acquire);
            let mutex = ShmMutexGuard::mutex(&guard);
            drop(guard);
            let notified = self.wait_for_notify(seen, Some(deadline));
            guard = mutex.lock();
            if !notified && pred(&guard) {
                return (guard, true);
            }
        }
    }

    /// Watch the counter until it moves past `seen`.
    ///
    /// Returns false if `deadline` passes first.
    fn wait_for_notify(&self, seen: u32, deadline: Option<Instant>) -> bool {
        let mut rounds = 0u32;
        while self.seq.load(Ordering::Acquire) == seen {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return false;
                }
            }
            if rounds < SPIN_ROUNDS {
                spin_loop();
            } else if rounds < SPIN_ROUNDS + YIELD_ROUNDS {
                yield_now();
            } else {
                std::thread::sleep(PARK_INTERVAL);
            }
            rounds = rounds.saturating_add(1);
        }
        true
    }
}

impl Default for ShmCondvar {
    fn default() -> Self {
        Self::new()
    }
}
