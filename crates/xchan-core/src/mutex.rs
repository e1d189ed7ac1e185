//! Interprocess mutex resident in a shared segment

use std::cell::UnsafeCell;
use std::hint::spin_loop;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::yield_now;

/// Spin mutex whose lock word lives in shared memory.
///
/// The word holds the id of the process currently inside the critical
/// section; zero means unlocked, so a fresh zero-filled segment is a valid
/// unlocked mutex. A process that dies while holding the lock leaves it
/// held; recovery is out of scope.
#[repr(C)]
pub struct ShmMutex<T> {
    lock: AtomicU32,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for ShmMutex<T> {}
unsafe impl<T: Send> Sync for ShmMutex<T> {}

/// RAII guard; unlocks on drop.
pub struct ShmMutexGuard<'a, T> {
    mutex: &'a ShmMutex<T>,
}

impl<'a, T> ShmMutexGuard<'a, T> {
    /// The mutex this guard locks. Associated function so it cannot shadow
    /// a method of `T` behind the `Deref`.
    pub(crate) fn mutex(guard: &Self) -> &'a ShmMutex<T> {
        guard.mutex
    }
}

impl<'a, T> Drop for ShmMutexGuard<'a, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

impl<'a, T> Deref for ShmMutexGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for ShmMutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> ShmMutex<T> {
    pub fn new(data: T) -> Self {
        ShmMutex {
            lock: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Block until the lock is acquired.
    pub fn lock(&self) -> ShmMutexGuard<'_, T> {
        let pid = std::process::id();
        loop {
            if self
                .lock
                .compare_exchange(0, pid, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }

            for _ in 0..100 {
                spin_loop();
            }
            yield_now();
        }

        ShmMutexGuard { mutex: self }
    }

    fn unlock(&self) {
        let pid = std::process::id();
        if self
            .lock
            .compare_exchange(pid, 0, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            let holder = self.lock.load(Ordering::Relaxed);
            tracing::warn!(pid, holder, "unlock of a mutex this process does not hold");
        }
    }

    /// Exclusive access without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}
