//! Cross-process single-slot handoff channel

use crate::control::{ControlBlock, INIT_WAIT};
use crate::payload::Payload;
use crate::shm::SharedMemory;
use crate::{Error, Result};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

/// Outcome of a write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// The value is in the slot and waiters were woken
    Success,
    /// The channel is detached; nothing was written
    Failure,
}

/// Control-block pointer that may cross into a write task.
struct TaskPtr<T>(*mut ControlBlock<T>);

// Safety: the pointee is segment data synchronized by its own lock, and the
// channel joins the task before the mapping can go away.
unsafe impl<T> Send for TaskPtr<T> {}

/// Cross-process single-slot handoff channel.
///
/// One pending value of `T` lives in a named shared memory segment, guarded
/// by an interprocess mutex and condition variable. [`write`](Self::write)
/// replaces the pending value (last write wins, no queuing) and wakes
/// waiters; [`read`](Self::read) blocks until a value is pending and
/// consumes it. Every process attaching the same name converses over the
/// same slot, as do threads sharing one handle.
///
/// Dropping a handle removes the named object for everyone; coordinating
/// who drops first is the callers' affair.
pub struct Channel<T: Payload> {
    shm: SharedMemory,
    ctrl: *mut ControlBlock<T>,
    created: bool,
    pending: Mutex<Option<JoinHandle<WriteStatus>>>,
}

// Safety: the control block is only touched through its interprocess mutex
// and atomics, and `pending` serializes the write-task handle.
unsafe impl<T: Payload> Send for Channel<T> {}
unsafe impl<T: Payload> Sync for Channel<T> {}

impl<T: Payload> Channel<T> {
    /// Attach to the named channel, creating its segment if needed.
    ///
    /// Exactly one racing caller creates the segment and initializes the
    /// control block; everyone else waits for the block to be published and
    /// then validates that it matches this payload type.
    pub fn attach(name: &str) -> Result<Self> {
        let size = ControlBlock::<T>::segment_size();
        let (mut shm, created) = SharedMemory::open_or_create(name, size)?;

        let ctrl = shm.as_mut_ptr().cast::<ControlBlock<T>>();
        debug_assert_eq!(
            ctrl as usize % std::mem::align_of::<ControlBlock<T>>(),
            0,
            "mapping must be aligned for the control block"
        );

        if created {
            unsafe { ControlBlock::init_in_place(ctrl) };
        } else {
            unsafe { ControlBlock::wait_ready(ctrl, INIT_WAIT)? };
        }

        tracing::debug!(name = %name, size, created, "attached channel");

        Ok(Self {
            shm,
            ctrl,
            created,
            pending: Mutex::new(None),
        })
    }

    /// Segment name this channel is attached to
    pub fn name(&self) -> &str {
        self.shm.name()
    }

    /// Whether this handle created (and initialized) the segment
    pub fn created(&self) -> bool {
        self.created
    }

    fn control(&self) -> Option<&ControlBlock<T>> {
        // Null after detach(); the mapping itself stays valid until drop.
        unsafe { self.ctrl.as_ref() }
    }

    /// Publish `value`, replacing any unread previous value.
    ///
    /// Returns [`WriteStatus::Failure`] without blocking when detached.
    pub fn write(&self, value: &T) -> WriteStatus {
        let ctrl = match self.control() {
            Some(ctrl) => ctrl,
            None => return WriteStatus::Failure,
        };

        let mut slot = ctrl.slot.lock();
        slot.value = *value;
        slot.ready = true;
        ctrl.cond.notify_all();
        WriteStatus::Success
    }

    /// Publish `value` from a background task (fire and forget).
    ///
    /// At most one write task is in flight per handle: a new call joins the
    /// previous task before spawning, so queued values land in call order.
    /// Teardown joins too, so the task never outlives the mapping. The
    /// outcome can be collected with [`flush`](Self::flush).
    pub fn write_async(&self, value: T) {
        if self.ctrl.is_null() {
            return;
        }

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            Self::join_write(previous);
        }

        let target = TaskPtr(self.ctrl);
        *pending = Some(std::thread::spawn(move || {
            // Rebind the wrapper whole; field-precise capture would move
            // only the bare non-Send pointer.
            let target = target;
            let ctrl = unsafe { &*target.0 };
            let mut slot = ctrl.slot.lock();
            slot.value = value;
            slot.ready = true;
            ctrl.cond.notify_all();
            WriteStatus::Success
        }));
    }

    /// Wait for the in-flight asynchronous write, if any, and report it.
    pub fn flush(&self) -> Option<WriteStatus> {
        let handle = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.take()
        };
        handle.map(Self::join_write)
    }

    fn join_write(handle: JoinHandle<WriteStatus>) -> WriteStatus {
        match handle.join() {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!("asynchronous write task panicked");
                WriteStatus::Failure
            }
        }
    }

    /// Block until a value is pending, consume it, and return it.
    ///
    /// Waits forever if no writer ever publishes. Fails fast with
    /// [`Error::Detached`] when detached.
    pub fn read(&self) -> Result<T> {
        let ctrl = self.control().ok_or(Error::Detached)?;

        let guard = ctrl.slot.lock();
        let mut slot = ctrl.cond.wait_while(guard, |slot| !slot.ready);
        slot.ready = false;
        Ok(slot.value)
    }

    /// As [`read`](Self::read), but give up once `timeout` has elapsed.
    ///
    /// Returns `Ok(None)` if no value arrived in time.
    pub fn read_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        let ctrl = self.control().ok_or(Error::Detached)?;

        let guard = ctrl.slot.lock();
        let (mut slot, timed_out) =
            ctrl.cond.wait_timeout_while(guard, timeout, |slot| !slot.ready);
        if timed_out {
            return Ok(None);
        }
        slot.ready = false;
        Ok(Some(slot.value))
    }

    /// Drop the control-block reference without tearing the segment down.
    ///
    /// An in-flight asynchronous write is joined first. Afterwards `write`
    /// returns [`WriteStatus::Failure`] and `read` fails with
    /// [`Error::Detached`], both without blocking, and dropping the handle
    /// leaves the OS object in place.
    pub fn detach(&mut self) {
        self.flush();
        self.ctrl = std::ptr::null_mut();
        self.shm.set_owner(false);
        tracing::debug!(name = %self.shm.name(), "detached channel");
    }
}

impl<T: Payload> Drop for Channel<T> {
    fn drop(&mut self) {
        // A straggling write task must land before the mapping goes away.
        self.flush();

        if self.ctrl.is_null() {
            return;
        }

        // Teardown removes the name regardless of which side created the
        // segment; removal is cooperative, not reference-counted.
        self.shm.set_owner(true);
        tracing::debug!(
            name = %self.shm.name(),
            created = self.created,
            "tearing down channel"
        );
    }
}
