//! Control block resident at offset zero of a channel's segment

use crate::condvar::ShmCondvar;
use crate::mutex::ShmMutex;
use crate::payload::Payload;
use crate::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

const MAGIC: u32 = 0x5843484E; // "XCHN"
const VERSION: u32 = 1;

const STATE_RAW: u32 = 0;
const STATE_READY: u32 = 1;

/// How long an attach waits for the creator to publish the block.
pub(crate) const INIT_WAIT: Duration = Duration::from_secs(5);

/// Payload slot guarded by the control block mutex.
#[repr(C)]
pub(crate) struct Slot<T> {
    /// True while a written value awaits a reader
    pub ready: bool,
    /// The pending value; meaningful only while `ready` is set
    pub value: T,
}

/// Fixed-layout structure at the start of the shared segment.
///
/// A freshly created POSIX object reads as zeroes, which is the valid
/// pre-init state: `state` is `STATE_RAW`, the mutex is unlocked, the
/// condition variable is at sequence zero, and the slot is empty. The
/// creator fills in the header and release-stores `STATE_READY`; attachers
/// acquire-load `state` before reading anything else, so the header writes
/// are visible to them without further synchronization.
#[repr(C)]
pub(crate) struct ControlBlock<T> {
    magic: u32,
    version: u32,
    slot_size: u32,
    state: AtomicU32,
    pub cond: ShmCondvar,
    pub slot: ShmMutex<Slot<T>>,
}

impl<T: Payload> ControlBlock<T> {
    /// Segment size needed for this payload type
    pub fn segment_size() -> usize {
        std::mem::size_of::<Self>()
    }

    /// Initialize a raw block in place and publish it.
    ///
    /// Called exactly once per segment, by the process that created it.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `segment_size()` bytes aligned for
    /// `Self` in a freshly created segment (still zero-filled apart from
    /// this call), mapped for the lifetime of the returned references.
    pub unsafe fn init_in_place(ptr: *mut Self) {
        (*ptr).magic = MAGIC;
        (*ptr).version = VERSION;
        (*ptr).slot_size = std::mem::size_of::<T>() as u32;
        (*ptr).state.store(STATE_READY, Ordering::Release);
    }

    /// Wait for the creator to publish the block, then validate it.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `segment_size()` bytes aligned for
    /// `Self` inside a mapping of the named segment.
    pub unsafe fn wait_ready(ptr: *const Self, wait: Duration) -> Result<()> {
        let state = &(*ptr).state;
        let deadline = Instant::now() + wait;
        while state.load(Ordering::Acquire) == STATE_RAW {
            if Instant::now() >= deadline {
                return Err(Error::Uninitialized);
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        let block = &*ptr;
        if block.magic != MAGIC {
            return Err(Error::BadMagic);
        }
        if block.version != VERSION {
            return Err(Error::Version {
                expected: VERSION,
                actual: block.version,
            });
        }
        let expected = std::mem::size_of::<T>() as u32;
        if block.slot_size != expected {
            return Err(Error::SlotSize {
                expected,
                actual: block.slot_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::MaybeUninit;

    /// Zero-filled, properly aligned stand-in for a fresh segment.
    fn raw_block<T: Payload>() -> Box<MaybeUninit<ControlBlock<T>>> {
        Box::new(MaybeUninit::zeroed())
    }

    #[test]
    fn layout_covers_header_and_slot() {
        assert!(ControlBlock::<u64>::segment_size() >= 16 + std::mem::size_of::<u64>());
        assert!(
            std::mem::align_of::<ControlBlock<u128>>() >= std::mem::align_of::<u128>(),
            "slot alignment must propagate to the block"
        );
    }

    #[test]
    fn init_then_wait_ready() {
        let mut raw = raw_block::<u64>();
        let ptr = raw.as_mut_ptr();

        unsafe {
            ControlBlock::init_in_place(ptr);
            ControlBlock::wait_ready(ptr, Duration::from_millis(50)).unwrap();
        }
    }

    #[test]
    fn raw_block_reports_uninitialized() {
        let raw = raw_block::<u64>();
        let ptr = raw.as_ptr();

        let err = unsafe { ControlBlock::wait_ready(ptr, Duration::from_millis(50)) };
        assert!(matches!(err, Err(Error::Uninitialized)));
    }

    #[test]
    fn corrupt_magic_is_rejected() {
        let mut raw = raw_block::<u64>();
        let ptr = raw.as_mut_ptr();

        unsafe {
            ControlBlock::init_in_place(ptr);
            (*ptr).magic = 0xDEADBEEF;
            let err = ControlBlock::wait_ready(ptr, Duration::from_millis(50));
            assert!(matches!(err, Err(Error::BadMagic)));
        }
    }

    #[test]
    fn foreign_version_is_rejected() {
        let mut raw = raw_block::<u64>();
        let ptr = raw.as_mut_ptr();

        unsafe {
            ControlBlock::init_in_place(ptr);
            (*ptr).version = 2;
            let err = ControlBlock::wait_ready(ptr, Duration::from_millis(50));
            assert!(matches!(err, Err(Error::Version { expected: 1, actual: 2 })));
        }
    }

    #[test]
    fn differently_sized_slot_is_rejected() {
        // A block initialized for one payload type must not validate for a
        // type of another size.
        let mut raw = raw_block::<u64>();
        let ptr = raw.as_mut_ptr();

        unsafe {
            ControlBlock::init_in_place(ptr.cast::<ControlBlock<u32>>());
            let err = ControlBlock::wait_ready(ptr.cast_const(), Duration::from_millis(50));
            assert!(matches!(err, Err(Error::SlotSize { expected: 8, actual: 4 })));
        }
    }
}
