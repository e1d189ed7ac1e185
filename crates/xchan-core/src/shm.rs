//! POSIX shared memory wrapper

use crate::{Error, Result};
use shared_memory::{Shmem, ShmemConf, ShmemError};
use std::thread;
use std::time::{Duration, Instant};

/// How long `open_or_create` keeps retrying an open while a racing creator
/// may still be sizing the object.
const OPEN_RETRY_WINDOW: Duration = Duration::from_secs(1);
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Shared memory region wrapper
pub struct SharedMemory {
    inner: Shmem,
    name: String,
    size: usize,
}

// Safety: the mapping stays valid for as long as `inner` lives, and all
// access to its contents goes through raw pointers whose synchronization is
// the caller's responsibility.
unsafe impl Send for SharedMemory {}
unsafe impl Sync for SharedMemory {}

impl SharedMemory {
    /// Create a new shared memory region
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let shmem = ShmemConf::new()
            .size(size)
            .os_id(name)
            .create()
            .map_err(|e| Error::Mapping(e.to_string()))?;

        tracing::debug!(name = %name, size, "created shared memory region");

        Ok(Self {
            inner: shmem,
            name: name.to_string(),
            size,
        })
    }

    /// Open an existing shared memory region
    pub fn open(name: &str) -> Result<Self> {
        let shmem = ShmemConf::new()
            .os_id(name)
            .open()
            .map_err(|e| Error::Mapping(e.to_string()))?;

        let size = shmem.len();
        tracing::debug!(name = %name, size, "opened shared memory region");

        Ok(Self {
            inner: shmem,
            name: name.to_string(),
            size,
        })
    }

    /// Open the named region, creating it first if it does not exist.
    ///
    /// Returns the mapping and whether this call created it; exactly one of
    /// several racing callers observes `true`. An open racing with the
    /// creator sizing the object is retried briefly; a region still smaller
    /// than `size` when the retry window closes is reported as
    /// [`Error::SegmentSize`].
    pub fn open_or_create(name: &str, size: usize) -> Result<(Self, bool)> {
        let deadline = Instant::now() + OPEN_RETRY_WINDOW;
        loop {
            match ShmemConf::new().size(size).os_id(name).create() {
                Ok(shmem) => {
                    tracing::debug!(name = %name, size, "created shared memory region");
                    return Ok((
                        Self {
                            inner: shmem,
                            name: name.to_string(),
                            size,
                        },
                        true,
                    ));
                }
                Err(ShmemError::LinkExists) | Err(ShmemError::MappingIdExists) => {}
                Err(e) => return Err(Error::Mapping(e.to_string())),
            }

            // Lost the creation race; attach to the winner's region.
            match Self::open(name) {
                Ok(shm) if shm.size() >= size => return Ok((shm, false)),
                Ok(shm) if Instant::now() >= deadline => {
                    return Err(Error::SegmentSize {
                        needed: size,
                        actual: shm.size(),
                    });
                }
                Err(e) if Instant::now() >= deadline => return Err(e),
                _ => thread::sleep(OPEN_RETRY_INTERVAL),
            }
        }
    }

    /// Get the name of the shared memory region
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the size of the shared memory region
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether dropping this mapping removes the OS object
    pub fn is_owner(&self) -> bool {
        self.inner.is_owner()
    }

    /// Choose whether dropping this mapping removes the OS object
    pub fn set_owner(&mut self, owner: bool) {
        self.inner.set_owner(owner);
    }

    /// Get a raw pointer to the shared memory
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.as_ptr()
    }

    /// Get a mutable raw pointer to the shared memory
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.inner.as_ptr()
    }
}
