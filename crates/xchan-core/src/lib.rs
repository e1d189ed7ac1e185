//! xchan - Cross-process single-slot handoff channel over shared memory

pub mod channel;
pub mod condvar;
mod control;
pub mod error;
pub mod frame;
pub mod mutex;
pub mod payload;
pub mod shm;

pub use channel::{Channel, WriteStatus};
pub use error::{Error, Result};
pub use frame::Frame;
pub use payload::Payload;
