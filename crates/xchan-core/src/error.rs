//! Error types for xchan

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("shared memory error: {0}")]
    Mapping(String),

    #[error("segment too small: need {needed} bytes, got {actual}")]
    SegmentSize { needed: usize, actual: usize },

    #[error("invalid control block magic")]
    BadMagic,

    #[error("control block version mismatch: expected {expected}, got {actual}")]
    Version { expected: u32, actual: u32 },

    #[error("payload slot size mismatch: expected {expected} bytes, got {actual}")]
    SlotSize { expected: u32, actual: u32 },

    #[error("control block was never initialized by its creator")]
    Uninitialized,

    #[error("channel is detached from its control block")]
    Detached,
}

pub type Result<T> = std::result::Result<T, Error>;
