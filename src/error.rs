//! Rejection kinds surfaced to the buffer producer.
//!
//! Validation and lookup failures are returned synchronously and carry no
//! side effects; everything that can go wrong after a swap has been accepted
//! is funneled into the single swap completion instead.

use thiserror::Error;

use crate::link::BufferId;

/// Why a `create_buffer` request was rejected.
///
/// The descriptor passed with the rejected request has already been closed
/// by the time the caller sees one of these.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CreateBufferError {
    #[error("buffer fd is not an open descriptor")]
    BadDescriptor,

    #[error("buffer size {0}x{1} is invalid")]
    BadSize(u32, u32),

    #[error("planes count cannot be less than 1")]
    BadPlaneCount,

    #[error(
        "number of strides({strides})/offsets({offsets})/modifiers({modifiers}) \
         does not correspond to the number of planes({planes})"
    )]
    PlaneArrayMismatch {
        strides: usize,
        offsets: usize,
        modifiers: usize,
        planes: u32,
    },

    #[error("plane {0} has a zero stride")]
    ZeroStride(usize),

    #[error("buffer format {0:#010x} is not supported by the compositor")]
    UnsupportedFormat(u32),

    #[error("invalid buffer id: {0}")]
    BadId(BufferId),

    #[error("a buffer with id {0} already exists")]
    IdInUse(BufferId),
}

/// Why a `schedule_swap` request was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    #[error("invalid target widget")]
    BadTarget,

    #[error("invalid buffer id: {0}")]
    BadId(BufferId),

    #[error("buffer with id {0} does not exist")]
    UnknownId(BufferId),
}

/// Why a `destroy_buffer` request was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DestroyError {
    #[error("trying to destroy non-existing buffer {0}")]
    NotFound(BufferId),
}
