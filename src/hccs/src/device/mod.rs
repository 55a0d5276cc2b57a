pub mod alloc;
pub mod copy;
pub mod ptr;
pub mod stream;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("access of {len} bytes at offset {offset} exceeds allocation of {size} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },
    #[error("stream worker terminated")]
    StreamTerminated,
}
