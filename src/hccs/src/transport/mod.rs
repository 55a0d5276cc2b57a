pub mod fabric;
pub mod group;
pub mod op;

use thiserror::Error;

pub const NUM_BUFFER_SLOTS: usize = 8;

pub const ALLTOALL_PIVOT_CHUNK_STEPS: u32 = (NUM_BUFFER_SLOTS / 2) as u32;
pub const ALLTOALL_PIVOT_SLICE_STEPS: u32 = (NUM_BUFFER_SLOTS / 4) as u32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("link {from} -> {to} is down")]
    LinkDown { from: usize, to: usize },
    #[error("peer {peer} disconnected")]
    Disconnected { peer: usize },
    #[error("receive from {from} timed out")]
    Timeout { from: usize },
    #[error("payload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}
