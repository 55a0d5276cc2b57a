pub mod alltoall;
pub mod task;

use thiserror::Error;

use crate::device::stream::StreamTaskError;
use crate::device::DeviceError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum CollectiveError {
    #[error("invalid usage: number of local devices ({local_ranks}) or number of nodes ({num_nodes}) is 1")]
    InvalidUsage {
        num_nodes: usize,
        local_ranks: usize,
    },
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("runtime failure: {0}")]
    Runtime(#[from] DeviceError),
}

impl From<StreamTaskError> for CollectiveError {
    fn from(err: StreamTaskError) -> Self {
        match err {
            StreamTaskError::Device(e) => CollectiveError::Runtime(e),
            StreamTaskError::Transport(e) => CollectiveError::Transport(e),
        }
    }
}
