use crate::collective::task::TaskDataType;
use crate::device::ptr::DevicePtr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnType {
    Send,
    Recv,
}

/// One directed data movement posted inside a transfer group.
#[derive(Debug, Clone)]
pub struct TransferOp {
    pub conn_type: ConnType,
    pub buf: DevicePtr,
    pub count: usize,
    pub data_type: TaskDataType,
    pub peer: usize,
    // pacing hints for the wire transport; the in-process fabric ignores them
    pub chunk_steps: u32,
    pub slice_steps: u32,
}

impl TransferOp {
    #[inline]
    pub fn num_bytes(&self) -> usize {
        self.count * self.data_type.count_bytes()
    }
}
