use std::fmt;
use std::sync::Arc;

use super::alloc::DeviceMemory;
use super::DeviceError;

/// Offset pointer into a [`DeviceMemory`] allocation.
#[derive(Clone)]
pub struct DevicePtr {
    mem: Arc<DeviceMemory>,
    offset: usize,
}

impl DevicePtr {
    pub fn new(mem: &Arc<DeviceMemory>) -> DevicePtr {
        DevicePtr {
            mem: Arc::clone(mem),
            offset: 0,
        }
    }

    /// Pointer arithmetic at byte granularity.
    #[inline]
    pub fn byte_add(&self, count: usize) -> DevicePtr {
        DevicePtr {
            mem: Arc::clone(&self.mem),
            offset: self.offset + count,
        }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn read_bytes(&self, len: usize) -> Result<Vec<u8>, DeviceError> {
        self.mem.read(self.offset, len)
    }

    pub fn write_bytes(&self, data: &[u8]) -> Result<(), DeviceError> {
        self.mem.write(self.offset, data)
    }
}

impl fmt::Debug for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DevicePtr").field(&self.offset).finish()
    }
}
