use std::sync::{Arc, Mutex};

use super::DeviceError;

/// One allocation in simulated device memory. All access goes through
/// byte-offset reads and writes so that stream tasks and the host observe
/// a single coherent copy of the data.
pub struct DeviceMemory {
    size: usize,
    bytes: Mutex<Box<[u8]>>,
}

impl DeviceMemory {
    /// Allocate `size` zero-initialized bytes.
    pub fn alloc(size: usize) -> Arc<DeviceMemory> {
        Arc::new(DeviceMemory {
            size,
            bytes: Mutex::new(vec![0u8; size].into_boxed_slice()),
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn read(&self, offset: usize, len: usize) -> Result<Vec<u8>, DeviceError> {
        self.check_bounds(offset, len)?;
        let bytes = self.bytes.lock().unwrap();
        Ok(bytes[offset..offset + len].to_vec())
    }

    pub(crate) fn write(&self, offset: usize, data: &[u8]) -> Result<(), DeviceError> {
        self.check_bounds(offset, data.len())?;
        let mut bytes = self.bytes.lock().unwrap();
        bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<(), DeviceError> {
        if offset + len > self.size {
            return Err(DeviceError::OutOfBounds {
                offset,
                len,
                size: self.size,
            });
        }
        Ok(())
    }
}
