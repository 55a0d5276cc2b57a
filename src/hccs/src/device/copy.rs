use super::ptr::DevicePtr;
use super::stream::Stream;
use super::DeviceError;

/// Block-strided transpose between two allocations of the same device,
/// enqueued on `stream`. The source is read as a `width x height` grid of
/// `block_bytes` blocks and written out as the `height x width` transpose:
/// the block at source offset `(i * height + o) * block_bytes` lands at
/// destination offset `(o * width + i) * block_bytes`.
pub fn stride_memcpy_2d(
    dst: &DevicePtr,
    src: &DevicePtr,
    block_bytes: usize,
    height: usize,
    width: usize,
    stream: &Stream,
) -> Result<(), DeviceError> {
    let dst = dst.clone();
    let src = src.clone();
    stream.enqueue(move || {
        let extent = block_bytes * height * width;
        let data = src.read_bytes(extent)?;
        let mut out = vec![0u8; extent];
        for o in 0..height {
            for i in 0..width {
                let s = (i * height + o) * block_bytes;
                let d = (o * width + i) * block_bytes;
                out[d..d + block_bytes].copy_from_slice(&data[s..s + block_bytes]);
            }
        }
        dst.write_bytes(&out)?;
        Ok(())
    })
}

/// Flat same-device copy, enqueued on `stream`.
pub fn memcpy_async(
    dst: &DevicePtr,
    src: &DevicePtr,
    bytes: usize,
    stream: &Stream,
) -> Result<(), DeviceError> {
    let dst = dst.clone();
    let src = src.clone();
    stream.enqueue(move || {
        let data = src.read_bytes(bytes)?;
        dst.write_bytes(&data)?;
        Ok(())
    })
}
