use std::sync::Arc;

use crate::collective::task::TaskDataType;
use crate::comm::Communicator;
use crate::device::ptr::DevicePtr;
use crate::device::stream::Stream;
use crate::device::DeviceError;

use super::fabric::Fabric;
use super::op::{ConnType, TransferOp};
use super::TransportError;

/// Atomic batch of paired send/receive operations. Descriptors accumulate
/// host-side until `commit`, which hands the whole batch to the transport as
/// one scheduling unit: every send is posted before any receive is awaited,
/// so mutually dependent exchanges across ranks cannot deadlock. The first
/// descriptor failure aborts the entire group.
///
/// Every posted descriptor must have a matching one at its peer in the same
/// logical phase; the caller upholds this by issuing the identical phase
/// structure on every rank.
pub struct TransferGroup {
    rank: usize,
    fabric: Arc<dyn Fabric>,
    ops: Vec<TransferOp>,
}

impl TransferGroup {
    pub fn new(comm: &Communicator) -> TransferGroup {
        TransferGroup {
            rank: comm.rank,
            fabric: Arc::clone(&comm.fabric),
            ops: Vec::new(),
        }
    }

    pub fn post_send(
        &mut self,
        buf: &DevicePtr,
        count: usize,
        data_type: TaskDataType,
        peer: usize,
        chunk_steps: u32,
        slice_steps: u32,
    ) {
        self.ops.push(TransferOp {
            conn_type: ConnType::Send,
            buf: buf.clone(),
            count,
            data_type,
            peer,
            chunk_steps,
            slice_steps,
        });
    }

    pub fn post_recv(
        &mut self,
        buf: &DevicePtr,
        count: usize,
        data_type: TaskDataType,
        peer: usize,
        chunk_steps: u32,
        slice_steps: u32,
    ) {
        self.ops.push(TransferOp {
            conn_type: ConnType::Recv,
            buf: buf.clone(),
            count,
            data_type,
            peer,
            chunk_steps,
            slice_steps,
        });
    }

    /// Enqueue the whole batch on `stream` as one unit.
    pub fn commit(self, stream: &Stream) -> Result<(), DeviceError> {
        let TransferGroup { rank, fabric, ops } = self;
        stream.enqueue(move || {
            for op in ops.iter().filter(|op| op.conn_type == ConnType::Send) {
                let payload = op.buf.read_bytes(op.num_bytes())?;
                fabric.send(rank, op.peer, payload)?;
            }
            for op in ops.iter().filter(|op| op.conn_type == ConnType::Recv) {
                let payload = fabric.recv(rank, op.peer)?;
                if payload.len() != op.num_bytes() {
                    return Err(TransportError::SizeMismatch {
                        expected: op.num_bytes(),
                        actual: payload.len(),
                    }
                    .into());
                }
                op.buf.write_bytes(&payload)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::comm::CommunicatorId;
    use crate::device::alloc::DeviceMemory;
    use crate::device::stream::StreamTaskError;
    use crate::transport::fabric::SharedFabric;

    use super::*;

    fn pair() -> (Vec<Communicator>, Arc<SharedFabric>) {
        let fabric = SharedFabric::new(2);
        let comms = (0..2)
            .map(|rank| {
                let f: Arc<dyn Fabric> = fabric.clone();
                Communicator::new(CommunicatorId(7), rank, 2, 1, 1, f)
            })
            .collect();
        (comms, fabric)
    }

    fn buf(len: usize) -> DevicePtr {
        DevicePtr::new(&DeviceMemory::alloc(len))
    }

    #[test]
    fn matched_groups_exchange_payloads() {
        let (comms, _fabric) = pair();
        let streams = [Stream::new(), Stream::new()];
        let bufs: Vec<(DevicePtr, DevicePtr)> = (0..2).map(|_| (buf(4), buf(4))).collect();

        for (rank, comm) in comms.iter().enumerate() {
            bufs[rank].0.write_bytes(&[rank as u8; 4]).unwrap();
            let peer = 1 - rank;
            let mut group = TransferGroup::new(comm);
            group.post_send(&bufs[rank].0, 4, TaskDataType::Uint8, peer, 1, 1);
            group.post_recv(&bufs[rank].1, 4, TaskDataType::Uint8, peer, 1, 1);
            group.commit(&streams[rank]).unwrap();
        }
        for stream in &streams {
            stream.synchronize().unwrap();
        }

        assert_eq!(bufs[0].1.read_bytes(4).unwrap(), vec![1u8; 4]);
        assert_eq!(bufs[1].1.read_bytes(4).unwrap(), vec![0u8; 4]);
    }

    #[test]
    fn one_failed_descriptor_aborts_the_group() {
        let (comms, fabric) = pair();
        fabric.inject_link_failure(0, 1);
        let streams = [Stream::new(), Stream::new()];
        let bufs: Vec<(DevicePtr, DevicePtr)> = (0..2).map(|_| (buf(4), buf(4))).collect();

        for (rank, comm) in comms.iter().enumerate() {
            let peer = 1 - rank;
            let mut group = TransferGroup::new(comm);
            group.post_send(&bufs[rank].0, 4, TaskDataType::Uint8, peer, 1, 1);
            group.post_recv(&bufs[rank].1, 4, TaskDataType::Uint8, peer, 1, 1);
            group.commit(&streams[rank]).unwrap();
        }

        // rank 0 fails posting the send, rank 1 fails awaiting the receive;
        // neither group reports any descriptor as individually done
        for stream in &streams {
            let err = stream.synchronize().unwrap_err();
            assert!(matches!(
                err,
                StreamTaskError::Transport(TransportError::LinkDown { from: 0, to: 1 })
            ));
        }
    }
}
