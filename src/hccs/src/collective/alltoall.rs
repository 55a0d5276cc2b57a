use crate::comm::topology::TopoProfile;
use crate::comm::Communicator;
use crate::device::copy::{memcpy_async, stride_memcpy_2d};
use crate::device::ptr::DevicePtr;
use crate::device::stream::Stream;
use crate::transport::group::TransferGroup;
use crate::transport::{ALLTOALL_PIVOT_CHUNK_STEPS, ALLTOALL_PIVOT_SLICE_STEPS};

use super::task::{CollTask, TaskDataType};
use super::CollectiveError;

/// Alternate, ring-specialized all-to-all implementation, external to this
/// engine and invoked opaquely when the topology supports it.
pub trait PivotPath: Send + Sync {
    fn execute(
        &self,
        task: &CollTask,
        comm: &Communicator,
        stream: &Stream,
    ) -> Result<(), CollectiveError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgoPath {
    Pivot,
    Hierarchical,
}

/// Pure per-call choice between the two execution paths, made on an
/// already-narrowed capability snapshot.
pub fn select_algo(topo: &TopoProfile) -> AlgoPath {
    if topo.pivot_enabled {
        AlgoPath::Pivot
    } else {
        AlgoPath::Hierarchical
    }
}

/// Personalized all-to-all: every rank sends a distinct `count`-element
/// block to every other rank and receives one from each. All work is
/// enqueued on `stream`; the caller observes completion by synchronizing
/// the stream. On the hierarchical path the caller's send buffer is used as
/// scratch and holds undefined contents afterwards.
pub fn all_to_all(
    sendbuff: &DevicePtr,
    recvbuff: &DevicePtr,
    count: usize,
    data_type: TaskDataType,
    comm: &Communicator,
    stream: &Stream,
) -> Result<(), CollectiveError> {
    // Determine pivot support now that the number of channels is known
    let topo = comm.topo.narrow(comm.channel_count);
    match select_algo(&topo) {
        AlgoPath::Pivot => {
            let task = CollTask {
                send_buf: sendbuff.clone(),
                recv_buf: recvbuff.clone(),
                count,
                data_type,
                chunk_steps: ALLTOALL_PIVOT_CHUNK_STEPS,
                slice_steps: ALLTOALL_PIVOT_SLICE_STEPS,
            };
            let pivot = comm
                .pivot_path
                .as_ref()
                .expect("pivot path enabled without a handler");
            pivot.execute(&task, comm, stream)
        }
        AlgoPath::Hierarchical => {
            let task = CollTask {
                send_buf: sendbuff.clone(),
                recv_buf: recvbuff.clone(),
                count,
                data_type,
                chunk_steps: 1,
                slice_steps: 1,
            };
            hierarchical_all_to_all(&task, comm, stream)
        }
    }
}

/// 2D hierarchical all-to-all: decompose the dense permutation into an
/// intra-node exchange and an inter-node exchange connected by local stride
/// copies, turning `num_ranks` point-to-point pairs into
/// `local_ranks + num_nodes`.
fn hierarchical_all_to_all(
    task: &CollTask,
    comm: &Communicator,
    stream: &Stream,
) -> Result<(), CollectiveError> {
    let num_ranks = comm.rank_count();
    let rank_offset = task.rank_offset_bytes();
    if task.count == 0 {
        return Ok(());
    }
    let num_devices = comm.local_ranks;
    let num_nodes = comm.num_nodes;
    if num_devices == 1 || num_nodes == 1 {
        log::warn!(
            "number of local devices ({}) or number of nodes ({}) is 1",
            num_devices,
            num_nodes
        );
        return Err(CollectiveError::InvalidUsage {
            num_nodes,
            local_ranks: num_devices,
        });
    }
    log::trace!(
        "rank {}: hierarchical all-to-all over {} nodes x {} devices, {} bytes per rank-block",
        comm.rank,
        num_nodes,
        num_devices,
        rank_offset
    );
    let sendbuff = &task.send_buf;
    let recvbuff = &task.recv_buf;

    // phase 0. per-device (num_devices) stride copy: group, for each local
    // device index, the blocks bound for that device slot on all nodes
    stride_memcpy_2d(recvbuff, sendbuff, rank_offset, num_devices, num_nodes, stream)?;

    // phase 1. intra-node all-to-all
    let mut group = TransferGroup::new(comm);
    for g in 0..num_devices {
        let peer = g + comm.node * num_devices;
        group.post_send(
            &recvbuff.byte_add(g * num_nodes * rank_offset),
            num_nodes * task.count,
            task.data_type,
            peer,
            task.chunk_steps,
            task.slice_steps,
        );
        group.post_recv(
            &sendbuff.byte_add(g * num_nodes * rank_offset),
            num_nodes * task.count,
            task.data_type,
            peer,
            task.chunk_steps,
            task.slice_steps,
        );
    }
    group.commit(stream)?;

    // phase 2. per-device (num_nodes) stride copy
    stride_memcpy_2d(recvbuff, sendbuff, rank_offset, num_nodes, num_devices, stream)?;

    // phase 3. inter-node all-to-all
    let mut group = TransferGroup::new(comm);
    for n in 0..num_nodes {
        let peer = n * num_devices + comm.local_device_idx;
        group.post_send(
            &recvbuff.byte_add(n * num_devices * rank_offset),
            num_devices * task.count,
            task.data_type,
            peer,
            task.chunk_steps,
            task.slice_steps,
        );
        group.post_recv(
            &sendbuff.byte_add(n * num_devices * rank_offset),
            num_devices * task.count,
            task.data_type,
            peer,
            task.chunk_steps,
            task.slice_steps,
        );
    }
    group.commit(stream)?;

    memcpy_async(recvbuff, sendbuff, num_ranks * rank_offset, stream)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowed_profile_picks_the_path() {
        let probe = TopoProfile {
            pivot_enabled: true,
            pivot_num_bi_rings: 2,
        };
        assert_eq!(select_algo(&probe.narrow(4)), AlgoPath::Pivot);
        assert_eq!(select_algo(&probe.narrow(3)), AlgoPath::Hierarchical);
        assert_eq!(
            select_algo(&TopoProfile::default().narrow(64)),
            AlgoPath::Hierarchical
        );
    }
}
