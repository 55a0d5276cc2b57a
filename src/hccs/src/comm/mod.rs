pub mod topology;

use std::sync::Arc;

use crate::collective::alltoall::PivotPath;
use crate::transport::fabric::Fabric;

use self::topology::TopoProfile;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommunicatorId(pub u32);

/// One participant of the collective, bound to a single device. Ranks are
/// numbered node-major: `rank = node * local_ranks + local_device_idx`, with
/// a uniform device count per node.
pub struct Communicator {
    pub id: CommunicatorId,
    pub rank: usize,
    pub num_ranks: usize,
    pub num_nodes: usize,
    pub local_ranks: usize,
    pub node: usize,
    pub local_device_idx: usize,
    // known only once the transport channels for this call are set up
    pub channel_count: u32,
    pub topo: TopoProfile,
    pub pivot_path: Option<Arc<dyn PivotPath>>,
    pub fabric: Arc<dyn Fabric>,
}

impl Communicator {
    pub fn new(
        id: CommunicatorId,
        rank: usize,
        num_nodes: usize,
        local_ranks: usize,
        channel_count: u32,
        fabric: Arc<dyn Fabric>,
    ) -> Communicator {
        let num_ranks = num_nodes * local_ranks;
        assert!(
            rank < num_ranks,
            "rank {} out of range for {} ranks",
            rank,
            num_ranks
        );
        assert_eq!(
            fabric.num_ranks(),
            num_ranks,
            "fabric spans {} ranks, communicator needs {}",
            fabric.num_ranks(),
            num_ranks
        );
        Communicator {
            id,
            rank,
            num_ranks,
            num_nodes,
            local_ranks,
            node: rank / local_ranks,
            local_device_idx: rank % local_ranks,
            channel_count,
            topo: TopoProfile::default(),
            pivot_path: None,
            fabric,
        }
    }

    /// Install the topology-specialized alternate execution path. The
    /// capability flags stay optimistic until the per-call channel-count
    /// narrowing runs.
    pub fn with_pivot_path(mut self, path: Arc<dyn PivotPath>, num_bi_rings: u32) -> Communicator {
        self.topo = TopoProfile {
            pivot_enabled: true,
            pivot_num_bi_rings: num_bi_rings,
        };
        self.pivot_path = Some(path);
        self
    }

    /// Total participant count across the collective.
    #[inline]
    pub fn rank_count(&self) -> usize {
        self.num_ranks
    }
}

#[cfg(test)]
mod tests {
    use crate::transport::fabric::SharedFabric;

    use super::*;

    #[test]
    fn derives_grid_position_from_rank() {
        let fabric = SharedFabric::new(6);
        for (rank, node, dev) in [(0, 0, 0), (2, 0, 2), (3, 1, 0), (5, 1, 2)] {
            let f: Arc<dyn Fabric> = fabric.clone();
            let comm = Communicator::new(CommunicatorId(0), rank, 2, 3, 1, f);
            assert_eq!((comm.node, comm.local_device_idx), (node, dev));
            assert_eq!(comm.rank_count(), 6);
            assert!(!comm.topo.pivot_enabled);
        }
    }
}
