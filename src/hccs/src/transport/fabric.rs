use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{RecvTimeoutError, TrySendError};
use dashmap::DashSet;

use crate::utils::duplex_chan::DuplexChannel;

use super::TransportError;

const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Point-to-point transport consumed by the transfer group primitive.
/// Sends are posted without waiting for the peer; receives block the
/// calling worker until the matching payload arrives.
pub trait Fabric: Send + Sync {
    fn num_ranks(&self) -> usize;

    fn send(&self, from: usize, to: usize, payload: Vec<u8>) -> Result<(), TransportError>;

    fn recv(&self, to: usize, from: usize) -> Result<Vec<u8>, TransportError>;
}

/// In-process fabric backing a simulated cluster: a fully connected mesh of
/// unbounded FIFO links, one per directed rank pair, including a loopback
/// link for each rank's exchange with itself.
pub struct SharedFabric {
    num_ranks: usize,
    // rank * num_ranks + peer -> this rank's endpoint towards peer
    endpoints: Vec<DuplexChannel<Vec<u8>>>,
    // directed (from, to) pairs with an injected fault
    down_links: DashSet<(usize, usize)>,
    transfers_posted: AtomicUsize,
    recv_timeout: Duration,
}

impl SharedFabric {
    pub fn new(num_ranks: usize) -> Arc<SharedFabric> {
        Self::with_recv_timeout(num_ranks, DEFAULT_RECV_TIMEOUT)
    }

    pub fn with_recv_timeout(num_ranks: usize, recv_timeout: Duration) -> Arc<SharedFabric> {
        let mut endpoints: Vec<Option<DuplexChannel<Vec<u8>>>> =
            (0..num_ranks * num_ranks).map(|_| None).collect();
        for a in 0..num_ranks {
            endpoints[a * num_ranks + a] = Some(DuplexChannel::new_loopback());
            for b in (a + 1)..num_ranks {
                let (ep_a, ep_b) = DuplexChannel::new_unbound_pair();
                endpoints[a * num_ranks + b] = Some(ep_a);
                endpoints[b * num_ranks + a] = Some(ep_b);
            }
        }
        let endpoints = endpoints
            .into_iter()
            .map(|ep| ep.expect("fully connected mesh"))
            .collect();
        Arc::new(SharedFabric {
            num_ranks,
            endpoints,
            down_links: DashSet::new(),
            transfers_posted: AtomicUsize::new(0),
            recv_timeout,
        })
    }

    /// Mark the directed link `from -> to` as failed. Posting a send on the
    /// link, and waiting on its receive side, both report the fault.
    pub fn inject_link_failure(&self, from: usize, to: usize) {
        self.down_links.insert((from, to));
    }

    /// Number of point-to-point payloads posted since creation.
    pub fn transfers_posted(&self) -> usize {
        self.transfers_posted.load(Ordering::Relaxed)
    }

    fn endpoint(&self, rank: usize, peer: usize) -> &DuplexChannel<Vec<u8>> {
        assert!(rank < self.num_ranks && peer < self.num_ranks);
        &self.endpoints[rank * self.num_ranks + peer]
    }
}

impl Fabric for SharedFabric {
    fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    fn send(&self, from: usize, to: usize, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.down_links.contains(&(from, to)) {
            return Err(TransportError::LinkDown { from, to });
        }
        match self.endpoint(from, to).tx.try_send(payload) {
            Ok(()) => {
                self.transfers_posted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            // links are unbounded, so only disconnection can fail the post
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                Err(TransportError::Disconnected { peer: to })
            }
        }
    }

    fn recv(&self, to: usize, from: usize) -> Result<Vec<u8>, TransportError> {
        if self.down_links.contains(&(from, to)) {
            return Err(TransportError::LinkDown { from, to });
        }
        match self.endpoint(to, from).rx.recv_timeout(self.recv_timeout) {
            Ok(payload) => Ok(payload),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout { from }),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected { peer: from }),
        }
    }
}
