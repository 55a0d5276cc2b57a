/// One end of a bidirectional message pipe between two peers.
pub struct DuplexChannel<T> {
    pub tx: crossbeam::channel::Sender<T>,
    pub rx: crossbeam::channel::Receiver<T>,
}

impl<T> DuplexChannel<T> {
    pub fn new_unbound_pair() -> (DuplexChannel<T>, DuplexChannel<T>) {
        let (a_tx, a_rx) = crossbeam::channel::unbounded();
        let (b_tx, b_rx) = crossbeam::channel::unbounded();
        (
            DuplexChannel { tx: a_tx, rx: b_rx },
            DuplexChannel { tx: b_tx, rx: a_rx },
        )
    }

    /// Endpoint whose sends are delivered to its own receive side, for a
    /// peer exchanging with itself.
    pub fn new_loopback() -> DuplexChannel<T> {
        let (tx, rx) = crossbeam::channel::unbounded();
        DuplexChannel { tx, rx }
    }
}
