/// Capability snapshot describing whether the topology-specialized pivot
/// all-to-all is usable. Produced by an optimistic fabric probe at
/// communicator setup, then narrowed per call once the channel count is
/// known.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopoProfile {
    pub pivot_enabled: bool,
    /// bidirectional rings the pivot path would schedule over
    pub pivot_num_bi_rings: u32,
}

impl TopoProfile {
    /// Channel-count narrowing: the pivot path needs two channels per
    /// bidirectional ring. This can only disable the pivot path relative to
    /// the probe, never re-enable it.
    pub fn narrow(self, channel_count: u32) -> TopoProfile {
        TopoProfile {
            pivot_enabled: self.pivot_enabled && channel_count >= self.pivot_num_bi_rings * 2,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_disables_when_channels_are_short() {
        let topo = TopoProfile {
            pivot_enabled: true,
            pivot_num_bi_rings: 2,
        };
        assert!(!topo.narrow(3).pivot_enabled);
        assert!(topo.narrow(4).pivot_enabled);
        assert!(topo.narrow(5).pivot_enabled);
    }

    #[test]
    fn narrow_never_reenables() {
        let topo = TopoProfile {
            pivot_enabled: false,
            pivot_num_bi_rings: 1,
        };
        assert!(!topo.narrow(16).pivot_enabled);
    }
}
