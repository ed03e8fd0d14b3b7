/// How far a packetized file transfer has gotten. `n_done` is the packet
/// index to resume from after an interruption (spec §6.3) — it always
/// refers to fully-acknowledged packets, never one in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Progress {
    pub n_packets: u32,
    pub n_done: u32,
}

impl Progress {
    pub fn new(n_packets: u32, n_done: u32) -> Self {
        Self { n_packets, n_done }
    }

    pub fn is_complete(&self) -> bool {
        self.n_done >= self.n_packets
    }
}
