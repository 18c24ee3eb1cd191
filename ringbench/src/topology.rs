//! Ring neighbor computation.

/// Position of one participant in the ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    /// Rank of this process.
    pub rank: usize,

    /// Number of processes in the ring.
    pub size: usize,

    /// Rank that this process sends to.
    pub next: usize,

    /// Rank that this process receives from.
    pub prev: usize,
}

impl Topology {
    /// Derive the successor and predecessor for `rank` in a ring of
    /// `size` processes. A ring of one is a self-loop.
    pub fn new(rank: usize, size: usize) -> Topology {
        assert!(size >= 1, "ring requires at least one process");
        assert!(rank < size, "rank {} out of range for size {}", rank, size);
        Topology {
            rank,
            size,
            next: (rank + 1) % size,
            prev: (rank + size - 1) % size,
        }
    }

    /// Whether this rank reports the aggregated statistics.
    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }
}
