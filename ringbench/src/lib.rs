//! Ring bandwidth benchmark library code.
use thiserror::Error;

pub mod topology;
pub use topology::Topology;
pub mod memory;
pub use memory::{MemLocation, TransferBuffer, allocate_pair};
pub mod group;
pub use group::{ProcessGroup, ReduceOp};
pub mod stats;
pub use stats::{RoundStats, Sample, Summary};
pub mod report;
pub mod bench;
pub use bench::{BenchOptions, RingBenchmark};
pub mod local;

/// Message tag used for every ring exchange.
pub type Tag = i32;

/// Tag value for the benchmark transfers.
pub const RING_TAG: Tag = 0;

#[derive(Debug, Error)]
pub enum Error {
    /// Device buffers requested but the binary was built without the
    /// `cuda` feature.
    #[error("device memory requested but accelerator support is not compiled in")]
    DeviceUnsupported,

    /// Buffer allocation failed.
    #[error("buffer allocation of {0} bytes failed: {1}")]
    Alloc(usize, String),

    /// A barrier, exchange, or reduction primitive failed.
    #[error("{op} failed: {reason}")]
    Transport { op: &'static str, reason: String },

    /// Writing a report line failed.
    #[error("report output failed: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for transport failures reported by a process group backend.
    pub fn transport(op: &'static str, reason: impl ToString) -> Self {
        Self::Transport {
            op,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
