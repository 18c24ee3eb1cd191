//! The ring exchange measurement loop.
use crate::group::ProcessGroup;
use crate::memory::{self, MemLocation, TransferBuffer};
use crate::stats::{self, RoundStats, Sample};
use crate::topology::Topology;
use crate::{report, Result, RING_TAG};
use log::{debug, info};
use std::io::Write;
use std::time::{Duration, Instant};

/// Rank that receives the reduced statistics and reports them.
pub const COORDINATOR: usize = 0;

/// Configuration for one benchmark run.
#[derive(Clone, Debug)]
pub struct BenchOptions {
    /// Bytes per message, one direction.
    pub msg_size: usize,

    /// Seconds to sleep before each round; values <= 0 skip the sleep.
    pub interval_sec: f64,

    /// Where the transfer buffers live.
    pub location: MemLocation,

    /// Number of rounds to run, or `None` to run until the process is
    /// externally terminated.
    pub rounds: Option<u64>,
}

impl Default for BenchOptions {
    fn default() -> BenchOptions {
        BenchOptions {
            msg_size: 1024 * 1024,
            interval_sec: 1.0,
            location: MemLocation::Host,
            rounds: None,
        }
    }
}

/// The exchange engine: owns the two transfer buffers for the process
/// lifetime and drives the measure/aggregate/report cycle.
pub struct RingBenchmark<'a, G: ProcessGroup> {
    group: &'a mut G,
    topo: Topology,
    send: Box<dyn TransferBuffer>,
    recv: Box<dyn TransferBuffer>,
    opts: BenchOptions,
}

impl<'a, G: ProcessGroup> RingBenchmark<'a, G> {
    /// Derive the topology and allocate the zero-filled buffer pair.
    /// Buffers are released when the benchmark is dropped, on every
    /// exit path.
    pub fn new(group: &'a mut G, opts: BenchOptions) -> Result<RingBenchmark<'a, G>> {
        let topo = Topology::new(group.rank(), group.size());
        let (send, recv) = memory::allocate_pair(opts.msg_size, opts.location)?;
        info!(
            "rank {} of {}: next = {}, prev = {}",
            topo.rank, topo.size, topo.next, topo.prev
        );
        Ok(RingBenchmark {
            group,
            topo,
            send,
            recv,
            opts,
        })
    }

    /// Run one measurement round: throttle, barrier, timed exchange,
    /// aggregation. Returns the group statistics at the coordinator and
    /// `None` everywhere else.
    pub fn round(&mut self) -> Result<Option<RoundStats>> {
        if self.opts.interval_sec > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(self.opts.interval_sec));
        }

        // The barrier bounds clock skew across ranks for the timed
        // region below.
        self.group.barrier()?;

        let start = Instant::now();
        self.group.exchange(
            self.send.as_ref(),
            self.recv.as_mut(),
            self.topo.next,
            self.topo.prev,
            RING_TAG,
        )?;
        let seconds = start.elapsed().as_secs_f64();

        let sample = Sample::from_exchange(self.opts.msg_size, seconds);
        debug!(
            "rank {}: {:.6} s, {:.3} GB/s",
            self.topo.rank, sample.seconds, sample.gbps
        );
        stats::aggregate(self.group, sample, COORDINATOR)
    }

    /// Drive rounds until the configured cap, writing the banner and
    /// one statistics line per round to `out` at the coordinator.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.topo.is_coordinator() {
            writeln!(out, "{}", report::banner(&self.opts))?;
        }
        let mut round = 0u64;
        while self.opts.rounds.map_or(true, |cap| round < cap) {
            if let Some(round_stats) = self.round()? {
                writeln!(out, "{}", report::round_line(&round_stats))?;
            }
            round += 1;
        }
        Ok(())
    }
}
