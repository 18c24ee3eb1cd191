//! MPI-backed ring bandwidth benchmark.
use clap::Parser;
use log::error;
use mpi::collective::SystemOperation;
use mpi::point_to_point as p2p;
use mpi::topology::SystemCommunicator;
use mpi::traits::*;
use ringbench::bench::{BenchOptions, RingBenchmark};
use ringbench::group::{ProcessGroup, ReduceOp};
use ringbench::memory::{MemLocation, TransferBuffer};
use ringbench::{Result, Tag};
use serde::Deserialize;
use std::io;

const DEFAULT_MSG_SIZE: f64 = (1024 * 1024) as f64;
const DEFAULT_INTERVAL_SEC: f64 = 1.0;

/// Ring benchmark args.
#[derive(Parser)]
struct RingArgs {
    /// Message size in bytes; accepts a real number, truncated to an
    /// integer byte count.
    #[arg(long)]
    msg_size: Option<f64>,

    /// Allocate the transfer buffers in device memory.
    #[arg(long)]
    gpu: bool,

    /// Number of rounds to run (default: until externally terminated).
    #[arg(long)]
    rounds: Option<u64>,

    /// Path for benchmark options file.
    #[arg(short, long)]
    options_path: Option<String>,
}

/// Options loadable from a YAML file; explicit flags take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileOptions {
    msg_size: Option<f64>,
    interval_sec: Option<f64>,
    rounds: Option<u64>,
}

/// Load benchmark options from a file path.
fn load_options(path: &str) -> FileOptions {
    let fp = std::fs::File::open(path).expect("failed to load option file");
    serde_yaml::from_reader(fp).expect("failed to deserialize option file")
}

fn resolve_options(args: &RingArgs) -> BenchOptions {
    let file = args
        .options_path
        .as_deref()
        .map(load_options)
        .unwrap_or_default();
    BenchOptions {
        msg_size: args.msg_size.or(file.msg_size).unwrap_or(DEFAULT_MSG_SIZE) as usize,
        interval_sec: file.interval_sec.unwrap_or(DEFAULT_INTERVAL_SEC),
        location: if args.gpu {
            MemLocation::Device
        } else {
            MemLocation::Host
        },
        rounds: args.rounds.or(file.rounds),
    }
}

/// Process group backed by rsmpi over `MPI_COMM_WORLD`.
struct MpiGroup {
    world: SystemCommunicator,
}

impl ProcessGroup for MpiGroup {
    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn barrier(&mut self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }

    fn exchange(
        &mut self,
        send: &dyn TransferBuffer,
        recv: &mut dyn TransferBuffer,
        to: usize,
        from: usize,
        _tag: Tag,
    ) -> Result<()> {
        // rsmpi issues MPI_Sendrecv with its default tag, which matches
        // RING_TAG. The pointers go to MPI verbatim; device buffers
        // require a CUDA-aware MPI.
        let sbuf = unsafe { std::slice::from_raw_parts(send.as_ptr(), send.len()) };
        let rbuf = unsafe { std::slice::from_raw_parts_mut(recv.as_mut_ptr(), recv.len()) };
        p2p::send_receive_into(
            sbuf,
            &self.world.process_at_rank(to as i32),
            rbuf,
            &self.world.process_at_rank(from as i32),
        );
        Ok(())
    }

    fn reduce(&mut self, value: f64, op: ReduceOp, root: usize) -> Result<Option<f64>> {
        let op = match op {
            ReduceOp::Min => SystemOperation::min(),
            ReduceOp::Max => SystemOperation::max(),
            ReduceOp::Sum => SystemOperation::sum(),
        };
        let root_proc = self.world.process_at_rank(root as i32);
        if self.rank() == root {
            let mut result = 0.0f64;
            root_proc.reduce_into_root(&value, &mut result, op);
            Ok(Some(result))
        } else {
            root_proc.reduce_into(&value, op);
            Ok(None)
        }
    }

    fn abort(&mut self, code: i32) -> ! {
        self.world.abort(code)
    }
}

/// Single fatal-error funnel: every failure below propagates here so
/// the whole group can be aborted from one place.
fn run(group: &mut MpiGroup, opts: BenchOptions) -> Result<()> {
    let mut bench = RingBenchmark::new(group, opts)?;
    bench.run(&mut io::stdout())
}

fn main() {
    env_logger::init();
    let args = RingArgs::parse();
    let opts = resolve_options(&args);

    let universe = mpi::initialize().expect("failed to initialize rsmpi");
    let mut group = MpiGroup {
        world: universe.world(),
    };

    if let Err(err) = run(&mut group, opts) {
        error!("fatal: {}", err);
        eprintln!("ringbench: {}", err);
        group.abort(1);
    }
}
