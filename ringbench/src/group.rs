//! Code abstracting out the process group collaborator.
use crate::memory::TransferBuffer;
use crate::{Result, Tag};

/// Reduction operator for the statistics aggregation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Min,
    Max,
    Sum,
}

/// Trait implementing the collective primitives the benchmark needs on
/// top of some lower-level library.
///
/// All calls are blocking. Any failure is whole-group-fatal: callers
/// propagate the error to a single site that invokes [`abort`].
///
/// [`abort`]: ProcessGroup::abort
pub trait ProcessGroup {
    /// Return the number of processes in the group.
    fn size(&self) -> usize;

    /// Return the rank of this process.
    fn rank(&self) -> usize;

    /// Block until every process in the group has arrived.
    fn barrier(&mut self) -> Result<()>;

    /// Send the full contents of `send` to `to` and simultaneously
    /// receive `recv.len()` bytes from `from`, returning once both the
    /// local send and the local receive have completed.
    fn exchange(
        &mut self,
        send: &dyn TransferBuffer,
        recv: &mut dyn TransferBuffer,
        to: usize,
        from: usize,
        tag: Tag,
    ) -> Result<()>;

    /// Combine one value per process with `op`. Returns `Some` at
    /// `root` and `None` everywhere else.
    fn reduce(&mut self, value: f64, op: ReduceOp, root: usize) -> Result<Option<f64>>;

    /// Terminate the entire group with the given exit code.
    fn abort(&mut self, code: i32) -> !;
}
