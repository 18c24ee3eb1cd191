//! Thread-backed process group for in-process rings.
//!
//! Every collective the benchmark needs is implemented over channels
//! and a shared barrier, so a full multi-rank run fits in one process.
//! This is the backend the integration tests drive; it also works for
//! single-host smoke runs without an MPI launcher.
use crate::group::{ProcessGroup, ReduceOp};
use crate::memory::TransferBuffer;
use crate::{Error, Result, Tag};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

enum Msg {
    /// Payload of one ring exchange.
    Data { tag: Tag, bytes: Vec<u8> },

    /// One process's contribution to a reduction.
    Value(f64),
}

/// One participant's handle into an in-process ring.
///
/// Channels are per source-destination pair, so messages from one rank
/// arrive in call order and collectives cannot interleave as long as
/// every rank issues them in the same order.
pub struct LocalRing {
    rank: usize,
    size: usize,
    barrier: Arc<Barrier>,
    /// `tx[d]` sends to rank `d`.
    tx: Vec<Sender<Msg>>,
    /// `rx[s]` receives from rank `s`.
    rx: Vec<Receiver<Msg>>,
}

impl LocalRing {
    /// Create the handles for a ring of `size` participants, one per
    /// thread. The handle at index `r` belongs to rank `r`.
    pub fn create(size: usize) -> Vec<LocalRing> {
        assert!(size >= 1);
        let barrier = Arc::new(Barrier::new(size));
        let mut senders: Vec<Vec<Sender<Msg>>> = (0..size).map(|_| vec![]).collect();
        let mut receivers: Vec<Vec<Receiver<Msg>>> = (0..size).map(|_| vec![]).collect();
        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = channel();
                senders[src].push(tx);
                receivers[dst].push(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (tx, rx))| LocalRing {
                rank,
                size,
                barrier: Arc::clone(&barrier),
                tx,
                rx,
            })
            .collect()
    }

    /// Create a one-process ring (degenerate self-loop).
    pub fn solo() -> LocalRing {
        LocalRing::create(1).pop().unwrap()
    }

    fn recv_from(&self, src: usize, op: &'static str) -> Result<Msg> {
        self.rx[src]
            .recv()
            .map_err(|err| Error::transport(op, err))
    }
}

fn fold(op: ReduceOp, acc: f64, value: f64) -> f64 {
    match op {
        ReduceOp::Min => acc.min(value),
        ReduceOp::Max => acc.max(value),
        ReduceOp::Sum => acc + value,
    }
}

impl ProcessGroup for LocalRing {
    fn size(&self) -> usize {
        self.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn barrier(&mut self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }

    fn exchange(
        &mut self,
        send: &dyn TransferBuffer,
        recv: &mut dyn TransferBuffer,
        to: usize,
        from: usize,
        tag: Tag,
    ) -> Result<()> {
        let payload = send
            .host_slice()
            .ok_or_else(|| Error::transport("exchange", "local backend requires host buffers"))?
            .to_vec();
        self.tx[to]
            .send(Msg::Data {
                tag,
                bytes: payload,
            })
            .map_err(|err| Error::transport("exchange", err))?;
        match self.recv_from(from, "exchange")? {
            Msg::Data { tag: got, bytes } if got == tag => {
                let dst = recv.host_slice_mut().ok_or_else(|| {
                    Error::transport("exchange", "local backend requires host buffers")
                })?;
                if bytes.len() != dst.len() {
                    return Err(Error::transport("exchange", "message length mismatch"));
                }
                dst.copy_from_slice(&bytes);
                Ok(())
            }
            Msg::Data { tag: got, .. } => Err(Error::transport(
                "exchange",
                format!("tag mismatch: expected {} got {}", tag, got),
            )),
            Msg::Value(_) => Err(Error::transport("exchange", "collective order violated")),
        }
    }

    fn reduce(&mut self, value: f64, op: ReduceOp, root: usize) -> Result<Option<f64>> {
        if self.rank != root {
            self.tx[root]
                .send(Msg::Value(value))
                .map_err(|err| Error::transport("reduce", err))?;
            return Ok(None);
        }
        let mut acc = value;
        for src in 0..self.size {
            if src == root {
                continue;
            }
            match self.recv_from(src, "reduce")? {
                Msg::Value(v) => acc = fold(op, acc, v),
                Msg::Data { .. } => {
                    return Err(Error::transport("reduce", "collective order violated"))
                }
            }
        }
        Ok(Some(acc))
    }

    fn abort(&mut self, code: i32) -> ! {
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{allocate, MemLocation};
    use crate::RING_TAG;
    use std::thread;

    #[test]
    fn self_exchange_round_trips() {
        let mut ring = LocalRing::solo();
        let mut send = allocate(8, MemLocation::Host).unwrap();
        let mut recv = allocate(8, MemLocation::Host).unwrap();
        send.host_slice_mut().unwrap().copy_from_slice(b"ringdata");
        ring.exchange(send.as_ref(), recv.as_mut(), 0, 0, RING_TAG)
            .unwrap();
        assert_eq!(recv.host_slice().unwrap(), b"ringdata");
    }

    #[test]
    fn ring_exchange_moves_data_from_predecessor() {
        let rings = LocalRing::create(3);
        let handles: Vec<_> = rings
            .into_iter()
            .map(|mut ring| {
                thread::spawn(move || {
                    let rank = ring.rank();
                    let size = ring.size();
                    let next = (rank + 1) % size;
                    let prev = (rank + size - 1) % size;
                    let mut send = allocate(16, MemLocation::Host).unwrap();
                    let mut recv = allocate(16, MemLocation::Host).unwrap();
                    send.host_slice_mut().unwrap().fill(rank as u8);
                    ring.exchange(send.as_ref(), recv.as_mut(), next, prev, RING_TAG)
                        .unwrap();
                    assert!(recv.host_slice().unwrap().iter().all(|&b| b == prev as u8));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn reduce_combines_every_contribution() {
        let rings = LocalRing::create(4);
        let handles: Vec<_> = rings
            .into_iter()
            .map(|mut ring| {
                thread::spawn(move || {
                    let value = ring.rank() as f64 + 1.0;
                    let min = ring.reduce(value, ReduceOp::Min, 0).unwrap();
                    let max = ring.reduce(value, ReduceOp::Max, 0).unwrap();
                    let sum = ring.reduce(value, ReduceOp::Sum, 0).unwrap();
                    if ring.rank() == 0 {
                        assert_eq!(min, Some(1.0));
                        assert_eq!(max, Some(4.0));
                        assert_eq!(sum, Some(10.0));
                    } else {
                        assert_eq!(min, None);
                        assert_eq!(max, None);
                        assert_eq!(sum, None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
