//! Global reduction: combine per-partition counts into one total per round.
//!
//! Rendered as an allreduce over channels: every worker contributes one value
//! and blocks until the coordinator broadcasts the combined total back. The
//! broadcast doubles as the lockstep barrier: no worker can enter iteration
//! `k + 1` before every worker has finished iteration `k`, because the total
//! for `k` is only sent once all contributions for `k` arrived.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::error::SimError;

/// Combines counts into a total. Commutative and associative, so the result
/// is independent of partition count and reduction order.
pub fn reduce_sum<I>(values: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    values.into_iter().sum()
}

/// Worker-side endpoint of the allreduce.
pub struct ReduceHandle {
    rank: usize,
    to_hub: Sender<u64>,
    from_hub: Receiver<u64>,
    timeout: Duration,
}

impl ReduceHandle {
    /// Contributes `local` to the current round and blocks until the global
    /// total comes back.
    pub fn allreduce(&self, local: u64) -> Result<u64, SimError> {
        self.to_hub
            .send(local)
            .map_err(|_| SimError::comm(self.rank, "reduction hub hung up"))?;
        self.from_hub.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => SimError::comm(
                self.rank,
                format!("reduction round timed out after {:?}", self.timeout),
            ),
            RecvTimeoutError::Disconnected => {
                SimError::comm(self.rank, "reduction hub hung up mid-round")
            }
        })
    }
}

/// Coordinator-side endpoint: collects one value per worker, broadcasts the
/// sum.
pub struct ReduceCoordinator {
    parties: usize,
    from_workers: Receiver<u64>,
    to_workers: Vec<Sender<u64>>,
    timeout: Duration,
}

impl ReduceCoordinator {
    /// Runs one reduction round and returns the global total.
    pub fn round(&self) -> Result<u64, SimError> {
        let mut total = 0u64;
        for _ in 0..self.parties {
            let value = self.from_workers.recv_timeout(self.timeout).map_err(|e| {
                match e {
                    RecvTimeoutError::Timeout => SimError::comm(
                        0,
                        format!("a worker missed the reduction round ({:?})", self.timeout),
                    ),
                    RecvTimeoutError::Disconnected => {
                        SimError::comm(0, "a worker hung up before contributing")
                    }
                }
            })?;
            total = reduce_sum([total, value]);
        }
        for tx in &self.to_workers {
            tx.send(total)
                .map_err(|_| SimError::comm(0, "a worker hung up before the broadcast"))?;
        }
        Ok(total)
    }
}

/// Builds the reduction plumbing for `parties` workers.
pub fn reduce_channels(
    parties: usize,
    timeout: Duration,
) -> (ReduceCoordinator, Vec<ReduceHandle>) {
    assert!(parties > 0);
    let (to_hub, from_workers) = unbounded();
    let mut to_workers = Vec::with_capacity(parties);
    let mut handles = Vec::with_capacity(parties);
    for rank in 0..parties {
        let (tx, rx) = unbounded();
        to_workers.push(tx);
        handles.push(ReduceHandle {
            rank,
            to_hub: to_hub.clone(),
            from_hub: rx,
            timeout,
        });
    }
    (
        ReduceCoordinator {
            parties,
            from_workers,
            to_workers,
            timeout,
        },
        handles,
    )
}
