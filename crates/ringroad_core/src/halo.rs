//! Halo exchange over a channel ring.
//!
//! Each rank holds four endpoints: a sender toward each ring neighbor and a
//! receiver from each. An exchange sends the rank's own boundary cells on
//! both senders, then blocks on both receivers to fill its ghost slots.
//! Sends go over unbounded channels and never block, so the classic ring
//! deadlock (everyone sending before anyone receives) cannot occur by
//! construction. Receives are bounded by a timeout; a lapsed timeout or a
//! disconnected peer aborts the whole run.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::trace;

use crate::error::SimError;
use crate::partition::PartitionState;
use crate::rule::Cell;

pub struct HaloLinks {
    rank: usize,
    /// Carries our first real cell to the left neighbor's right ghost.
    send_left: Sender<Cell>,
    /// Carries our last real cell to the right neighbor's left ghost.
    send_right: Sender<Cell>,
    /// Delivers the left neighbor's last real cell (our left ghost).
    recv_left: Receiver<Cell>,
    /// Delivers the right neighbor's first real cell (our right ghost).
    recv_right: Receiver<Cell>,
    timeout: Duration,
}

impl HaloLinks {
    /// Builds the channel ring for `parties` ranks. Rank `r`'s right
    /// neighbor is `(r + 1) % parties`; the last rank wraps to the first,
    /// which is what makes the partitioned automaton periodic. With a single
    /// party both channels loop back to the same rank and the exchange
    /// degenerates to the periodic self-wrap.
    pub fn ring(parties: usize, timeout: Duration) -> Vec<HaloLinks> {
        assert!(parties > 0);
        // rightward[r]: r -> (r+1) % parties, carries r's last real cell.
        // leftward[r]:  r -> (r+parties-1) % parties, carries r's first.
        let rightward: Vec<_> = (0..parties).map(|_| unbounded::<Cell>()).collect();
        let leftward: Vec<_> = (0..parties).map(|_| unbounded::<Cell>()).collect();

        let mut links = Vec::with_capacity(parties);
        for rank in 0..parties {
            let left = (rank + parties - 1) % parties;
            links.push(HaloLinks {
                rank,
                send_left: leftward[rank].0.clone(),
                send_right: rightward[rank].0.clone(),
                recv_left: rightward[left].1.clone(),
                recv_right: leftward[(rank + 1) % parties].1.clone(),
                timeout,
            });
        }
        links
    }

    /// Refreshes both ghost slots from the ring neighbors.
    ///
    /// Both sends complete before either receive starts, and the method
    /// returns only once both ghosts arrived, so after every rank's exchange
    /// returns, every ghost on the ring mirrors its neighbor's boundary cell
    /// for the same step.
    pub fn exchange(&self, part: &mut PartitionState) -> Result<(), SimError> {
        self.send_left
            .send(part.first())
            .map_err(|_| SimError::comm(self.rank, "left neighbor hung up before send"))?;
        self.send_right
            .send(part.last())
            .map_err(|_| SimError::comm(self.rank, "right neighbor hung up before send"))?;

        let left = self.recv(&self.recv_left, "left")?;
        let right = self.recv(&self.recv_right, "right")?;
        part.set_ghosts(left, right);
        trace!(rank = self.rank, left, right, "ghosts refreshed");
        Ok(())
    }

    fn recv(&self, rx: &Receiver<Cell>, side: &str) -> Result<Cell, SimError> {
        rx.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => SimError::comm(
                self.rank,
                format!("timed out waiting for {side} ghost after {:?}", self.timeout),
            ),
            RecvTimeoutError::Disconnected => {
                SimError::comm(self.rank, format!("{side} neighbor hung up"))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::PartitionState;

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    #[test]
    fn single_party_self_wrap() {
        let links = HaloLinks::ring(1, timeout());
        let mut part = PartitionState::new(4, vec![1, 0, 0, 1]).unwrap();
        links[0].exchange(&mut part).unwrap();
        // Periodic boundary: left ghost mirrors the last cell, right ghost
        // the first.
        assert_eq!(part.left_ghost(), 1);
        assert_eq!(part.right_ghost(), 1);
    }

    /// Runs one exchange per rank concurrently and returns the partitions.
    fn exchange_all(links: Vec<HaloLinks>, mut parts: Vec<PartitionState>) -> Vec<PartitionState> {
        std::thread::scope(|s| {
            let handles: Vec<_> = links
                .iter()
                .zip(parts.iter_mut())
                .map(|(link, part)| s.spawn(move || link.exchange(part)))
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });
        parts
    }

    #[test]
    fn two_party_ring_crosses_boundaries() {
        let links = HaloLinks::ring(2, timeout());
        let parts = vec![
            PartitionState::new(2, vec![1, 0]).unwrap(),
            PartitionState::new(2, vec![0, 1]).unwrap(),
        ];
        let parts = exchange_all(links, parts);

        // Rank 0's neighbors are both rank 1 on a 2-ring.
        assert_eq!(parts[0].left_ghost(), parts[1].last());
        assert_eq!(parts[0].right_ghost(), parts[1].first());
        assert_eq!(parts[1].left_ghost(), parts[0].last());
        assert_eq!(parts[1].right_ghost(), parts[0].first());
    }

    #[test]
    fn ghosts_match_neighbors_on_larger_ring() {
        let parties = 4;
        let links = HaloLinks::ring(parties, timeout());
        let parts: Vec<_> = (0..parties)
            .map(|r| PartitionState::new(2, vec![r as u8 % 2, 1]).unwrap())
            .collect();

        let boundaries: Vec<_> = parts.iter().map(|p| (p.first(), p.last())).collect();
        let parts = exchange_all(links, parts);
        for rank in 0..parties {
            let left = (rank + parties - 1) % parties;
            let right = (rank + 1) % parties;
            assert_eq!(parts[rank].left_ghost(), boundaries[left].1);
            assert_eq!(parts[rank].right_ghost(), boundaries[right].0);
        }
    }

    #[test]
    fn missing_peer_times_out() {
        let mut links = HaloLinks::ring(2, Duration::from_millis(20));
        // Rank 1 never participates; rank 0's receive must time out rather
        // than block forever.
        let silent = links.pop().unwrap();
        let mut part = PartitionState::new(2, vec![1, 1]).unwrap();
        let err = links[0].exchange(&mut part).unwrap_err();
        assert!(matches!(err, SimError::Communication { rank: 0, .. }));
        drop(silent);
    }
}
