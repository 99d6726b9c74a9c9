//! One partition's slice of the road: a ghost-padded, double-buffered cell
//! buffer plus the local update step.
//!
//! The buffers have length `local_n + 2`; slots 0 and `local_n + 1` are the
//! ghost cells mirroring the neighbors' boundary cells. The offset never
//! leaks: callers address real cells through logical indices `0..local_n`.

use crate::error::SimError;
use crate::rule::{next_cell, Cell, OCCUPIED};

#[derive(Debug)]
pub struct PartitionState {
    current: Vec<Cell>,
    next: Vec<Cell>,
    local_n: usize,
}

impl PartitionState {
    /// Builds a partition over `cells`, which must contain exactly `local_n`
    /// values. Ghost slots start zeroed and must be set before the first
    /// `step`.
    pub fn new(local_n: usize, cells: Vec<Cell>) -> Result<Self, SimError> {
        if local_n == 0 || cells.len() != local_n {
            return Err(SimError::InvalidSize {
                expected: local_n,
                got: cells.len(),
            });
        }
        let mut current = alloc_buffer(local_n + 2)?;
        let mut next = alloc_buffer(local_n + 2)?;
        current.push(0);
        current.extend_from_slice(&cells);
        current.push(0);
        next.resize(local_n + 2, 0);
        Ok(Self {
            current,
            next,
            local_n,
        })
    }

    pub fn len(&self) -> usize {
        self.local_n
    }

    pub fn is_empty(&self) -> bool {
        self.local_n == 0
    }

    /// The leftmost real cell (what the left neighbor needs for its right
    /// ghost).
    pub fn first(&self) -> Cell {
        self.current[1]
    }

    /// The rightmost real cell (what the right neighbor needs for its left
    /// ghost).
    pub fn last(&self) -> Cell {
        self.current[self.local_n]
    }

    pub fn left_ghost(&self) -> Cell {
        self.current[0]
    }

    pub fn right_ghost(&self) -> Cell {
        self.current[self.local_n + 1]
    }

    /// Writes both ghost slots for the upcoming step.
    pub fn set_ghosts(&mut self, left: Cell, right: Cell) {
        self.current[0] = left;
        self.current[self.local_n + 1] = right;
    }

    /// The real cells, without ghosts.
    pub fn cells(&self) -> &[Cell] {
        &self.current[1..=self.local_n]
    }

    /// Number of occupied real cells.
    pub fn occupied(&self) -> u64 {
        self.cells().iter().filter(|&&c| c == OCCUPIED).count() as u64
    }

    /// Applies the rule to every real cell and returns the local move count.
    ///
    /// Precondition: ghosts are synchronized for this step. Stale ghosts do
    /// not crash, they silently corrupt the boundary cells; callers enforce
    /// exchange-before-step ordering.
    pub fn step(&mut self) -> u64 {
        let mut moves = 0u64;
        for i in 1..=self.local_n {
            let (next, moved) = next_cell(self.current[i - 1], self.current[i], self.current[i + 1]);
            self.next[i] = next;
            moves += moved as u64;
        }
        // Handle exchange, no element copy. Ghost slots of the new current
        // buffer are stale until the next set_ghosts.
        std::mem::swap(&mut self.current, &mut self.next);
        moves
    }

    /// Consumes the partition, returning its real cells in order.
    pub fn into_cells(mut self) -> Vec<Cell> {
        self.current.truncate(self.local_n + 1);
        self.current.remove(0);
        self.current
    }
}

fn alloc_buffer(capacity: usize) -> Result<Vec<Cell>, SimError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| SimError::ResourceExhaustion {
            bytes: capacity * std::mem::size_of::<Cell>(),
        })?;
    Ok(buf)
}
